pub mod expenses;
pub mod global_settings;
pub mod referrals;
pub mod reports;
pub mod rewards;
pub mod sessions;
pub mod users;
