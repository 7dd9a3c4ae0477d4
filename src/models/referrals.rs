use serde::Serialize;

use super::users::SubscriptionStatus;

#[derive(Clone, Debug, Serialize)]
pub struct UplineRef {
    pub id: String,
    pub full_name: String,
    pub mobile: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Upline {
    pub direct_referrer: Option<UplineRef>,
    pub grand_referrer: Option<UplineRef>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TeamMember {
    pub full_name: String,
    pub mobile: String,
    pub status: SubscriptionStatus,
}

/// Derived at read time from the per-cycle qualifying-referral count.
/// Never stored.
#[derive(Clone, Debug, Serialize)]
pub struct ValveStatus {
    pub unlocked: bool,
    pub qualifying_referrals: i64,
    pub cycle_id: String,
}
