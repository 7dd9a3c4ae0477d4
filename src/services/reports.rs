use crate::models::reports::{PnlReport, TopPerformer};
use crate::models::users::User;

/// Pure projection over the user set and the reward-ledger sum. Gross
/// revenue applies the current fee uniformly to all premium users, matching
/// the admin dashboard's intentionally simplified accounting.
pub fn compute_pnl(users: &[User], total_payouts: i64, subscription_fee: i64) -> PnlReport {
    let total_users = users.len() as i64;
    let premium_users = users.iter().filter(|u| u.is_premium()).count() as i64;
    let free_users = total_users - premium_users;

    let mut performers: Vec<TopPerformer> = Vec::new();
    let mut active_referrers = 0i64;
    for user in users {
        let direct: Vec<&User> = users
            .iter()
            .filter(|candidate| candidate.referred_by.as_deref() == Some(user.mobile.as_str()))
            .collect();
        if !direct.is_empty() {
            active_referrers += 1;
        }

        let premium_referrals = direct.iter().filter(|r| r.is_premium()).count() as i64;
        if premium_referrals > 0 {
            performers.push(TopPerformer {
                full_name: user.full_name.clone(),
                mobile: user.mobile.clone(),
                premium_referrals,
            });
        }
    }
    // stable sort keeps input order among ties
    performers.sort_by(|a, b| b.premium_referrals.cmp(&a.premium_referrals));
    performers.truncate(3);

    let gross_revenue = premium_users * subscription_fee;

    PnlReport {
        total_users,
        premium_users,
        free_users,
        active_referrers,
        gross_revenue,
        total_payouts,
        net_revenue: gross_revenue - total_payouts,
        top_performers: performers,
    }
}
