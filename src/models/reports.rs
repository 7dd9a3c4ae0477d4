use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct TopPerformer {
    pub full_name: String,
    pub mobile: String,
    pub premium_referrals: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct PnlReport {
    pub total_users: i64,
    pub premium_users: i64,
    pub free_users: i64,
    pub active_referrers: i64,
    pub gross_revenue: i64,
    pub total_payouts: i64,
    pub net_revenue: i64,
    pub top_performers: Vec<TopPerformer>,
}
