use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum RewardTier {
    T1,
    T2,
    Bonus,
}

impl RewardTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardTier::T1 => "T1",
            RewardTier::T2 => "T2",
            RewardTier::Bonus => "BONUS",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "T1" => Some(RewardTier::T1),
            "T2" => Some(RewardTier::T2),
            "BONUS" => Some(RewardTier::Bonus),
            _ => None,
        }
    }
}

/// Append-only ledger entry. Amount and cycle id are frozen at grant time
/// and never recomputed from later settings.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Reward {
    pub id: String,
    pub user_id: String,
    pub source_user_id: Option<String>,
    pub tier: RewardTier,
    pub amount: i64,
    pub cycle_id: String,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Clone, Debug)]
pub struct NewReward {
    pub user_id: String,
    pub source_user_id: Option<String>,
    pub tier: RewardTier,
    pub amount: i64,
    pub cycle_id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpgradeRequest {
    pub user_id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BonusRequest {
    pub user_id: String,
    pub amount: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct GrantSummary {
    pub recipient_id: String,
    pub amount: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct UpgradeOutcome {
    /// False when the user was already premium (duplicate or concurrent
    /// upgrade calls are no-ops).
    pub applied: bool,
    pub cycle_id: String,
    pub t1: Option<GrantSummary>,
    pub t2: Option<GrantSummary>,
}

impl UpgradeOutcome {
    pub fn already_premium(cycle_id: String) -> Self {
        UpgradeOutcome {
            applied: false,
            cycle_id,
            t1: None,
            t2: None,
        }
    }
}
