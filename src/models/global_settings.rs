use serde::{Deserialize, Serialize};

/// Singleton admin-editable configuration. Writes are whole-row
/// replacements: callers must read-modify-write the full object.
/// Already-issued rewards are never touched by a settings change.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct GlobalSettings {
    pub subscription_fee: i64,
    pub t1_reward: i64,
    pub t2_reward: i64,
    pub current_cycle_id: String,
    pub notice: String,
    pub campaign_active: bool,
    pub campaign_title: String,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        GlobalSettings {
            subscription_fee: 29900,
            t1_reward: 5000,
            t2_reward: 2500,
            current_cycle_id: "CYCLE_01".to_string(),
            notice: String::new(),
            campaign_active: false,
            campaign_title: String::new(),
        }
    }
}
