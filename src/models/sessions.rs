use serde::{Deserialize, Serialize};

/// Local session marker, persisted as plain key-value state on the device.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SessionRecord {
    pub user_id: String,
    pub device_id: String,
    /// Unix seconds at the time the marker was written or refreshed.
    pub saved_at: i64,
}
