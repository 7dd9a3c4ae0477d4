use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Free,
    Premium,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Free => "free",
            SubscriptionStatus::Premium => "premium",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "free" => Some(SubscriptionStatus::Free),
            "premium" => Some(SubscriptionStatus::Premium),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    pub mobile: String,
    pub pin: String,
    pub recovery_key: String,
    pub full_name: String,
    pub age: Option<i32>,
    pub bank_name: Option<String>,
    pub ifsc_code: Option<String>,
    pub device_fingerprint: Option<String>,
    pub wallet_balance: i64,
    pub status: SubscriptionStatus,
    pub premium_activated_at: Option<chrono::NaiveDateTime>,
    pub activation_cycle: Option<String>,
    pub referred_by: Option<String>,
    pub is_admin: bool,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl User {
    pub fn is_premium(&self) -> bool {
        self.status == SubscriptionStatus::Premium
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewUser {
    pub mobile: String,
    pub pin: String,
    pub recovery_key: String,
    pub full_name: String,
    pub referral_code: Option<String>,
}

/// Allow-listed profile fields. Balance, status and the admin flag are
/// deliberately not part of this request.
#[derive(Clone, Debug, Deserialize)]
pub struct UpdateProfile {
    pub full_name: Option<String>,
    pub age: Option<i32>,
    pub bank_name: Option<String>,
    pub ifsc_code: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoginRequest {
    pub mobile: String,
    pub pin: String,
    pub device_id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ResetPinRequest {
    pub mobile: String,
    pub recovery_key: String,
    pub new_pin: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WithdrawRequest {
    pub user_id: String,
    pub amount: i64,
}

/// Outward-facing projection of a user row. Credentials never leave the
/// service layer.
#[derive(Clone, Debug, Serialize)]
pub struct UserView {
    pub id: String,
    pub full_name: String,
    pub mobile: String,
    pub wallet_balance: i64,
    pub status: SubscriptionStatus,
    pub activation_cycle: Option<String>,
    pub referred_by: Option<String>,
    pub is_admin: bool,
    pub created_at: chrono::NaiveDateTime,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        UserView {
            id: user.id,
            full_name: user.full_name,
            mobile: user.mobile,
            wallet_balance: user.wallet_balance,
            status: user.status,
            activation_cycle: user.activation_cycle,
            referred_by: user.referred_by,
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}
