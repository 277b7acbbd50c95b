use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{Amount, BidPublicId, RequestPublicId, Role, UserId},
    timestamp,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// `data` of `/auth/me/`, `/auth/login/` and `/auth/register/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPayload {
    pub user: User,
}

/// Login accepts either the username or the e-mail address as identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoginCredentials {
    Username { username: String, password: String },
    Email { email: String, password: String },
}

impl LoginCredentials {
    pub fn identifier(&self) -> &str {
        match self {
            LoginCredentials::Username { username, .. } => username,
            LoginCredentials::Email { email, .. } => email,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterCredentials {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSummary {
    pub public_id: RequestPublicId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub budget: Amount,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_display: Option<String>,
    #[serde(default)]
    pub bid_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_username: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub public_id: BidPublicId,
    pub amount: Amount,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_display: Option<String>,
    /// Public id of the request the bid was placed on.
    #[serde(default, alias = "request_public_id", skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestPublicId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_title: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerStats {
    pub total_requests: u32,
    pub open_requests: u32,
    pub completed_requests: u32,
    pub total_spent: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerStats {
    pub total_bids: u32,
    pub accepted_bids: u32,
    pub total_earned: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_earnings: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerDashboard {
    pub stats: BuyerStats,
    #[serde(default)]
    pub recent_requests: Vec<RequestSummary>,
}

/// Seller dataset. Some backend builds name the bid list `my_bids`; both
/// spellings land in `recent_bids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerDashboard {
    pub stats: SellerStats,
    #[serde(default, alias = "my_bids")]
    pub recent_bids: Vec<Bid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_requests: Option<Vec<RequestSummary>>,
}
