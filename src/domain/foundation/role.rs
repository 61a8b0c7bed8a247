//! Marketplace account roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// The kind of account a user holds.
///
/// Roles double as fan-out addresses: every connection joins the channel of
/// its role, which is how freight listings reach carriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Posts shipments and accepts offers.
    Shipper,
    /// Owner-operator that bids on shipments.
    Carrier,
    /// Logistics company bidding with a fleet.
    Logistics,
    /// Marketplace staff.
    Admin,
}

impl UserRole {
    pub const ALL: [UserRole; 4] = [
        UserRole::Shipper,
        UserRole::Carrier,
        UserRole::Logistics,
        UserRole::Admin,
    ];

    /// Roles that receive new freight listings.
    pub const CARRIER_LIKE: [UserRole; 2] = [UserRole::Carrier, UserRole::Logistics];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Shipper => "shipper",
            UserRole::Carrier => "carrier",
            UserRole::Logistics => "logistics",
            UserRole::Admin => "admin",
        }
    }

    /// True for roles that bid on shipments.
    pub fn is_carrier_like(&self) -> bool {
        Self::CARRIER_LIKE.contains(self)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        UserRole::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| ValidationError::invalid_format("role", format!("unknown role '{}'", s)))
    }
}
