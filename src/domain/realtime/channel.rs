//! Fan-out addresses.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{ShipmentId, UserId, UserRole};

/// A named group of connections that receives broadcasts together.
///
/// Every connection is in its own `User` channel and its `Role` channel
/// from registration until disconnect. `Shipment` channels are joined and
/// left explicitly by clients viewing a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Channel {
    User(UserId),
    Role(UserRole),
    Shipment(ShipmentId),
}

impl Channel {
    /// The channels a connection joins as part of registration.
    pub fn implicit_for(user_id: UserId, role: UserRole) -> [Channel; 2] {
        [Channel::User(user_id), Channel::Role(role)]
    }

    /// True for channels clients may join or leave on their own.
    pub fn is_explicit(&self) -> bool {
        matches!(self, Channel::Shipment(_))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::User(id) => write!(f, "user_{}", id),
            Channel::Role(role) => write!(f, "panel_{}", role),
            Channel::Shipment(id) => write!(f, "shipment_{}", id),
        }
    }
}
