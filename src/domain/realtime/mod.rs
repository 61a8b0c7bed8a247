//! Real-time domain: channels, inbound and outbound events, and the
//! dispatch table that maps one to the other.

mod channel;
mod dispatch;
mod errors;
mod inbound;
mod outbound;
mod records;

pub use channel::Channel;
pub use dispatch::{
    plan, plan_notification, Broadcast, BroadcastTarget, DispatchPlan, MembershipChange,
    PersistenceDirective, SenderContext,
};
pub use errors::RealtimeError;
pub use inbound::{
    InboundEvent, OfferCreated, OfferStatusChanged, SendMessage, ShipmentCreated, ShipmentRef,
    ShipmentStatusChanged,
};
pub use outbound::{MessagePayload, OutboundEvent, OutboundKind, TypingPayload};
pub use records::{NewMessage, NewNotification, NotificationTarget};
