//! Freight Relay - real-time fan-out, cache-aside layer and API gateway
//! middleware for a shipper/carrier marketplace.
//!
//! Connected clients exchange domain events (new shipments, offers, chat
//! messages, typing indicators) over WebSocket; the hub persists what must
//! be persisted and fans the rest out through user, role and shipment
//! channels.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
