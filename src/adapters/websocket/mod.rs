//! WebSocket adapters for real-time marketplace events.
//!
//! ```text
//!   client ──frame──▶ handler ──▶ RealtimeHub ──plan──▶ RealtimeStore
//!                                     │
//!                                     ▼
//!                               RoomManager
//!   user_42   panel_carrier   shipment_17   ...
//!   └ conn-a  ├ conn-a        ├ conn-a
//!             └ conn-c        └ conn-b
//! ```
//!
//! - [`messages`] - wire frames
//! - [`registry`] - user ↔ connection mapping
//! - [`rooms`] - channel membership and per-connection sinks
//! - [`handler`] - Axum upgrade handler

pub mod handler;
pub mod messages;
pub mod registry;
pub mod rooms;

pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use messages::{ClientFrame, ServerFrame};
pub use registry::InMemoryConnectionRegistry;
pub use rooms::{ConnectionSink, RoomManager};
