//! HTTP adapter for server-side notification pushes.
//!
//! - `POST /notifications` - Store a notification and push it to a user or role panel

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{NotificationResponse, NotifyRequest};
pub use handlers::NotificationState;
pub use routes::notifications_router;
