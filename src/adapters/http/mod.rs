//! HTTP adapters - REST surface, gateway and middleware.
//!
//! - `cache_service` - cache-aside layer over REST
//! - `notifications` - server-side notification push
//! - `proxy` - `/api/*` forwarding to the marketplace backend
//! - `middleware` - bearer auth and GET-response memoization
//! - `router` - assembly of all of the above

pub mod cache_service;
pub mod middleware;
pub mod notifications;
pub mod proxy;
pub mod router;

pub use cache_service::{cache_service_router, CacheServiceState};
pub use notifications::{notifications_router, NotificationState};
pub use proxy::{proxy_router, ProxyError, ProxyState};
pub use router::{build_router, http_routes, AppServices};
