//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, ECS JSON)
//!     → attrs.rs (request / error attributes attached to events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Logging is fire-and-forget: no log call can change a result
//! - Request ID flows through the HTTP middleware stack
//! - Metrics are cheap (atomic increments)

pub mod attrs;
pub mod logging;
pub mod metrics;

pub use attrs::{ErrorAttrs, RequestAttrs};
