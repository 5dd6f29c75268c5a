//! POS Client - terminal client for the restaurant backend
//!
//! Headless controllers for the POS, kitchen, delivery and cashier screens,
//! built on a polled query cache with prefix invalidation and optimistic
//! status transitions.

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod http;
pub mod logger;
pub mod notify;
pub mod optimistic;
pub mod polling;
pub mod prefs;
pub mod screens;
pub mod session;

pub use api::{OrderAction, PosApi};
pub use cache::{QueryCache, QueryKey};
pub use config::{ClientConfig, PollConfig};
pub use context::ClientContext;
pub use error::{ClientError, ClientResult};
pub use http::{HttpClient, NetworkHttpClient};
pub use notify::{ClientEvent, Notice, NoticeLevel, Notifier};
pub use polling::{PollHandle, PollSettings, PollSpec, Poller};
pub use screens::{CashierScreen, DeliveryScreen, KitchenScreen, PosScreen};

// Re-export shared types for convenience
pub use shared::error::{AppError, ErrorCode};
