//! Shared building blocks for the lifeos client: entity model, configuration, the resource
//! client seam, and the cross-domain event bus.

pub mod api;
pub mod bus;
pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod model;

pub use api::{Endpoint, ListSource, ResourceApi, ResourceClient};
pub use bus::{EventBus, Signal, Subscription, SubscriptionId, Topic};
pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use http::HttpResourceApi;
pub use memory::MemoryBackend;
pub use model::*;
