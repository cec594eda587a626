//! Permission-gated location updates.
//!
//! A `Coordinator` asks for the location permission, subscribes to the best
//! enabled provider once it is granted, forwards samples to a single
//! observer and releases the subscription on `stop`/`shutdown`/drop.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod location;
pub mod logging;
pub mod output;
pub mod session;

pub use config::{LocationConfig, UpdateSettings};
pub use coordinator::{Coordinator, Delivery, DropReason, PermissionState};
pub use error::{ConfigError, ProviderError};
pub use location::{
    LocationObserver, LocationSample, PermissionService, PlatformEvent, ProviderKind,
    ProviderService, SubscriptionHandle,
};
pub use session::{LocationSession, SessionEnd, SessionStats};
