//! Location subsystem: sample types, collaborator contracts, and a
//! simulated platform used by the demo binary and tests.

pub mod services;
pub mod simulated;
pub mod types;

pub use services::{LocationObserver, PermissionService, ProviderService};
pub use simulated::{platform_channel, PlatformEvent, SimulatedPermissions, SimulatedProvider};
pub use types::{LocationSample, ProviderKind, SubscriptionHandle};
