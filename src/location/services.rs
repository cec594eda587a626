//! Collaborator contracts the coordinator calls into.
//!
//! The platform side (permission prompt, location hardware) sits behind
//! `PermissionService` and `ProviderService`; the consumer side implements
//! `LocationObserver`. Results from the platform never flow back through
//! these traits. The owner routes them into the coordinator's
//! `on_permission_result` / `on_location_update` callbacks.

use super::types::{LocationSample, ProviderKind, SubscriptionHandle};
use crate::config::UpdateSettings;
use crate::error::ProviderError;

/// Platform permission negotiation for fine location access.
pub trait PermissionService {
    /// Whether the platform already holds the grant (no prompt needed).
    fn is_granted(&self) -> bool {
        false
    }

    /// Ask the platform to prompt the user. Fire-and-forget: the answer is
    /// delivered later through `Coordinator::on_permission_result`.
    fn request_permission(&mut self);
}

/// Platform location provider access.
pub trait ProviderService {
    /// Providers currently switched on, in no particular order.
    fn enabled_providers(&self) -> Vec<ProviderKind>;

    /// Start periodic updates from `provider`.
    fn subscribe(
        &mut self,
        provider: ProviderKind,
        settings: &UpdateSettings,
    ) -> Result<SubscriptionHandle, ProviderError>;

    /// Stop updates for `handle`. Teardown may complete asynchronously.
    fn unsubscribe(&mut self, handle: SubscriptionHandle);

    /// Most recent fix cached by the platform for `provider`.
    fn last_known_sample(&self, _provider: ProviderKind) -> Option<LocationSample> {
        None
    }
}

/// Consumer of delivered samples and permission outcomes.
pub trait LocationObserver {
    fn on_sample(&mut self, sample: &LocationSample);

    fn on_permission_denied(&mut self);

    /// A subscription could not be established after the grant.
    fn on_provider_unavailable(&mut self, _error: &ProviderError) {}
}
