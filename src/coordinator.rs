//! Location update coordinator — permission-gated subscription lifecycle.
//!
//! Permission flow:  Unrequested → Requested → Granted | Denied
//!                   Denied → Requested (on the next `start`)
//!
//! Delivery is gated on the active subscription at delivery time, so a
//! sample that arrives after `stop()` is dropped even when the provider's
//! own teardown has not finished yet.

use crate::config::UpdateSettings;
use crate::error::ProviderError;
use crate::location::{
    LocationObserver, LocationSample, PermissionService, ProviderKind, ProviderService,
    SubscriptionHandle,
};
use std::fmt;
use tracing::{debug, info, trace, warn};

/// Where the coordinator stands with the platform permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Unrequested,
    Requested,
    Granted,
    Denied,
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unrequested => write!(f, "unrequested"),
            Self::Requested => write!(f, "requested"),
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

/// Outcome of routing one sample through `on_location_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Dropped(DropReason),
}

/// Why a sample was silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No subscription is active (never started, stopped, or not granted).
    SubscriptionInactive,
    /// The subscription is live but nobody is listening.
    NoObserverAttached,
}

#[derive(Debug, Clone, Copy)]
struct ActiveSubscription {
    handle: SubscriptionHandle,
    provider: ProviderKind,
}

/// Owns the permission + subscription lifecycle for a single observer.
pub struct Coordinator<P: PermissionService, L: ProviderService> {
    permissions: P,
    provider: L,
    settings: UpdateSettings,
    permission_state: PermissionState,
    subscription: Option<ActiveSubscription>,
    /// Set by `start`, cleared by `stop`. A late grant only subscribes while set.
    wants_updates: bool,
    observer: Option<Box<dyn LocationObserver>>,
}

impl<P: PermissionService, L: ProviderService> Coordinator<P, L> {
    pub fn new(permissions: P, provider: L) -> Self {
        Self::with_settings(permissions, provider, UpdateSettings::default())
    }

    pub fn with_settings(permissions: P, provider: L, settings: UpdateSettings) -> Self {
        Self {
            permissions,
            provider,
            settings,
            permission_state: PermissionState::Unrequested,
            subscription: None,
            wants_updates: false,
            observer: None,
        }
    }

    /// Attach `observer` (or detach with `None`), returning the one it replaces.
    pub fn set_observer(
        &mut self,
        observer: Option<Box<dyn LocationObserver>>,
    ) -> Option<Box<dyn LocationObserver>> {
        std::mem::replace(&mut self.observer, observer)
    }

    /// Begin receiving updates, asking for permission first if needed.
    pub fn start(&mut self) {
        self.wants_updates = true;
        match self.permission_state {
            PermissionState::Granted => self.begin_updates(),
            PermissionState::Requested => {
                debug!("start ignored: permission request already outstanding");
            }
            PermissionState::Unrequested | PermissionState::Denied => {
                if self.permissions.is_granted() {
                    debug!("permission already held by platform");
                    self.permission_state = PermissionState::Granted;
                    self.begin_updates();
                } else {
                    info!(previous = %self.permission_state, "requesting location permission");
                    self.permission_state = PermissionState::Requested;
                    self.permissions.request_permission();
                }
            }
        }
    }

    /// Platform answer to the outstanding permission request.
    pub fn on_permission_result(&mut self, granted: bool) {
        if self.permission_state != PermissionState::Requested {
            debug!(state = %self.permission_state, granted, "permission result with no outstanding request");
            return;
        }

        if granted {
            info!("location permission granted");
            self.permission_state = PermissionState::Granted;
            if self.wants_updates {
                self.begin_updates();
            } else {
                debug!("grant arrived after stop; not subscribing");
            }
        } else {
            warn!("location permission denied");
            self.permission_state = PermissionState::Denied;
            if let Some(observer) = self.observer.as_mut() {
                observer.on_permission_denied();
            }
        }
    }

    /// Provider callback: forward `sample` to the observer, or drop it.
    pub fn on_location_update(&mut self, sample: LocationSample) -> Delivery {
        if self.subscription.is_none() {
            trace!(lat = sample.lat, lon = sample.lon, "dropping sample: no active subscription");
            return Delivery::Dropped(DropReason::SubscriptionInactive);
        }

        match self.observer.as_mut() {
            Some(observer) => {
                observer.on_sample(&sample);
                Delivery::Delivered
            }
            None => {
                trace!(lat = sample.lat, lon = sample.lon, "dropping sample: no observer attached");
                Delivery::Dropped(DropReason::NoObserverAttached)
            }
        }
    }

    /// Release the active subscription. Keeps the permission state.
    pub fn stop(&mut self) {
        self.wants_updates = false;
        if let Some(active) = self.subscription.take() {
            info!(provider = %active.provider, handle = %active.handle, "stopping location updates");
            self.provider.unsubscribe(active.handle);
        }
    }

    /// Owner teardown: stop updates and detach the observer.
    pub fn shutdown(&mut self) {
        self.stop();
        self.observer = None;
    }

    /// The platform's cached fix from the first preferred provider that has one.
    pub fn last_known_sample(&self) -> Option<LocationSample> {
        if self.permission_state != PermissionState::Granted {
            return None;
        }

        self.settings
            .preferred_providers
            .iter()
            .find_map(|&provider| self.provider.last_known_sample(provider))
    }

    /// Replace the update settings. Applies from the next subscription.
    pub fn set_update_settings(&mut self, settings: UpdateSettings) {
        self.settings = settings;
    }

    pub fn update_settings(&self) -> &UpdateSettings {
        &self.settings
    }

    pub fn permission_state(&self) -> PermissionState {
        self.permission_state
    }

    pub fn is_subscription_active(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn active_provider(&self) -> Option<ProviderKind> {
        self.subscription.map(|s| s.provider)
    }

    pub fn active_handle(&self) -> Option<SubscriptionHandle> {
        self.subscription.map(|s| s.handle)
    }

    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    pub fn permissions(&self) -> &P {
        &self.permissions
    }

    pub fn provider(&self) -> &L {
        &self.provider
    }

    fn begin_updates(&mut self) {
        if let Some(active) = self.subscription {
            debug!(handle = %active.handle, "start ignored: already subscribed");
            return;
        }

        let enabled = self.provider.enabled_providers();
        let chosen = self
            .settings
            .preferred_providers
            .iter()
            .copied()
            .find(|p| enabled.contains(p));

        let result = match chosen {
            Some(provider) => self
                .provider
                .subscribe(provider, &self.settings)
                .map(|handle| ActiveSubscription { handle, provider }),
            None => Err(ProviderError::NoProviderEnabled {
                preferred: self.settings.preferred_providers.clone(),
            }),
        };

        match result {
            Ok(active) => {
                info!(
                    provider = %active.provider,
                    handle = %active.handle,
                    min_interval_ms = self.settings.min_interval_ms,
                    min_distance_m = self.settings.min_distance_m,
                    "location updates started"
                );
                self.subscription = Some(active);
            }
            Err(e) => {
                warn!(error = %e, "could not start location updates");
                if let Some(observer) = self.observer.as_mut() {
                    observer.on_provider_unavailable(&e);
                }
            }
        }
    }
}

impl<P: PermissionService, L: ProviderService> Drop for Coordinator<P, L> {
    fn drop(&mut self) {
        self.stop();
    }
}
