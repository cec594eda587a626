//! Simulated platform: permission prompt and location providers backed by
//! a tokio channel.
//!
//! Both services answer asynchronously by pushing `PlatformEvent`s onto an
//! unbounded mpsc channel, the way the OS would invoke callbacks some time
//! after the request returned. They spawn tokio tasks and must be driven
//! from inside a runtime.

use super::services::{PermissionService, ProviderService};
use super::types::{LocationSample, ProviderKind, SubscriptionHandle};
use crate::config::UpdateSettings;
use crate::error::ProviderError;
use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

const METERS_PER_DEGREE_LAT: f64 = 111_320.0;
const DEFAULT_PROMPT_DELAY: Duration = Duration::from_millis(50);

/// Callback traffic from the platform to the coordinator's owner.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    PermissionResult { granted: bool },
    Location {
        handle: SubscriptionHandle,
        sample: LocationSample,
    },
}

pub fn platform_channel() -> (UnboundedSender<PlatformEvent>, UnboundedReceiver<PlatformEvent>) {
    mpsc::unbounded_channel()
}

/// A permission prompt whose user answer is scripted up front.
pub struct SimulatedPermissions {
    events: UnboundedSender<PlatformEvent>,
    answer: bool,
    prompt_delay: Duration,
    already_granted: bool,
    requests: usize,
}

impl SimulatedPermissions {
    /// The simulated user will answer `answer` to every prompt.
    pub fn new(events: UnboundedSender<PlatformEvent>, answer: bool) -> Self {
        Self {
            events,
            answer,
            prompt_delay: DEFAULT_PROMPT_DELAY,
            already_granted: false,
            requests: 0,
        }
    }

    /// Platform already holds the grant from an earlier session.
    pub fn pre_granted(mut self) -> Self {
        self.already_granted = true;
        self
    }

    pub fn with_prompt_delay(mut self, delay: Duration) -> Self {
        self.prompt_delay = delay;
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests
    }
}

impl PermissionService for SimulatedPermissions {
    fn is_granted(&self) -> bool {
        self.already_granted
    }

    fn request_permission(&mut self) {
        self.requests += 1;
        let events = self.events.clone();
        let granted = self.answer;
        let delay = self.prompt_delay;

        debug!(granted, delay_ms = delay.as_millis() as u64, "simulated permission prompt shown");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(PlatformEvent::PermissionResult { granted });
        });
    }
}

/// Location providers that walk a straight line from an origin.
///
/// Each tick moves the position by `min_distance_m` (at least one meter)
/// towards the north-east and emits a sample stamped with the providing
/// subscription's handle.
pub struct SimulatedProvider {
    events: UnboundedSender<PlatformEvent>,
    enabled: Vec<ProviderKind>,
    origin: (f64, f64),
    next_id: u64,
    tasks: HashMap<SubscriptionHandle, JoinHandle<()>>,
    last_known: HashMap<ProviderKind, LocationSample>,
}

impl SimulatedProvider {
    pub fn new(events: UnboundedSender<PlatformEvent>, lat: f64, lon: f64) -> Self {
        Self {
            events,
            enabled: vec![ProviderKind::Network, ProviderKind::Gps, ProviderKind::Passive],
            origin: (lat, lon),
            next_id: 0,
            tasks: HashMap::new(),
            last_known: HashMap::new(),
        }
    }

    /// Switch a provider off, as if the user disabled it in system settings.
    pub fn disable(&mut self, provider: ProviderKind) {
        self.enabled.retain(|p| *p != provider);
    }

    /// Seed the platform's cached last fix for the sample's provider.
    pub fn with_last_known(mut self, sample: LocationSample) -> Self {
        self.last_known.insert(sample.provider, sample);
        self
    }

    pub fn active_subscriptions(&self) -> usize {
        self.tasks.len()
    }
}

impl ProviderService for SimulatedProvider {
    fn enabled_providers(&self) -> Vec<ProviderKind> {
        self.enabled.clone()
    }

    fn subscribe(
        &mut self,
        provider: ProviderKind,
        settings: &UpdateSettings,
    ) -> Result<SubscriptionHandle, ProviderError> {
        if !self.enabled.contains(&provider) {
            return Err(ProviderError::Rejected {
                provider,
                reason: "provider is disabled".into(),
            });
        }

        self.next_id += 1;
        let handle = SubscriptionHandle::new(self.next_id);
        let events = self.events.clone();
        let period = settings.min_interval().max(Duration::from_millis(1));
        let step_m = f64::from(settings.min_distance_m).max(1.0);
        let (mut lat, mut lon) = self.origin;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let sample = LocationSample::new(lat, lon)
                    .at(Utc::now())
                    .with_accuracy(nominal_accuracy_m(provider))
                    .from_provider(provider);
                trace!(%handle, lat, lon, "simulated fix");
                if events.send(PlatformEvent::Location { handle, sample }).is_err() {
                    break;
                }
                let (next_lat, next_lon) = step_north_east(lat, lon, step_m);
                lat = next_lat;
                lon = next_lon;
            }
        });

        debug!(%provider, %handle, period_ms = period.as_millis() as u64, "simulated subscription started");
        self.tasks.insert(handle, task);
        Ok(handle)
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
            debug!(%handle, "simulated subscription cancelled");
        }
    }

    fn last_known_sample(&self, provider: ProviderKind) -> Option<LocationSample> {
        self.last_known.get(&provider).cloned()
    }
}

impl Drop for SimulatedProvider {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

fn nominal_accuracy_m(provider: ProviderKind) -> f32 {
    match provider {
        ProviderKind::Gps => 8.0,
        ProviderKind::Network => 40.0,
        ProviderKind::Passive => 100.0,
    }
}

/// Move `distance_m` along a 45° bearing (flat-earth approximation).
fn step_north_east(lat: f64, lon: f64, distance_m: f64) -> (f64, f64) {
    let leg = distance_m / std::f64::consts::SQRT_2;
    let dlat = leg / METERS_PER_DEGREE_LAT;
    let cos_lat = lat.to_radians().cos().abs().max(1e-6);
    let dlon = leg / (METERS_PER_DEGREE_LAT * cos_lat);

    let next_lat = (lat + dlat).clamp(-90.0, 90.0);
    let next_lon = (lon + dlon + 180.0).rem_euclid(360.0) - 180.0;
    (next_lat, next_lon)
}
