//! Async event loop that plays the host's role: it starts the coordinator,
//! then routes platform callbacks into it until a stop condition is met.

use crate::coordinator::{Coordinator, Delivery, DropReason, PermissionState};
use crate::location::{PermissionService, PlatformEvent, ProviderService};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, trace};

/// Why `LocationSession::run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    SampleLimit,
    PermissionDenied,
    ProviderUnavailable,
    TimedOut,
    ChannelClosed,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SampleLimit => write!(f, "sample limit reached"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::ProviderUnavailable => write!(f, "no location provider available"),
            Self::TimedOut => write!(f, "timed out"),
            Self::ChannelClosed => write!(f, "platform channel closed"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub delivered: usize,
    pub dropped: usize,
    /// Samples from a subscription that is no longer the active one.
    pub stale: usize,
    pub permission_results: usize,
}

pub struct LocationSession<P: PermissionService, L: ProviderService> {
    coordinator: Coordinator<P, L>,
    events: UnboundedReceiver<PlatformEvent>,
    stats: SessionStats,
}

impl<P: PermissionService, L: ProviderService> LocationSession<P, L> {
    pub fn new(coordinator: Coordinator<P, L>, events: UnboundedReceiver<PlatformEvent>) -> Self {
        Self {
            coordinator,
            events,
            stats: SessionStats::default(),
        }
    }

    pub fn coordinator(&self) -> &Coordinator<P, L> {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut Coordinator<P, L> {
        &mut self.coordinator
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Route one platform event into the coordinator.
    ///
    /// Returns the delivery outcome for location events, `None` otherwise.
    pub fn dispatch(&mut self, event: PlatformEvent) -> Option<Delivery> {
        match event {
            PlatformEvent::PermissionResult { granted } => {
                self.stats.permission_results += 1;
                self.coordinator.on_permission_result(granted);
                None
            }
            PlatformEvent::Location { handle, sample } => {
                if self.coordinator.active_handle() != Some(handle) {
                    trace!(%handle, "dropping sample from released subscription");
                    self.stats.stale += 1;
                    self.stats.dropped += 1;
                    return Some(Delivery::Dropped(DropReason::SubscriptionInactive));
                }

                let outcome = self.coordinator.on_location_update(sample);
                match outcome {
                    Delivery::Delivered => self.stats.delivered += 1,
                    Delivery::Dropped(_) => self.stats.dropped += 1,
                }
                Some(outcome)
            }
        }
    }

    /// Start the coordinator and pump events until `max_samples` have been
    /// delivered, the permission is denied, no provider can be used, or
    /// `timeout` elapses.
    pub async fn run(&mut self, max_samples: usize, timeout: Duration) -> SessionEnd {
        let deadline = tokio::time::Instant::now() + timeout;
        self.coordinator.start();

        let end = loop {
            if let Some(end) = self.check_finished(max_samples) {
                break end;
            }

            match tokio::time::timeout_at(deadline, self.events.recv()).await {
                Ok(Some(event)) => {
                    self.dispatch(event);
                }
                Ok(None) => break SessionEnd::ChannelClosed,
                Err(_) => break SessionEnd::TimedOut,
            }
        };

        info!(reason = %end, delivered = self.stats.delivered, dropped = self.stats.dropped, "session finished");
        end
    }

    /// Tear the coordinator down and hand back the counters.
    pub fn finish(mut self) -> SessionStats {
        self.coordinator.shutdown();
        debug!("session shut down");
        self.stats
    }

    fn check_finished(&self, max_samples: usize) -> Option<SessionEnd> {
        if self.stats.delivered >= max_samples {
            return Some(SessionEnd::SampleLimit);
        }

        match self.coordinator.permission_state() {
            PermissionState::Denied => Some(SessionEnd::PermissionDenied),
            PermissionState::Granted if !self.coordinator.is_subscription_active() => {
                Some(SessionEnd::ProviderUnavailable)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpdateSettings;
    use crate::location::{
        platform_channel, LocationObserver, LocationSample, ProviderKind, SimulatedPermissions,
        SimulatedProvider,
    };
    use crate::{PlatformEvent, SubscriptionHandle};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Collector {
        samples: Rc<RefCell<Vec<LocationSample>>>,
        denials: Rc<RefCell<usize>>,
    }

    impl LocationObserver for Collector {
        fn on_sample(&mut self, sample: &LocationSample) {
            self.samples.borrow_mut().push(sample.clone());
        }

        fn on_permission_denied(&mut self) {
            *self.denials.borrow_mut() += 1;
        }
    }

    type SimSession = LocationSession<SimulatedPermissions, SimulatedProvider>;

    fn session(answer: bool, collector: &Collector) -> SimSession {
        let (tx, rx) = platform_channel();
        let permissions =
            SimulatedPermissions::new(tx.clone(), answer).with_prompt_delay(Duration::from_millis(5));
        let provider = SimulatedProvider::new(tx, 10.0, 20.0);
        let settings = UpdateSettings {
            min_interval_ms: 5,
            ..UpdateSettings::default()
        };
        let mut coordinator = Coordinator::with_settings(permissions, provider, settings);
        coordinator.set_observer(Some(Box::new(collector.clone())));
        LocationSession::new(coordinator, rx)
    }

    #[tokio::test]
    async fn test_grant_delivers_requested_samples() {
        let collector = Collector::default();
        let mut session = session(true, &collector);

        let end = session.run(3, Duration::from_secs(5)).await;

        assert_eq!(end, SessionEnd::SampleLimit);
        assert_eq!(session.stats().delivered, 3);
        assert_eq!(session.stats().permission_results, 1);
        assert_eq!(collector.samples.borrow().len(), 3);
        assert_eq!(collector.samples.borrow()[0].provider, ProviderKind::Network);

        let stats = session.finish();
        assert_eq!(stats.delivered, 3);
    }

    #[tokio::test]
    async fn test_denial_ends_session() {
        let collector = Collector::default();
        let mut session = session(false, &collector);

        let end = session.run(3, Duration::from_secs(5)).await;

        assert_eq!(end, SessionEnd::PermissionDenied);
        assert_eq!(*collector.denials.borrow(), 1);
        assert!(collector.samples.borrow().is_empty());
        assert_eq!(session.coordinator().permissions().request_count(), 1);
    }

    #[tokio::test]
    async fn test_no_provider_ends_session() {
        let (tx, rx) = platform_channel();
        let permissions = SimulatedPermissions::new(tx.clone(), true).pre_granted();
        let mut provider = SimulatedProvider::new(tx, 0.0, 0.0);
        provider.disable(ProviderKind::Network);
        provider.disable(ProviderKind::Gps);
        let mut session = LocationSession::new(Coordinator::new(permissions, provider), rx);

        let end = session.run(1, Duration::from_secs(5)).await;
        assert_eq!(end, SessionEnd::ProviderUnavailable);
    }

    #[tokio::test]
    async fn test_timeout_without_answer() {
        let (tx, rx) = platform_channel();
        let permissions =
            SimulatedPermissions::new(tx.clone(), true).with_prompt_delay(Duration::from_secs(60));
        let provider = SimulatedProvider::new(tx, 0.0, 0.0);
        let mut session = LocationSession::new(Coordinator::new(permissions, provider), rx);

        let end = session.run(1, Duration::from_millis(20)).await;
        assert_eq!(end, SessionEnd::TimedOut);
        assert_eq!(session.coordinator().permission_state(), PermissionState::Requested);
    }

    #[tokio::test]
    async fn test_stale_handle_is_dropped() {
        let collector = Collector::default();
        let mut session = session(true, &collector);
        session.run(1, Duration::from_secs(5)).await;

        let old = session.coordinator().active_handle().unwrap();
        session.coordinator_mut().stop();
        session.coordinator_mut().start();
        let current = session.coordinator().active_handle().unwrap();
        assert_ne!(old, current);

        let outcome = session.dispatch(PlatformEvent::Location {
            handle: old,
            sample: LocationSample::new(0.0, 0.0),
        });
        assert_eq!(outcome, Some(Delivery::Dropped(DropReason::SubscriptionInactive)));
        assert_eq!(session.stats().stale, 1);

        let outcome = session.dispatch(PlatformEvent::Location {
            handle: current,
            sample: LocationSample::new(0.0, 0.0),
        });
        assert_eq!(outcome, Some(Delivery::Delivered));
    }

    #[tokio::test]
    async fn test_finish_returns_counters() {
        let collector = Collector::default();
        let mut session = session(true, &collector);
        session.run(2, Duration::from_secs(5)).await;
        assert_eq!(session.coordinator().provider().active_subscriptions(), 1);

        let stats = session.finish();
        assert_eq!(stats.delivered, 2);
        assert_eq!(collector.samples.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_handle_before_start() {
        let collector = Collector::default();
        let mut session = session(true, &collector);

        let outcome = session.dispatch(PlatformEvent::Location {
            handle: SubscriptionHandle::new(99),
            sample: LocationSample::new(0.0, 0.0),
        });
        assert_eq!(outcome, Some(Delivery::Dropped(DropReason::SubscriptionInactive)));
        assert!(collector.samples.borrow().is_empty());
    }
}
