//! Request scheduling policy
//!
//! Decides, from whether content exists, how old it is, and whether a
//! request is already outstanding, if a session should fetch and how long the
//! caller waits. The default [`StalenessScheduler`] adds exponential backoff
//! after request errors.

use std::sync::Arc;
use std::time::Duration;

use feed_core::effects::{BackoffStrategy, ClockEffects};
use feed_core::SchedulerConfig;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What a session should do before returning content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestBehavior {
    /// Issue a request and wait for it before returning content
    RequestWithWait,
    /// Issue a request and return existing content immediately
    RequestWithContent,
    /// Issue a request and wait a bounded time before falling back
    RequestWithTimeout,
    /// Wait for the outstanding request before returning content
    NoRequestWithWait,
    /// Return existing content immediately
    NoRequestWithContent,
    /// Wait a bounded time for the outstanding request, then fall back
    NoRequestWithTimeout,
}

impl RequestBehavior {
    /// Whether a new request should be issued.
    pub fn issues_request(self) -> bool {
        matches!(
            self,
            Self::RequestWithWait | Self::RequestWithContent | Self::RequestWithTimeout
        )
    }

    /// How long the caller waits for fresh content.
    pub fn wait_mode(self) -> WaitMode {
        match self {
            Self::RequestWithWait | Self::NoRequestWithWait => WaitMode::UntilComplete,
            Self::RequestWithTimeout | Self::NoRequestWithTimeout => WaitMode::Bounded,
            Self::RequestWithContent | Self::NoRequestWithContent => WaitMode::Immediate,
        }
    }
}

/// Waiting component of a [`RequestBehavior`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Block until the request completes or fails
    UntilComplete,
    /// Block up to the configured request timeout
    Bounded,
    /// Return at once
    Immediate,
}

/// Inputs to a scheduling decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerState {
    /// HEAD holds content a session could show
    pub has_content: bool,
    /// Time since HEAD was last refreshed
    pub content_age_ms: u64,
    /// A request for the same scope is in flight
    pub has_outstanding_request: bool,
}

/// Host-replaceable scheduling policy.
///
/// Notifications are called from the mutation lane and must not block.
pub trait SchedulerPolicy: Send + Sync {
    /// Decide the behavior for `state`.
    fn should_session_request_data(&self, state: &SchedulerState) -> RequestBehavior;

    /// Fresh content was merged into HEAD.
    fn on_receive_new_content(&self, content_creation_ms: u64);

    /// A request failed with the given [`FeedError::code`](feed_core::FeedError::code).
    fn on_request_error(&self, code: u16);
}

impl<T: SchedulerPolicy + ?Sized> SchedulerPolicy for Arc<T> {
    fn should_session_request_data(&self, state: &SchedulerState) -> RequestBehavior {
        (**self).should_session_request_data(state)
    }

    fn on_receive_new_content(&self, content_creation_ms: u64) {
        (**self).on_receive_new_content(content_creation_ms);
    }

    fn on_request_error(&self, code: u16) {
        (**self).on_request_error(code);
    }
}

#[derive(Debug, Default)]
struct BackoffState {
    consecutive_failures: u32,
    retry_after_ms: u64,
}

/// Age-based policy with error backoff.
pub struct StalenessScheduler {
    config: SchedulerConfig,
    clock: Arc<dyn ClockEffects>,
    backoff: Mutex<BackoffState>,
}

impl StalenessScheduler {
    /// Create a scheduler using `config` thresholds.
    pub fn new(config: SchedulerConfig, clock: Arc<dyn ClockEffects>) -> Self {
        Self {
            config,
            clock,
            backoff: Mutex::new(BackoffState::default()),
        }
    }

    /// Failures since the last fresh content.
    pub fn consecutive_failures(&self) -> u32 {
        self.backoff.lock().consecutive_failures
    }

    fn in_backoff(&self) -> bool {
        let state = self.backoff.lock();
        state.consecutive_failures > 0 && self.clock.now_ms() < state.retry_after_ms
    }

    fn decide(&self, state: &SchedulerState) -> RequestBehavior {
        let age = state.content_age_ms;
        let stale = age >= self.config.stale_after_ms;

        if state.has_outstanding_request {
            return match (state.has_content, stale) {
                (false, _) => RequestBehavior::NoRequestWithWait,
                (true, true) => RequestBehavior::NoRequestWithTimeout,
                (true, false) => RequestBehavior::NoRequestWithContent,
            };
        }

        if !state.has_content {
            return RequestBehavior::RequestWithWait;
        }
        if age < self.config.refresh_after_ms {
            RequestBehavior::NoRequestWithContent
        } else if !stale {
            RequestBehavior::RequestWithContent
        } else {
            RequestBehavior::RequestWithTimeout
        }
    }
}

impl SchedulerPolicy for StalenessScheduler {
    fn should_session_request_data(&self, state: &SchedulerState) -> RequestBehavior {
        let behavior = self.decide(state);
        let behavior = match behavior {
            RequestBehavior::RequestWithContent if self.in_backoff() => {
                RequestBehavior::NoRequestWithContent
            }
            // Stale content is served without a wait during backoff.
            RequestBehavior::RequestWithTimeout if self.in_backoff() => {
                RequestBehavior::NoRequestWithContent
            }
            other => other,
        };
        debug!(?state, ?behavior, "Scheduling decision");
        behavior
    }

    fn on_receive_new_content(&self, content_creation_ms: u64) {
        let mut state = self.backoff.lock();
        if state.consecutive_failures > 0 {
            info!(
                failures = state.consecutive_failures,
                content_creation_ms, "Fresh content received, clearing backoff"
            );
        }
        *state = BackoffState::default();
    }

    fn on_request_error(&self, code: u16) {
        let mut state = self.backoff.lock();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        let delay = self.config.backoff_strategy.calculate_delay(
            state.consecutive_failures - 1,
            Duration::from_millis(self.config.backoff_initial_ms),
            Duration::from_millis(self.config.backoff_max_ms),
        );
        state.retry_after_ms = self
            .clock
            .now_ms()
            .saturating_add(delay.as_millis() as u64);
        info!(
            code,
            failures = state.consecutive_failures,
            backoff_ms = delay.as_millis() as u64,
            "Request failed, backing off"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_testkit::ControllableClock;

    const MIN: u64 = 60 * 1000;

    fn scheduler(clock: &ControllableClock) -> StalenessScheduler {
        let config = SchedulerConfig {
            refresh_after_ms: 15 * MIN,
            stale_after_ms: 60 * MIN,
            request_timeout_ms: 1_000,
            backoff_initial_ms: MIN,
            backoff_max_ms: 8 * MIN,
            backoff_strategy: BackoffStrategy::Exponential,
        };
        StalenessScheduler::new(config, Arc::new(clock.clone()))
    }

    fn state(has_content: bool, age: u64, outstanding: bool) -> SchedulerState {
        SchedulerState {
            has_content,
            content_age_ms: age,
            has_outstanding_request: outstanding,
        }
    }

    #[test]
    fn decision_table() {
        let clock = ControllableClock::new(0);
        let s = scheduler(&clock);
        let cases = [
            (state(false, 0, true), RequestBehavior::NoRequestWithWait),
            (state(true, 90 * MIN, true), RequestBehavior::NoRequestWithTimeout),
            (state(true, MIN, true), RequestBehavior::NoRequestWithContent),
            (state(false, 0, false), RequestBehavior::RequestWithWait),
            (state(true, MIN, false), RequestBehavior::NoRequestWithContent),
            (state(true, 20 * MIN, false), RequestBehavior::RequestWithContent),
            (state(true, 60 * MIN, false), RequestBehavior::RequestWithTimeout),
        ];
        for (input, expected) in cases {
            assert_eq!(s.should_session_request_data(&input), expected, "{input:?}");
        }
    }

    #[test]
    fn errors_back_off_requests_with_content() {
        let clock = ControllableClock::new(0);
        let s = scheduler(&clock);
        let aging = state(true, 20 * MIN, false);

        s.on_request_error(5);
        assert_eq!(
            s.should_session_request_data(&aging),
            RequestBehavior::NoRequestWithContent
        );

        clock.advance(MIN);
        assert_eq!(
            s.should_session_request_data(&aging),
            RequestBehavior::RequestWithContent
        );
    }

    #[test]
    fn backoff_grows_and_resets_on_content() {
        let clock = ControllableClock::new(0);
        let s = scheduler(&clock);
        let aging = state(true, 20 * MIN, false);

        s.on_request_error(5);
        s.on_request_error(5);
        assert_eq!(s.consecutive_failures(), 2);

        // Second failure doubles the window.
        clock.advance(MIN);
        assert_eq!(
            s.should_session_request_data(&aging),
            RequestBehavior::NoRequestWithContent
        );
        clock.advance(MIN);
        assert_eq!(
            s.should_session_request_data(&aging),
            RequestBehavior::RequestWithContent
        );

        s.on_request_error(5);
        s.on_receive_new_content(clock.now_ms());
        assert_eq!(s.consecutive_failures(), 0);
        assert_eq!(
            s.should_session_request_data(&aging),
            RequestBehavior::RequestWithContent
        );
    }

    #[test]
    fn stale_content_in_backoff_is_served_without_waiting() {
        let clock = ControllableClock::new(0);
        let s = scheduler(&clock);
        let stale = state(true, 2 * 60 * MIN, false);
        assert_eq!(
            s.should_session_request_data(&stale),
            RequestBehavior::RequestWithTimeout
        );

        s.on_request_error(5);
        assert_eq!(
            s.should_session_request_data(&stale),
            RequestBehavior::NoRequestWithContent
        );
    }

    #[test]
    fn empty_head_is_never_suppressed() {
        let clock = ControllableClock::new(0);
        let s = scheduler(&clock);
        s.on_request_error(4);
        assert_eq!(
            s.should_session_request_data(&state(false, 0, false)),
            RequestBehavior::RequestWithWait
        );
    }

    #[test]
    fn behavior_components() {
        assert!(RequestBehavior::RequestWithTimeout.issues_request());
        assert!(!RequestBehavior::NoRequestWithWait.issues_request());
        assert_eq!(
            RequestBehavior::NoRequestWithTimeout.wait_mode(),
            WaitMode::Bounded
        );
        assert_eq!(
            RequestBehavior::RequestWithContent.wait_mode(),
            WaitMode::Immediate
        );
    }
}
