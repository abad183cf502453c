//! Debouncing of test runs.
//!
//! Edits trigger test runs, but only the latest trigger matters. The
//! scheduler hands out one token per trigger; the host starts a run with the
//! token it was given and the scheduler refuses tokens that were superseded
//! in the meantime. A run that already started is never cancelled: a
//! trigger during it queues exactly one follow-up.

use serde::Serialize;

use crate::error::TraceError;

/// Identifies one scheduled run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ScheduleToken(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScheduleState {
    Idle,
    Scheduled(ScheduleToken),
    Running { queued: Option<ScheduleToken> },
}

#[derive(Debug)]
pub struct TestScheduler {
    state: ScheduleState,
    next_token: u64,
}

impl Default for TestScheduler {
    fn default() -> Self {
        TestScheduler {
            state: ScheduleState::Idle,
            next_token: 1,
        }
    }
}

impl TestScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ScheduleState {
        self.state
    }

    /// Requests a run. A pending run is replaced; during a run the request is
    /// queued behind it.
    pub fn trigger(&mut self) -> ScheduleToken {
        let token = ScheduleToken(self.next_token);
        self.next_token += 1;
        self.state = match self.state {
            ScheduleState::Idle => ScheduleState::Scheduled(token),
            ScheduleState::Scheduled(old) => {
                tracing::debug!("test run {} replaced by {}", old.0, token.0);
                ScheduleState::Scheduled(token)
            }
            ScheduleState::Running { .. } => {
                tracing::debug!("test run {} queued behind the current run", token.0);
                ScheduleState::Running { queued: Some(token) }
            }
        };
        token
    }

    /// Marks the run for `token` as started.
    pub fn start(&mut self, token: ScheduleToken) -> Result<(), TraceError> {
        match self.state {
            ScheduleState::Scheduled(current) if current == token => {
                tracing::debug!("test run {} started", token.0);
                self.state = ScheduleState::Running { queued: None };
                Ok(())
            }
            _ => Err(TraceError::StaleToken { token: token.0 }),
        }
    }

    /// Marks the current run as finished. Returns the queued follow-up, which
    /// is now the scheduled run.
    pub fn finish(&mut self) -> Option<ScheduleToken> {
        match self.state {
            ScheduleState::Running { queued: Some(token) } => {
                self.state = ScheduleState::Scheduled(token);
                Some(token)
            }
            ScheduleState::Running { queued: None } => {
                self.state = ScheduleState::Idle;
                None
            }
            ScheduleState::Idle | ScheduleState::Scheduled(_) => {
                tracing::warn!("finish called with no test run in progress");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrigger_replaces_a_pending_run() {
        let mut scheduler = TestScheduler::new();
        let first = scheduler.trigger();
        let second = scheduler.trigger();
        assert_ne!(first, second);
        assert!(matches!(
            scheduler.start(first),
            Err(TraceError::StaleToken { token }) if token == first.0
        ));
        scheduler.start(second).unwrap();
        assert_eq!(scheduler.state(), ScheduleState::Running { queued: None });
        assert_eq!(scheduler.finish(), None);
        assert_eq!(scheduler.state(), ScheduleState::Idle);
    }

    #[test]
    fn trigger_during_a_run_queues_one_follow_up() {
        let mut scheduler = TestScheduler::new();
        let token = scheduler.trigger();
        scheduler.start(token).unwrap();

        scheduler.trigger();
        let last = scheduler.trigger();
        assert_eq!(scheduler.state(), ScheduleState::Running { queued: Some(last) });

        assert_eq!(scheduler.finish(), Some(last));
        assert_eq!(scheduler.state(), ScheduleState::Scheduled(last));
        scheduler.start(last).unwrap();
    }

    #[test]
    fn start_without_a_schedule_is_refused() {
        let mut scheduler = TestScheduler::new();
        assert!(scheduler.start(ScheduleToken(1)).is_err());
        assert_eq!(scheduler.finish(), None);
    }
}
