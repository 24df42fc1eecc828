//! Session state and events.

use std::time::Duration;

use futures_util::future::{BoxFuture, Shared};
use time::OffsetDateTime;
use tokio::time::Instant;

use crate::credential::AccessCredential;
use crate::error::ClientError;

/// A refresh shared by every caller that asked for a credential while it ran.
pub(crate) type PendingRefresh = Shared<BoxFuture<'static, Result<AccessCredential, ClientError>>>;

/// In-memory session state.
#[derive(Clone, Default)]
pub(crate) enum SessionState {
    #[default]
    Empty,
    Valid(AccessCredential),
    Refreshing {
        pending: PendingRefresh,
        /// Restored if the refresh fails transiently.
        previous: Option<AccessCredential>,
    },
}

impl SessionState {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Valid(_) => "valid",
            Self::Refreshing { .. } => "refreshing",
        }
    }
}

/// Events broadcast to observers of the session, e.g. a UI that redirects
/// to its login surface on [`SessionEvent::Invalidated`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A refresh produced a new access credential.
    Refreshed { expires_at: Option<OffsetDateTime> },
    /// The session can no longer be maintained.
    Invalidated { reason: String },
    /// The session ended through an explicit logout.
    LoggedOut,
}

/// Attempt counter for the refresh cooldown.
#[derive(Debug, Default)]
pub(crate) struct RefreshRateLimit {
    attempts: u32,
    window_started: Option<Instant>,
}

impl RefreshRateLimit {
    /// Records an attempt, or returns how long until the next one is allowed.
    pub(crate) fn try_acquire(
        &mut self,
        now: Instant,
        max_attempts: u32,
        cooldown: Duration,
    ) -> Result<u32, Duration> {
        if let Some(started) = self.window_started {
            let elapsed = now.saturating_duration_since(started);
            if elapsed >= cooldown {
                self.reset();
            } else if self.attempts >= max_attempts {
                return Err(cooldown - elapsed);
            }
        }

        self.window_started.get_or_insert(now);
        self.attempts += 1;
        Ok(self.attempts)
    }

    pub(crate) fn reset(&mut self) {
        self.attempts = 0;
        self.window_started = None;
    }

    /// Restarts the cooldown window at `now` without forgiving attempts.
    pub(crate) fn rearm(&mut self, now: Instant) {
        self.window_started = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_secs(30);

    #[test]
    fn test_ceiling_of_one() {
        let mut limit = RefreshRateLimit::default();
        let start = Instant::now();

        assert_eq!(limit.try_acquire(start, 1, COOLDOWN), Ok(1));
        let retry_after = limit
            .try_acquire(start + Duration::from_secs(10), 1, COOLDOWN)
            .unwrap_err();
        assert_eq!(retry_after, Duration::from_secs(20));
    }

    #[test]
    fn test_window_expires() {
        let mut limit = RefreshRateLimit::default();
        let start = Instant::now();

        limit.try_acquire(start, 1, COOLDOWN).unwrap();
        assert_eq!(limit.try_acquire(start + COOLDOWN, 1, COOLDOWN), Ok(1));
    }

    #[test]
    fn test_reset_allows_immediate_attempt() {
        let mut limit = RefreshRateLimit::default();
        let start = Instant::now();

        limit.try_acquire(start, 1, COOLDOWN).unwrap();
        limit.reset();
        assert!(limit.try_acquire(start, 1, COOLDOWN).is_ok());
    }

    #[test]
    fn test_rearm_restarts_cooldown() {
        let mut limit = RefreshRateLimit::default();
        let start = Instant::now();

        limit.try_acquire(start, 1, COOLDOWN).unwrap();
        limit.rearm(start + Duration::from_secs(25));

        let retry_after = limit
            .try_acquire(start + Duration::from_secs(31), 1, COOLDOWN)
            .unwrap_err();
        assert_eq!(retry_after, Duration::from_secs(24));
    }

    #[test]
    fn test_higher_ceiling() {
        let mut limit = RefreshRateLimit::default();
        let start = Instant::now();

        assert_eq!(limit.try_acquire(start, 3, COOLDOWN), Ok(1));
        assert_eq!(limit.try_acquire(start, 3, COOLDOWN), Ok(2));
        assert_eq!(limit.try_acquire(start, 3, COOLDOWN), Ok(3));
        assert!(limit.try_acquire(start, 3, COOLDOWN).is_err());
    }
}
