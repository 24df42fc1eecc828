//! Single-flight refresh coordination.
//!
//! The coordinator owns the client session. Every caller that needs an access
//! credential goes through it; when none is usable, the first caller starts a
//! refresh and every later caller awaits that same shared future until it
//! resolves. The check-and-start step happens under one lock, so a refresh is
//! never started twice.
//!
//! The refresh itself runs on a spawned task bounded by `refresh_timeout`.
//! Callers that stop waiting do not cancel it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::credential::AccessCredential;
use crate::error::ClientError;
use crate::session::{PendingRefresh, RefreshRateLimit, SessionEvent, SessionState};
use crate::transport::RefreshTransport;

#[derive(Default)]
struct CoordinatorState {
    session: SessionState,
    /// Bumped whenever the session is replaced; stale refresh results are discarded.
    generation: u64,
    rate_limit: RefreshRateLimit,
}

struct Inner {
    transport: Arc<dyn RefreshTransport>,
    config: ClientConfig,
    state: Mutex<CoordinatorState>,
    events: broadcast::Sender<SessionEvent>,
}

enum NextStep {
    Join(PendingRefresh),
    Start(Option<AccessCredential>),
}

/// Client session cache and refresh coordinator.
///
/// Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    /// Creates a coordinator with an empty session.
    #[must_use]
    pub fn new(transport: Arc<dyn RefreshTransport>, config: ClientConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                state: Mutex::new(CoordinatorState::default()),
                events,
            }),
        }
    }

    /// Subscribes to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Returns the cached credential, if the session is valid.
    #[must_use]
    pub fn current(&self) -> Option<AccessCredential> {
        match &self.inner.lock().session {
            SessionState::Valid(credential) => Some(credential.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        matches!(self.inner.lock().session, SessionState::Refreshing { .. })
    }

    /// `"empty"`, `"valid"` or `"refreshing"`.
    #[must_use]
    pub fn state_name(&self) -> &'static str {
        self.inner.lock().session.name()
    }

    /// Returns a usable access credential, refreshing if needed.
    ///
    /// Concurrent callers share one refresh call and receive the same outcome.
    ///
    /// # Errors
    ///
    /// Returns `RateLimited` while refresh attempts are on cooldown, or the
    /// failure of the shared refresh.
    pub async fn ensure_access_credential(&self) -> Result<AccessCredential, ClientError> {
        let pending = {
            let mut state = self.inner.lock();
            let next = match &state.session {
                SessionState::Valid(credential) if !self.is_stale(credential) => {
                    return Ok(credential.clone());
                }
                SessionState::Refreshing { pending, .. } => NextStep::Join(pending.clone()),
                SessionState::Valid(_) | SessionState::Empty => NextStep::Start(None),
            };
            self.resolve(&mut state, next)?
        };
        pending.await
    }

    /// Returns a credential to replace one the server just rejected.
    ///
    /// If another caller already replaced `rejected`, the newer credential is
    /// returned without a network call.
    ///
    /// # Errors
    ///
    /// Same as [`ensure_access_credential`](Self::ensure_access_credential).
    pub async fn refresh_after_rejection(
        &self,
        rejected: &str,
    ) -> Result<AccessCredential, ClientError> {
        let pending = {
            let mut state = self.inner.lock();
            let next = match &state.session {
                SessionState::Valid(credential)
                    if credential.token() != rejected && !self.is_stale(credential) =>
                {
                    return Ok(credential.clone());
                }
                SessionState::Valid(credential) if credential.token() == rejected => {
                    NextStep::Start(None)
                }
                SessionState::Valid(credential) => NextStep::Start(Some(credential.clone())),
                SessionState::Refreshing { pending, .. } => NextStep::Join(pending.clone()),
                SessionState::Empty => NextStep::Start(None),
            };
            self.resolve(&mut state, next)?
        };
        pending.await
    }

    /// Installs a credential obtained from a login.
    pub fn set_credential(&self, credential: AccessCredential) {
        let mut state = self.inner.lock();
        state.generation += 1;
        state.session = SessionState::Valid(credential);
        state.rate_limit.reset();
    }

    /// Clears the session and broadcasts [`SessionEvent::Invalidated`].
    pub fn invalidate(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.inner.clear();
        warn!(%reason, "Session invalidated");
        self.inner.emit(SessionEvent::Invalidated { reason });
    }

    /// Clears the session and broadcasts [`SessionEvent::LoggedOut`].
    pub fn logout(&self) {
        self.inner.clear();
        debug!("Session logged out");
        self.inner.emit(SessionEvent::LoggedOut);
    }

    /// Seeds the session from an inbound `Cookie` header.
    ///
    /// The first configured access cookie name present in the header decides:
    /// its value is installed only if it parses and has not expired.
    /// Returns `true` if the session was seeded.
    pub fn bootstrap_from_cookie_header(&self, header: &str) -> bool {
        let cookies: Vec<(&str, &str)> = header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .collect();

        let Some((name, value)) = self.inner.config.access_cookie_names.iter().find_map(|name| {
            cookies
                .iter()
                .find(|(cookie_name, _)| cookie_name == name)
                .map(|(_, value)| (name, *value))
        }) else {
            return false;
        };

        match AccessCredential::from_token(value) {
            Ok(credential) if !self.is_stale(&credential) => {
                debug!(cookie = %name, "Session bootstrapped from cookie");
                self.set_credential(credential);
                true
            }
            Ok(_) => {
                debug!(cookie = %name, "Ignoring expired access cookie");
                false
            }
            Err(e) => {
                debug!(cookie = %name, error = %e, "Ignoring unreadable access cookie");
                false
            }
        }
    }

    fn is_stale(&self, credential: &AccessCredential) -> bool {
        credential.is_expired(self.inner.config.expiry_margin)
    }

    fn resolve(
        &self,
        state: &mut CoordinatorState,
        next: NextStep,
    ) -> Result<PendingRefresh, ClientError> {
        match next {
            NextStep::Join(pending) => Ok(pending),
            NextStep::Start(previous) => self.start_refresh(state, previous),
        }
    }

    /// Starts a refresh. Must be called with the state lock held.
    fn start_refresh(
        &self,
        state: &mut CoordinatorState,
        previous: Option<AccessCredential>,
    ) -> Result<PendingRefresh, ClientError> {
        let config = &self.inner.config;
        let attempt = state
            .rate_limit
            .try_acquire(
                Instant::now(),
                config.max_refresh_attempts,
                config.refresh_cooldown,
            )
            .map_err(|retry_after| {
                debug!(?retry_after, "Refresh rate limited");
                ClientError::RateLimited { retry_after }
            })?;

        state.generation += 1;
        let generation = state.generation;
        debug!(attempt, generation, "Starting refresh");

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let outcome =
                match tokio::time::timeout(inner.config.refresh_timeout, inner.transport.refresh())
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ClientError::Timeout),
                };
            inner.complete(generation, &outcome);
            outcome
        });

        let inner = Arc::clone(&self.inner);
        let pending = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let outcome = Err(ClientError::network(format!("refresh task failed: {e}")));
                    inner.complete(generation, &outcome);
                    outcome
                }
            }
        }
        .boxed()
        .shared();

        state.session = SessionState::Refreshing {
            pending: pending.clone(),
            previous,
        };
        Ok(pending)
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn clear(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.session = SessionState::Empty;
    }

    fn complete(&self, generation: u64, outcome: &Result<AccessCredential, ClientError>) {
        let mut state = self.lock();
        if state.generation != generation {
            debug!(generation, "Discarding superseded refresh result");
            return;
        }

        let previous = match std::mem::take(&mut state.session) {
            SessionState::Refreshing { previous, .. } => previous,
            _ => None,
        };

        match outcome {
            Ok(credential) => {
                state.session = SessionState::Valid(credential.clone());
                state.rate_limit.reset();
                drop(state);
                debug!(generation, "Refresh succeeded");
                self.emit(SessionEvent::Refreshed {
                    expires_at: credential.expires_at(),
                });
            }
            Err(err) if err.is_terminal() => {
                state.rate_limit.rearm(Instant::now());
                drop(state);
                warn!(generation, error = %err, "Refresh rejected, session invalidated");
                self.emit(SessionEvent::Invalidated {
                    reason: err.to_string(),
                });
            }
            Err(err) => {
                state.session = previous.map_or(SessionState::Empty, SessionState::Valid);
                drop(state);
                warn!(generation, error = %err, "Refresh failed, keeping session");
            }
        }
    }
}
