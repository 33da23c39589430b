use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::error::CodeflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationState {
    #[default]
    Unknown,
    PendingExternalApproval,
}

/// What resolved a pending authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationSignal {
    /// Control came back through the redirect URL; carries the full payload.
    Redirected(String),
    /// The app became active again without a redirect: the user abandoned
    /// the external authorization.
    Resumed,
}

/// Registration for both lifecycle signals of one pending request.
///
/// Taking it out of the machine unregisters both at once, so only the first
/// signal can ever reach the waiting request.
#[derive(Debug)]
struct PendingObservers {
    generation: u64,
    resolve: oneshot::Sender<AuthorizationSignal>,
}

#[derive(Debug, Default)]
struct Inner {
    state: AuthorizationState,
    observers: Option<PendingObservers>,
    generation: u64,
}

/// Tracks the single in-flight authorization-code request.
#[derive(Debug, Default)]
pub struct AuthorizationStateMachine {
    inner: Mutex<Inner>,
}

impl AuthorizationStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> AuthorizationState {
        self.lock().state
    }

    pub fn is_pending(&self) -> bool {
        self.state() == AuthorizationState::PendingExternalApproval
    }

    /// Enter `PendingExternalApproval` and register the observers.
    ///
    /// The returned receiver yields whichever signal arrives first. Fails
    /// with `AuthorizationPending` if a request is already in flight.
    pub fn begin(&self) -> Result<oneshot::Receiver<AuthorizationSignal>, CodeflowError> {
        self.register().map(|(_, rx)| rx)
    }

    /// Like [`begin`](Self::begin), but the returned request abandons itself
    /// when dropped before a signal arrives, so a cancelled caller cannot
    /// leave the machine stuck in `PendingExternalApproval`.
    pub fn begin_request(&self) -> Result<PendingRequest<'_>, CodeflowError> {
        let (generation, signal) = self.register()?;
        Ok(PendingRequest {
            machine: self,
            generation,
            signal,
        })
    }

    fn register(&self) -> Result<(u64, oneshot::Receiver<AuthorizationSignal>), CodeflowError> {
        let mut inner = self.lock();
        if inner.state == AuthorizationState::PendingExternalApproval {
            return Err(CodeflowError::AuthorizationPending);
        }
        let (tx, rx) = oneshot::channel();
        inner.generation = inner.generation.wrapping_add(1);
        let generation = inner.generation;
        inner.observers = Some(PendingObservers {
            generation,
            resolve: tx,
        });
        inner.state = AuthorizationState::PendingExternalApproval;
        tracing::debug!("authorization pending external approval");
        Ok((generation, rx))
    }

    /// Deliver the redirect payload. Returns `false` when nothing is pending.
    pub fn deliver_redirect(&self, payload: impl Into<String>) -> bool {
        self.resolve(AuthorizationSignal::Redirected(payload.into()))
    }

    /// Deliver the "app became active" signal. When pending, the request is
    /// treated as abandoned; otherwise this is a no-op.
    pub fn deliver_app_resumed(&self) -> bool {
        self.resolve(AuthorizationSignal::Resumed)
    }

    /// Drop any pending request without notifying it.
    pub fn abandon(&self) -> bool {
        self.take_observers().is_some()
    }

    fn resolve(&self, signal: AuthorizationSignal) -> bool {
        let Some(observers) = self.take_observers() else {
            tracing::debug!("ignoring {signal:?}: no authorization pending");
            return false;
        };
        // The waiting request may have gone away (e.g. its future was
        // dropped); the state is already reset either way.
        let _ = observers.resolve.send(signal);
        true
    }

    fn take_observers(&self) -> Option<PendingObservers> {
        let mut inner = self.lock();
        inner.state = AuthorizationState::Unknown;
        inner.observers.take()
    }

    /// Abandon only if `generation` is still the pending request.
    fn abandon_generation(&self, generation: u64) -> bool {
        let mut inner = self.lock();
        match &inner.observers {
            Some(observers) if observers.generation == generation => {
                inner.observers = None;
                inner.state = AuthorizationState::Unknown;
                true
            }
            _ => false,
        }
    }
}

/// One in-flight authorization request.
///
/// Dropping it while still pending abandons the request.
#[derive(Debug)]
pub struct PendingRequest<'a> {
    machine: &'a AuthorizationStateMachine,
    generation: u64,
    signal: oneshot::Receiver<AuthorizationSignal>,
}

impl PendingRequest<'_> {
    /// Wait for the first signal. An error means the observers were dropped
    /// without one (the request was abandoned).
    pub async fn signal(&mut self) -> Result<AuthorizationSignal, oneshot::error::RecvError> {
        (&mut self.signal).await
    }
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        if self.machine.abandon_generation(self.generation) {
            tracing::debug!("authorization request dropped while pending");
        }
    }
}

/// Cloneable handle through which the host application reports lifecycle
/// events (redirect received, app resumed) from any thread.
#[derive(Debug, Clone)]
pub struct LifecycleHandle {
    machine: Arc<AuthorizationStateMachine>,
}

impl LifecycleHandle {
    pub(crate) fn new(machine: Arc<AuthorizationStateMachine>) -> Self {
        Self { machine }
    }

    pub fn redirect_received(&self, payload: impl Into<String>) -> bool {
        self.machine.deliver_redirect(payload)
    }

    pub fn app_resumed(&self) -> bool {
        self.machine.deliver_app_resumed()
    }

    pub fn state(&self) -> AuthorizationState {
        self.machine.state()
    }
}
