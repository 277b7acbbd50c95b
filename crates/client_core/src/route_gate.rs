use tokio::sync::watch;
use tracing::info;

use crate::session::{Session, SessionStatus};

pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Spinner,
    Redirect,
    Render,
}

pub fn evaluate(session: &Session) -> GateOutcome {
    match session.status() {
        SessionStatus::Unknown | SessionStatus::Loading => GateOutcome::Spinner,
        SessionStatus::Unauthenticated => GateOutcome::Redirect,
        SessionStatus::Authenticated => GateOutcome::Render,
    }
}

/// Navigation side effect used by the gate.
pub trait Navigator: Send + Sync {
    /// Replaces the current location instead of pushing a history entry.
    fn replace(&self, path: &str);
}

/// Guards protected content behind the session state.
pub struct RouteGate<N: Navigator> {
    navigator: N,
    login_path: String,
    redirected: bool,
}

impl<N: Navigator> RouteGate<N> {
    pub fn new(navigator: N) -> Self {
        Self::with_login_path(navigator, DEFAULT_LOGIN_PATH)
    }

    pub fn with_login_path(navigator: N, login_path: impl Into<String>) -> Self {
        Self {
            navigator,
            login_path: login_path.into(),
            redirected: false,
        }
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Evaluates the gate for one render pass. Re-rendering while still
    /// unauthenticated does not navigate again.
    pub fn render(&mut self, session: &Session) -> GateOutcome {
        let outcome = evaluate(session);
        match outcome {
            GateOutcome::Redirect => {
                if !self.redirected {
                    self.redirected = true;
                    info!(path = %self.login_path, "route_gate: redirecting to login");
                    self.navigator.replace(&self.login_path);
                }
            }
            GateOutcome::Spinner | GateOutcome::Render => self.redirected = false,
        }
        outcome
    }

    /// Waits for the next session change and renders it. `None` once the
    /// session store is gone.
    pub async fn next_outcome(&mut self, session: &mut watch::Receiver<Session>) -> Option<GateOutcome> {
        session.changed().await.ok()?;
        let snapshot = session.borrow_and_update().clone();
        Some(self.render(&snapshot))
    }
}

#[cfg(test)]
#[path = "tests/route_gate_tests.rs"]
mod tests;
