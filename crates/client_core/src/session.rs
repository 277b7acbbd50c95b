use std::sync::Arc;

use serde::Serialize;
use shared::{
    error::GatewayError,
    protocol::{LoginCredentials, RegisterCredentials, User},
};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::{
    gateway::ApiGateway,
    generation::{GenerationCounter, Ticket},
};

const LOGIN_FAILED_MESSAGE: &str = "Login failed";
const REGISTRATION_FAILED_MESSAGE: &str = "Registration failed";
const RENEWAL_FAILED_MESSAGE: &str = "Token refresh failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Unknown,
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Snapshot of the authentication state.
///
/// Fields are private so `user` is populated exactly when the status is
/// [`SessionStatus::Authenticated`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    status: SessionStatus,
    user: Option<User>,
}

impl Session {
    pub fn unknown() -> Self {
        Self {
            status: SessionStatus::Unknown,
            user: None,
        }
    }

    pub fn loading() -> Self {
        Self {
            status: SessionStatus::Loading,
            user: None,
        }
    }

    pub fn authenticated(user: User) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            user: Some(user),
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            user: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

/// User-facing reason a login or registration did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AuthRejected {
    pub message: String,
}

impl AuthRejected {
    fn from_gateway(err: &GatewayError, fallback: &str) -> Self {
        let message = match err {
            GatewayError::Domain(message) => message.clone(),
            GatewayError::AuthRequired(Some(message)) => message.clone(),
            GatewayError::AuthRequired(None) => fallback.to_string(),
            GatewayError::Network(_) | GatewayError::Protocol(_) => err.user_message(),
        };
        Self { message }
    }
}

struct SessionMachine {
    generation: GenerationCounter,
    started: bool,
}

/// Owner of the process-wide [`Session`].
///
/// All transitions go through this type; everyone else reads snapshots via
/// [`SessionStore::session`] or a [`watch::Receiver`] from
/// [`SessionStore::subscribe`]. Every operation takes a ticket before calling
/// the backend and commits only if no newer operation was started meanwhile.
pub struct SessionStore {
    gateway: Arc<dyn ApiGateway>,
    machine: Mutex<SessionMachine>,
    state: watch::Sender<Session>,
}

impl SessionStore {
    pub fn new(gateway: Arc<dyn ApiGateway>) -> Self {
        let (state, _) = watch::channel(Session::unknown());
        Self {
            gateway,
            machine: Mutex::new(SessionMachine {
                generation: GenerationCounter::new(),
                started: false,
            }),
            state,
        }
    }

    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Runs the initial probe once per store; later calls return immediately.
    pub async fn start(&self) {
        {
            let mut machine = self.machine.lock().await;
            if machine.started || machine.generation.is_retired() {
                return;
            }
            machine.started = true;
        }
        self.check_auth().await;
    }

    /// Probes `/auth/me/` and settles the session from the answer.
    pub async fn check_auth(&self) {
        let Some(ticket) = self.begin(Some(Session::loading())).await else {
            return;
        };

        let next = match self.gateway.who_am_i().await {
            Ok(user) => Session::authenticated(user),
            Err(GatewayError::AuthRequired(_)) => {
                info!(ticket = ticket.value(), "session: probe found no active session");
                Session::unauthenticated()
            }
            Err(err) => {
                warn!(ticket = ticket.value(), error = %err, "session: probe failed");
                Session::unauthenticated()
            }
        };
        self.commit(ticket, next).await;
    }

    /// Manual re-probe, e.g. after a token expired.
    pub async fn refresh(&self) {
        self.check_auth().await;
    }

    /// Extends the backend session cookie. An expired session ends up
    /// unauthenticated; any other failure keeps the current state.
    pub async fn renew(&self) -> Result<User, AuthRejected> {
        let Some(ticket) = self.begin(None).await else {
            return Err(closed_rejection());
        };

        match self.gateway.renew_session().await {
            Ok(user) => {
                debug!(user_id = user.id.0, "session: renewed");
                self.commit(ticket, Session::authenticated(user.clone())).await;
                Ok(user)
            }
            Err(err @ GatewayError::AuthRequired(_)) => {
                info!(error = %err, "session: renewal refused");
                self.commit(ticket, Session::unauthenticated()).await;
                Err(AuthRejected::from_gateway(&err, RENEWAL_FAILED_MESSAGE))
            }
            Err(err) => {
                warn!(error = %err, "session: renewal failed");
                self.settle_rejection(ticket).await;
                Err(AuthRejected::from_gateway(&err, RENEWAL_FAILED_MESSAGE))
            }
        }
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> Result<User, AuthRejected> {
        let Some(ticket) = self.begin(None).await else {
            return Err(closed_rejection());
        };

        match self.gateway.login(credentials).await {
            Ok(user) => {
                info!(user_id = user.id.0, "session: login succeeded");
                self.commit(ticket, Session::authenticated(user.clone())).await;
                Ok(user)
            }
            Err(err) => {
                log_rejection("login", credentials.identifier(), &err);
                self.settle_rejection(ticket).await;
                Err(AuthRejected::from_gateway(&err, LOGIN_FAILED_MESSAGE))
            }
        }
    }

    pub async fn register(&self, credentials: &RegisterCredentials) -> Result<User, AuthRejected> {
        let Some(ticket) = self.begin(None).await else {
            return Err(closed_rejection());
        };

        match self.gateway.register(credentials).await {
            Ok(user) => {
                info!(user_id = user.id.0, "session: registration succeeded");
                self.commit(ticket, Session::authenticated(user.clone())).await;
                Ok(user)
            }
            Err(err) => {
                log_rejection("register", &credentials.username, &err);
                self.settle_rejection(ticket).await;
                Err(AuthRejected::from_gateway(&err, REGISTRATION_FAILED_MESSAGE))
            }
        }
    }

    /// Drops the local session immediately; the backend call is best effort.
    pub async fn logout(&self) {
        if self.begin(Some(Session::unauthenticated())).await.is_none() {
            return;
        }
        info!("session: logged out locally");

        if let Err(err) = self.gateway.logout().await {
            warn!(error = %err, "session: logout request failed");
        }
    }

    /// Ends the store's lifecycle; results still in flight are dropped.
    pub async fn close(&self) {
        let mut machine = self.machine.lock().await;
        machine.generation.retire();
        debug!("session: store closed");
    }

    async fn begin(&self, transition: Option<Session>) -> Option<Ticket> {
        let mut machine = self.machine.lock().await;
        if machine.generation.is_retired() {
            return None;
        }
        let ticket = machine.generation.issue();
        if let Some(next) = transition {
            self.publish(next);
        }
        Some(ticket)
    }

    async fn commit(&self, ticket: Ticket, next: Session) {
        let machine = self.machine.lock().await;
        if !machine.generation.is_current(ticket) {
            debug!(
                ticket = ticket.value(),
                status = ?next.status(),
                "session: discarding superseded result"
            );
            return;
        }
        self.publish(next);
    }

    /// A rejected login or registration only settles a session that was still
    /// unresolved; an established session is left as it is.
    async fn settle_rejection(&self, ticket: Ticket) {
        let machine = self.machine.lock().await;
        if !machine.generation.is_current(ticket) {
            debug!(ticket = ticket.value(), "session: discarding superseded rejection");
            return;
        }
        let unresolved = matches!(
            self.state.borrow().status(),
            SessionStatus::Unknown | SessionStatus::Loading
        );
        if unresolved {
            self.publish(Session::unauthenticated());
        }
    }

    fn publish(&self, next: Session) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            info!(from = ?current.status(), to = ?next.status(), "session: transition");
            *current = next;
            true
        });
    }
}

fn closed_rejection() -> AuthRejected {
    AuthRejected {
        message: shared::error::UNEXPECTED_ERROR_MESSAGE.to_string(),
    }
}

fn log_rejection(operation: &str, identifier: &str, err: &GatewayError) {
    if err.is_unexpected() {
        warn!(operation, identifier, error = %err, "session: request failed");
    } else {
        info!(operation, identifier, error = %err, "session: request rejected");
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
