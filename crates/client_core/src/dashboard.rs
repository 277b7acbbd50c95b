use std::{sync::Arc, time::Duration};

use serde::Serialize;
use shared::{
    domain::{DatasetKind, Role, UserId},
    error::GatewayError,
    protocol::{BuyerDashboard, SellerDashboard},
};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::{
    config::ClientSettings,
    gateway::ApiGateway,
    generation::{GenerationCounter, Ticket},
    session::{Session, SessionStatus},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardOptions {
    pub request_timeout: Duration,
    pub prefetch_dual_role: bool,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            prefetch_dual_role: false,
        }
    }
}

impl From<&ClientSettings> for DashboardOptions {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            request_timeout: settings.request_timeout,
            prefetch_dual_role: settings.prefetch_dual_role,
        }
    }
}

/// What the dashboard UI renders. Only the orchestrator writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub active_tab: DatasetKind,
    pub buyer_data: Option<BuyerDashboard>,
    pub seller_data: Option<SellerDashboard>,
    pub loading: bool,
    pub error: Option<String>,
}

impl DashboardView {
    fn new(active_tab: DatasetKind) -> Self {
        Self {
            active_tab,
            buyer_data: None,
            seller_data: None,
            loading: false,
            error: None,
        }
    }
}

/// Datasets one fetch cycle asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetPlan {
    pub buyer: bool,
    pub seller: bool,
}

impl DatasetPlan {
    /// A dataset is needed when the tab shows it or the role is pinned to it.
    /// Dual-role accounts follow the tab unless prefetching is enabled.
    pub fn for_selection(tab: DatasetKind, role: Role, prefetch_dual_role: bool) -> Self {
        let needs = |kind: DatasetKind| {
            tab == kind
                || role.pinned_tab() == Some(kind)
                || (prefetch_dual_role && role == Role::Both)
        };
        Self {
            buyer: needs(DatasetKind::Buyer),
            seller: needs(DatasetKind::Seller),
        }
    }

    pub fn includes(self, kind: DatasetKind) -> bool {
        match kind {
            DatasetKind::Buyer => self.buyer,
            DatasetKind::Seller => self.seller,
        }
    }

    pub fn len(self) -> usize {
        DatasetKind::ALL
            .into_iter()
            .filter(|kind| self.includes(*kind))
            .count()
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

enum Dataset {
    Buyer(BuyerDashboard),
    Seller(SellerDashboard),
}

struct DashboardState {
    generation: GenerationCounter,
    role: Role,
    pending: usize,
    view: DashboardView,
}

/// Fetches and merges the buyer/seller dashboard datasets for the current
/// `(tab, role)` selection.
///
/// Each cycle takes a fresh ticket; results from superseded cycles, or from
/// any cycle after [`DashboardOrchestrator::teardown`], are dropped.
pub struct DashboardOrchestrator {
    gateway: Arc<dyn ApiGateway>,
    options: DashboardOptions,
    state: Mutex<DashboardState>,
    updates: watch::Sender<DashboardView>,
}

impl DashboardOrchestrator {
    pub fn new(gateway: Arc<dyn ApiGateway>, role: Role, options: DashboardOptions) -> Self {
        let view = DashboardView::new(role.default_tab());
        let (updates, _) = watch::channel(view.clone());
        Self {
            gateway,
            options,
            state: Mutex::new(DashboardState {
                generation: GenerationCounter::new(),
                role,
                pending: 0,
                view,
            }),
            updates,
        }
    }

    pub async fn view(&self) -> DashboardView {
        self.state.lock().await.view.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardView> {
        self.updates.subscribe()
    }

    pub async fn fetch(&self, tab: DatasetKind, role: Role) {
        let Some((ticket, plan)) = self.begin(tab, role).await else {
            return;
        };
        self.run_cycle(ticket, plan).await;
    }

    async fn run_cycle(&self, ticket: Ticket, plan: DatasetPlan) {
        let buyer = async {
            if plan.buyer {
                let result = self
                    .bounded(DatasetKind::Buyer, self.gateway.buyer_dashboard())
                    .await
                    .map(Dataset::Buyer);
                self.settle(ticket, DatasetKind::Buyer, result).await;
            }
        };
        let seller = async {
            if plan.seller {
                let result = self
                    .bounded(DatasetKind::Seller, self.gateway.seller_dashboard())
                    .await
                    .map(Dataset::Seller);
                self.settle(ticket, DatasetKind::Seller, result).await;
            }
        };
        futures::join!(buyer, seller);
    }

    /// Re-runs the current selection, e.g. from a retry button.
    pub async fn refetch(&self) {
        let (tab, role) = {
            let state = self.state.lock().await;
            (state.view.active_tab, state.role)
        };
        self.fetch(tab, role).await;
    }

    pub async fn set_active_tab(&self, tab: DatasetKind) {
        let role = self.state.lock().await.role;
        self.fetch(tab, role).await;
    }

    pub async fn set_role(&self, role: Role) {
        let tab = self.state.lock().await.view.active_tab;
        self.fetch(tab, role).await;
    }

    /// Drops every loaded dataset and supersedes the cycle in flight, if any.
    /// The next fetch starts from an empty view.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        if state.generation.is_retired() {
            return;
        }
        let ticket = state.generation.issue();
        state.pending = 0;
        state.view.buyer_data = None;
        state.view.seller_data = None;
        state.view.loading = false;
        state.view.error = None;
        debug!(ticket = ticket.value(), "dashboard: cleared");
        self.publish(&state.view);
    }

    /// Keeps the dashboard in step with the session until the session store
    /// goes away.
    ///
    /// A signed-in user, or a change of user or role, starts a fresh cycle
    /// in the background; losing the session clears the view and discards
    /// whatever was still in flight.
    pub async fn follow(self: Arc<Self>, mut session: watch::Receiver<Session>) {
        let mut followed: Option<(UserId, Role)> = None;
        loop {
            let snapshot = session.borrow_and_update().clone();
            match (snapshot.status(), snapshot.user()) {
                (SessionStatus::Authenticated, Some(user)) => {
                    let current = (user.id, user.role);
                    if followed != Some(current) {
                        if followed.is_some_and(|(id, _)| id != user.id) {
                            self.clear().await;
                        }
                        followed = Some(current);
                        info!(
                            user_id = user.id.0,
                            role = ?user.role,
                            "dashboard: following session"
                        );
                        let tab = user.role.admit(self.state.lock().await.view.active_tab);
                        if let Some((ticket, plan)) = self.begin(tab, user.role).await {
                            let dashboard = self.clone();
                            tokio::spawn(async move { dashboard.run_cycle(ticket, plan).await });
                        }
                    }
                }
                (SessionStatus::Unauthenticated, _) => {
                    if followed.take().is_some() {
                        info!("dashboard: session ended");
                    }
                    self.clear().await;
                }
                _ => {}
            }

            if session.changed().await.is_err() {
                debug!("dashboard: session store gone");
                return;
            }
        }
    }

    /// Detaches the orchestrator from its view: nothing resolves into it anymore.
    pub async fn teardown(&self) {
        let mut state = self.state.lock().await;
        state.generation.retire();
        state.pending = 0;
        if state.view.loading {
            state.view.loading = false;
            self.publish(&state.view);
        }
        debug!("dashboard: torn down");
    }

    async fn begin(&self, requested: DatasetKind, role: Role) -> Option<(Ticket, DatasetPlan)> {
        let mut state = self.state.lock().await;
        if state.generation.is_retired() {
            return None;
        }

        let tab = role.admit(requested);
        if tab != requested {
            warn!(
                requested = %requested,
                admitted = %tab,
                role = ?role,
                "dashboard: tab not available for role"
            );
        }

        let plan = DatasetPlan::for_selection(tab, role, self.options.prefetch_dual_role);
        let ticket = state.generation.issue();
        state.role = role;
        state.pending = plan.len();
        state.view.active_tab = tab;
        state.view.loading = !plan.is_empty();
        state.view.error = None;
        info!(
            ticket = ticket.value(),
            tab = %tab,
            role = ?role,
            buyer = plan.buyer,
            seller = plan.seller,
            "dashboard: fetch started"
        );
        self.publish(&state.view);
        Some((ticket, plan))
    }

    async fn bounded<T, F>(&self, kind: DatasetKind, call: F) -> Result<T, GatewayError>
    where
        F: std::future::Future<Output = Result<T, GatewayError>>,
    {
        match tokio::time::timeout(self.options.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(dataset = %kind, timeout = ?self.options.request_timeout, "dashboard: request timed out");
                Err(GatewayError::Network(format!("{kind} dashboard request timed out")))
            }
        }
    }

    async fn settle(&self, ticket: Ticket, kind: DatasetKind, result: Result<Dataset, GatewayError>) {
        let mut state = self.state.lock().await;
        if !state.generation.is_current(ticket) {
            debug!(ticket = ticket.value(), dataset = %kind, "dashboard: discarding superseded result");
            return;
        }

        match result {
            Ok(Dataset::Buyer(data)) => state.view.buyer_data = Some(data),
            Ok(Dataset::Seller(data)) => state.view.seller_data = Some(data),
            Err(err) => {
                if err.is_unexpected() {
                    warn!(dataset = %kind, error = %err, "dashboard: fetch failed");
                } else {
                    info!(dataset = %kind, error = %err, "dashboard: fetch rejected");
                }
                if state.view.error.is_none() {
                    state.view.error = Some(err.user_message());
                }
            }
        }

        state.pending = state.pending.saturating_sub(1);
        if state.pending == 0 {
            state.view.loading = false;
        }
        self.publish(&state.view);
    }

    fn publish(&self, view: &DashboardView) {
        self.updates.send_replace(view.clone());
    }
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
