use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex as StdMutex,
    },
};

use async_trait::async_trait;
use shared::{
    domain::{Amount, Role, UserId},
    error::GatewayError,
    protocol::{
        BuyerDashboard, BuyerStats, LoginCredentials, RegisterCredentials, SellerDashboard,
        SellerStats, User,
    },
};
use tokio::sync::oneshot;

use crate::gateway::ApiGateway;

pub type Reply<T> = Result<T, GatewayError>;

/// Queue of answers for one gateway method, consumed in call order.
pub struct Script<T> {
    pending: StdMutex<VecDeque<oneshot::Receiver<Reply<T>>>>,
    calls: AtomicUsize,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            pending: StdMutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl<T> Script<T> {
    /// Queues an answer the test resolves later through the returned sender.
    pub fn deferred(&self) -> oneshot::Sender<Reply<T>> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().expect("script lock").push_back(rx);
        tx
    }

    pub fn ready(&self, reply: Reply<T>) {
        let tx = self.deferred();
        let _ = tx.send(reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next(&self) -> Reply<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rx = self.pending.lock().expect("script lock").pop_front();
        match rx {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(GatewayError::Network("scripted reply dropped".into()))),
            None => Err(GatewayError::Network("no scripted reply".into())),
        }
    }

    /// Yields to the runtime until at least `n` calls were made.
    pub async fn wait_for_calls(&self, n: usize) {
        for _ in 0..10_000 {
            if self.calls() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {n} calls, saw {}", self.calls());
    }
}

#[derive(Default)]
pub struct ScriptedGateway {
    pub who_am_i: Script<User>,
    pub login: Script<User>,
    pub register: Script<User>,
    pub logout: Script<()>,
    pub renew: Script<User>,
    pub buyer: Script<BuyerDashboard>,
    pub seller: Script<SellerDashboard>,
}

#[async_trait]
impl ApiGateway for ScriptedGateway {
    async fn who_am_i(&self) -> Result<User, GatewayError> {
        self.who_am_i.next().await
    }

    async fn login(&self, _credentials: &LoginCredentials) -> Result<User, GatewayError> {
        self.login.next().await
    }

    async fn register(&self, _credentials: &RegisterCredentials) -> Result<User, GatewayError> {
        self.register.next().await
    }

    async fn logout(&self) -> Result<(), GatewayError> {
        self.logout.next().await
    }

    async fn renew_session(&self) -> Result<User, GatewayError> {
        self.renew.next().await
    }

    async fn buyer_dashboard(&self) -> Result<BuyerDashboard, GatewayError> {
        self.buyer.next().await
    }

    async fn seller_dashboard(&self) -> Result<SellerDashboard, GatewayError> {
        self.seller.next().await
    }
}

pub fn user(id: i64, username: &str, role: Role) -> User {
    User {
        id: UserId(id),
        username: username.to_string(),
        email: Some(format!("{username}@example.com")),
        role,
        bio: None,
        location: None,
        created_at: None,
    }
}

pub fn credentials(username: &str) -> LoginCredentials {
    LoginCredentials::Username {
        username: username.to_string(),
        password: "correct horse".to_string(),
    }
}

pub fn buyer_dashboard(total_requests: u32) -> BuyerDashboard {
    BuyerDashboard {
        stats: BuyerStats {
            total_requests,
            open_requests: total_requests,
            completed_requests: 0,
            total_spent: Amount::new("0.00"),
        },
        recent_requests: Vec::new(),
    }
}

pub fn seller_dashboard(total_bids: u32) -> SellerDashboard {
    SellerDashboard {
        stats: SellerStats {
            total_bids,
            accepted_bids: 0,
            total_earned: Amount::new("0.00"),
            pending_earnings: None,
        },
        recent_bids: Vec::new(),
        available_requests: None,
    }
}
