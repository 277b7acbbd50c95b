use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::{
    envelope::{decode_ack, decode_envelope},
    error::GatewayError,
    protocol::{
        AuthPayload, BuyerDashboard, LoginCredentials, RegisterCredentials, SellerDashboard, User,
    },
};
use tracing::debug;
use url::Url;

use crate::config::{normalize_base_url, ClientSettings};

const ME_ROUTE: &str = "auth/me/";
const LOGIN_ROUTE: &str = "auth/login/";
const REGISTER_ROUTE: &str = "auth/register/";
const LOGOUT_ROUTE: &str = "auth/logout/";
const REFRESH_ROUTE: &str = "auth/refresh/";
const BUYER_DASHBOARD_ROUTE: &str = "dashboard/buyer/";
const SELLER_DASHBOARD_ROUTE: &str = "dashboard/seller/";

/// Backend calls the client core depends on. Every method resolves to either
/// the decoded `data` of a successful envelope or a classified failure.
#[async_trait]
pub trait ApiGateway: Send + Sync {
    async fn who_am_i(&self) -> Result<User, GatewayError>;
    async fn login(&self, credentials: &LoginCredentials) -> Result<User, GatewayError>;
    async fn register(&self, credentials: &RegisterCredentials) -> Result<User, GatewayError>;
    async fn logout(&self) -> Result<(), GatewayError>;
    async fn renew_session(&self) -> Result<User, GatewayError>;
    async fn buyer_dashboard(&self) -> Result<BuyerDashboard, GatewayError>;
    async fn seller_dashboard(&self) -> Result<SellerDashboard, GatewayError>;
}

/// reqwest-backed gateway. The session lives in an HTTP-only cookie, so the
/// client keeps a cookie jar and never puts tokens in request bodies.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(base_url: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let http = Client::builder()
            .cookie_store(true)
            .timeout(request_timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self { http, base_url })
    }

    pub fn from_settings(settings: &ClientSettings) -> anyhow::Result<Self> {
        Self::new(&settings.api_base_url, settings.request_timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, route: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(route)
            .map_err(|e| GatewayError::Protocol(format!("invalid endpoint '{route}': {e}")))
    }

    async fn send(&self, route: &str, request: RequestBuilder) -> Result<(u16, Vec<u8>), GatewayError> {
        let response = request.send().await.map_err(network_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(network_error)?;
        debug!(route, status, bytes = body.len(), "gateway: response received");
        Ok((status, body.to_vec()))
    }

    async fn get_data<T: DeserializeOwned>(&self, route: &str) -> Result<T, GatewayError> {
        let url = self.endpoint(route)?;
        let (status, body) = self.send(route, self.http.get(url)).await?;
        decode_envelope(status, &body)
    }

    async fn post_data<B, T>(&self, route: &str, payload: &B) -> Result<T, GatewayError>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(route)?;
        let (status, body) = self.send(route, self.http.post(url).json(payload)).await?;
        decode_envelope(status, &body)
    }
}

fn network_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Network("request timed out".to_string())
    } else if err.is_decode() {
        GatewayError::Protocol(err.to_string())
    } else {
        GatewayError::Network(err.to_string())
    }
}

#[async_trait]
impl ApiGateway for HttpGateway {
    async fn who_am_i(&self) -> Result<User, GatewayError> {
        let payload: AuthPayload = self.get_data(ME_ROUTE).await?;
        Ok(payload.user)
    }

    async fn login(&self, credentials: &LoginCredentials) -> Result<User, GatewayError> {
        let payload: AuthPayload = self.post_data(LOGIN_ROUTE, credentials).await?;
        Ok(payload.user)
    }

    async fn register(&self, credentials: &RegisterCredentials) -> Result<User, GatewayError> {
        let payload: AuthPayload = self.post_data(REGISTER_ROUTE, credentials).await?;
        Ok(payload.user)
    }

    async fn logout(&self) -> Result<(), GatewayError> {
        let url = self.endpoint(LOGOUT_ROUTE)?;
        let (status, body) = self.send(LOGOUT_ROUTE, self.http.post(url)).await?;
        decode_ack(status, &body)
    }

    async fn renew_session(&self) -> Result<User, GatewayError> {
        let url = self.endpoint(REFRESH_ROUTE)?;
        let (status, body) = self.send(REFRESH_ROUTE, self.http.post(url)).await?;
        let payload: AuthPayload = decode_envelope(status, &body)?;
        Ok(payload.user)
    }

    async fn buyer_dashboard(&self) -> Result<BuyerDashboard, GatewayError> {
        self.get_data(BUYER_DASHBOARD_ROUTE).await
    }

    async fn seller_dashboard(&self) -> Result<SellerDashboard, GatewayError> {
        self.get_data(SELLER_DASHBOARD_ROUTE).await
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
