// File: orchestrator/src/http/domain_client.rs
use async_trait::async_trait;
use domain_agent::schema::Collection;
use domain_agent::types::{
    counts_to_wire, to_wire, CollectionData, ContractResponse, OperatorIdentity, WireCollections,
    WireCounts, INTERNAL_SECRET_HEADER, OPERATOR_EMAIL_HEADER, OPERATOR_ID_HEADER, TENANT_HEADER,
};
use domain_agent::TenantStore;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ServiceConfig;
use crate::errors::{ConfigError, ServiceCallError};

/// Longest error body kept from a failing service.
const MAX_ERROR_BODY: usize = 512;

/// One owner of tenant collections.
#[async_trait]
pub trait DomainServiceClient: Send + Sync {
    fn name(&self) -> &str;

    /// Collections this service owns, in restore order.
    fn collections(&self) -> &[Collection];

    async fn export(&self, tenant_id: &str) -> Result<WireCollections, ServiceCallError>;

    async fn restore(
        &self,
        tenant_id: &str,
        data: &CollectionData,
        operator: Option<&OperatorIdentity>,
    ) -> Result<WireCounts, ServiceCallError>;
}

/// Shared client with bounded request and connect timeouts.
pub fn build_http_client(request_timeout: Duration, connect_timeout: Duration) -> Result<Client, ConfigError> {
    Client::builder()
        .timeout(request_timeout)
        .connect_timeout(connect_timeout)
        .build()
        .map_err(|e| ConfigError::InvalidValue {
            field: "http_client".to_string(),
            reason: e.to_string(),
        })
}

pub struct HttpDomainClient {
    name: String,
    base_url: String,
    collections: Vec<Collection>,
    internal_secret: String,
    client: Client,
}

impl HttpDomainClient {
    pub fn new(service: &ServiceConfig, internal_secret: &str, client: Client) -> Self {
        Self {
            name: service.name.clone(),
            base_url: service.base_url.trim_end_matches('/').to_string(),
            collections: service.collections.clone(),
            internal_secret: internal_secret.to_string(),
            client,
        }
    }

    fn with_trust_headers(&self, request: RequestBuilder, tenant_id: &str) -> RequestBuilder {
        request
            .header(INTERNAL_SECRET_HEADER, &self.internal_secret)
            .header(TENANT_HEADER, tenant_id)
    }

    async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<T, ServiceCallError> {
        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(ServiceCallError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ContractResponse<T> = response.json().await?;
        if !envelope.success {
            return Err(ServiceCallError::Rejected(
                envelope.error.unwrap_or_else(|| "no error message".to_string()),
            ));
        }
        envelope
            .data
            .ok_or_else(|| ServiceCallError::InvalidResponse("response has no data".to_string()))
    }
}

#[async_trait]
impl DomainServiceClient for HttpDomainClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn collections(&self) -> &[Collection] {
        &self.collections
    }

    async fn export(&self, tenant_id: &str) -> Result<WireCollections, ServiceCallError> {
        let url = format!("{}/internal/export", self.base_url);
        debug!("Requesting export from {} at {}", self.name, url);

        let response = self
            .with_trust_headers(self.client.get(&url), tenant_id)
            .send()
            .await?;

        Self::read_envelope(response).await
    }

    async fn restore(
        &self,
        tenant_id: &str,
        data: &CollectionData,
        operator: Option<&OperatorIdentity>,
    ) -> Result<WireCounts, ServiceCallError> {
        let url = format!("{}/internal/restore", self.base_url);
        info!(
            "Dispatching restore of {} collections to {}",
            data.len(),
            self.name
        );

        let mut request = self
            .with_trust_headers(self.client.post(&url), tenant_id)
            .json(&to_wire(data));
        if let Some(operator) = operator {
            if let Some(user_id) = &operator.user_id {
                request = request.header(OPERATOR_ID_HEADER, user_id);
            }
            if let Some(email) = &operator.email {
                request = request.header(OPERATOR_EMAIL_HEADER, email);
            }
        }

        let response = request.send().await?;
        Self::read_envelope(response).await
    }
}

/// The single store, exposed through the same contract as a remote service.
pub struct LocalStoreClient {
    store: Arc<TenantStore>,
}

impl LocalStoreClient {
    pub const NAME: &'static str = "local-store";

    pub fn new(store: Arc<TenantStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DomainServiceClient for LocalStoreClient {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn collections(&self) -> &[Collection] {
        self.store.collections()
    }

    async fn export(&self, tenant_id: &str) -> Result<WireCollections, ServiceCallError> {
        self.store
            .export(tenant_id)
            .await
            .map(|data| to_wire(&data))
            .map_err(|e| ServiceCallError::Rejected(e.to_string()))
    }

    async fn restore(
        &self,
        tenant_id: &str,
        data: &CollectionData,
        operator: Option<&OperatorIdentity>,
    ) -> Result<WireCounts, ServiceCallError> {
        self.store
            .restore(tenant_id, data, operator)
            .await
            .map(|counts| counts_to_wire(&counts))
            .map_err(|e| ServiceCallError::Rejected(e.to_string()))
    }
}
