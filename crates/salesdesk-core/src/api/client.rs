//! API client for the sales/inventory REST API.
//!
//! `ApiClient` owns the request pipeline and exposes login/logout plus one
//! method per domain call. Every domain call goes through the pipeline, so
//! bearer attachment and silent refresh are handled here once.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::pipeline::{ApiRequest, AuthPipeline};
use super::ApiError;
use crate::auth::{AuthError, Claims, Session};
use crate::config::{Config, RefreshMode};
use crate::models::{
    Customer, CustomerInput, Page, Product, ProductInput, ReportRange, Sale, SaleDraft,
};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout when none is configured.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const PRODUCTS_PATH: &str = "productos/";
const CUSTOMERS_PATH: &str = "clientes/";
const SALES_PATH: &str = "ventas/";
const SALES_REPORT_PATH: &str = "reportes/ventas/";

/// Default sort for the sales list: newest first
pub const DEFAULT_SALES_ORDERING: &str = "-fecha";

/// Search and ordering parameters for list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl ListQuery {
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn ordering(mut self, ordering: impl Into<String>) -> Self {
        self.ordering = Some(ordering.into());
        self
    }

    fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        if let Some(ref search) = self.search {
            request = request.query("search", search.as_str());
        }
        if let Some(ref ordering) = self.ordering {
            request = request.query("ordering", ordering.as_str());
        }
        request
    }
}

/// API client for the sales service.
/// Clone is cheap - the pipeline and session are shared.
#[derive(Clone)]
pub struct ApiClient {
    pipeline: Arc<AuthPipeline>,
}

impl ApiClient {
    /// Create a client against `base_url` with default options
    pub fn new(base_url: &str, session: Arc<Session>) -> Result<Self> {
        Self::with_options(
            base_url,
            session,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            RefreshMode::default(),
        )
    }

    pub fn from_config(config: &Config, session: Arc<Session>) -> Result<Self> {
        Self::with_options(
            &config.base_url(),
            session,
            config.request_timeout(),
            config.refresh_mode,
        )
    }

    pub fn with_options(
        base_url: &str,
        session: Arc<Session>,
        timeout: Duration,
        refresh_mode: RefreshMode,
    ) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        let pipeline = AuthPipeline::new(http, base_url, session).with_refresh_mode(refresh_mode);
        debug!(base_url, ?refresh_mode, "API client ready");
        Ok(Self {
            pipeline: Arc::new(pipeline),
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        self.pipeline.session()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    pub fn identity(&self) -> Option<Claims> {
        self.session().identity()
    }

    // ===== Session boundary =====

    /// Obtain and store a fresh access/refresh pair.
    ///
    /// On failure the current session is left as it was.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let pair = self.pipeline.tokens().issue(username, password).await?;
        self.session().set_session(&pair.access, &pair.refresh);
        info!(username, "Login successful");
        Ok(())
    }

    /// Forget the session. No network call; safe when already logged out.
    pub fn logout(&self) {
        self.session().clear();
    }

    /// Send any request through the pipeline. Escape hatch for endpoints
    /// without a dedicated method.
    pub async fn send(&self, request: ApiRequest) -> Result<reqwest::Response, ApiError> {
        self.pipeline.execute_checked(request).await
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let response = self.pipeline.execute_checked(request).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", path, e)))
    }

    async fn fetch_list<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<Vec<T>, ApiError> {
        let page: Page<T> = self.fetch(request).await?;
        Ok(page.into_items())
    }

    async fn send_no_content(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.pipeline.execute_checked(request).await?;
        Ok(())
    }

    // ===== Products =====

    pub async fn list_products(&self, query: &ListQuery) -> Result<Vec<Product>, ApiError> {
        self.fetch_list(query.apply(ApiRequest::get(PRODUCTS_PATH))).await
    }

    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, ApiError> {
        self.fetch(ApiRequest::post(PRODUCTS_PATH).json(input)?).await
    }

    pub async fn update_product(&self, id: i64, input: &ProductInput) -> Result<Product, ApiError> {
        self.fetch(ApiRequest::put(format!("{}{}/", PRODUCTS_PATH, id)).json(input)?).await
    }

    pub async fn delete_product(&self, id: i64) -> Result<(), ApiError> {
        self.send_no_content(ApiRequest::delete(format!("{}{}/", PRODUCTS_PATH, id))).await
    }

    // ===== Customers =====

    pub async fn list_customers(&self, query: &ListQuery) -> Result<Vec<Customer>, ApiError> {
        self.fetch_list(query.apply(ApiRequest::get(CUSTOMERS_PATH))).await
    }

    pub async fn create_customer(&self, input: &CustomerInput) -> Result<Customer, ApiError> {
        self.fetch(ApiRequest::post(CUSTOMERS_PATH).json(input)?).await
    }

    pub async fn update_customer(
        &self,
        id: i64,
        input: &CustomerInput,
    ) -> Result<Customer, ApiError> {
        self.fetch(ApiRequest::put(format!("{}{}/", CUSTOMERS_PATH, id)).json(input)?).await
    }

    pub async fn delete_customer(&self, id: i64) -> Result<(), ApiError> {
        self.send_no_content(ApiRequest::delete(format!("{}{}/", CUSTOMERS_PATH, id))).await
    }

    // ===== Sales =====

    pub async fn list_sales(&self, ordering: Option<&str>) -> Result<Vec<Sale>, ApiError> {
        let request = ApiRequest::get(SALES_PATH)
            .query("ordering", ordering.unwrap_or(DEFAULT_SALES_ORDERING));
        self.fetch_list(request).await
    }

    /// Post a new sale. Incomplete draft lines are dropped first.
    pub async fn create_sale(&self, draft: SaleDraft) -> Result<Sale, ApiError> {
        let body = draft.into_request()?;
        self.fetch(ApiRequest::post(SALES_PATH).json(&body)?).await
    }

    // ===== Reports =====

    fn report_request(range: &ReportRange, format: &str) -> ApiRequest {
        ApiRequest::get(SALES_REPORT_PATH)
            .query("from", range.from_param())
            .query("to", range.to_param())
            .query("format", format)
    }

    pub async fn sales_report(&self, range: &ReportRange) -> Result<Vec<Sale>, ApiError> {
        self.fetch_list(Self::report_request(range, "json")).await
    }

    /// The report rendered by the server as PDF, returned as raw bytes.
    pub async fn sales_report_pdf(&self, range: &ReportRange) -> Result<Vec<u8>, ApiError> {
        let response = self
            .pipeline
            .execute_checked(Self::report_request(range, "pdf"))
            .await?;
        let bytes = response.bytes().await?;
        debug!(bytes = bytes.len(), "Report PDF downloaded");
        Ok(bytes.to_vec())
    }
}
