//! The backend integration API as seen by the workflow.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{
    CreateIntegrationRequest, ExchangeCodeRequest, Integration, IntegrationAuth,
    SaveAccessTokenRequest, Workspace,
};

/// A provider-resource listing request.
///
/// Also the identity of a load: two queries are the same load exactly when
/// they compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceQuery {
    /// Authorization the listing runs under.
    pub integration_auth_id: String,
    /// Endpoint below `/integration-auth/{id}/`, e.g. `qovery/projects`.
    pub endpoint: String,
    /// Response field holding the list, e.g. `projects`.
    pub list_field: String,
    /// Query-string parameters.
    pub params: BTreeMap<String, String>,
}

impl ResourceQuery {
    /// Request path relative to the API base, e.g.
    /// `/integration-auth/auth_1/qovery/projects`.
    #[must_use]
    pub fn path(&self) -> String {
        format!(
            "/integration-auth/{}/{}",
            urlencoding::encode(&self.integration_auth_id),
            self.endpoint
        )
    }
}

/// Backend operations used by the integration workflow.
///
/// Implementations perform exactly one request per call; retries are left to
/// the user.
#[async_trait]
pub trait IntegrationApi: Send + Sync {
    /// `GET /workspace/{id}`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    async fn get_workspace(&self, workspace_id: &str) -> Result<Workspace, ApiError>;

    /// `GET /integration-auth/{id}`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    async fn get_integration_auth(&self, id: &str) -> Result<IntegrationAuth, ApiError>;

    /// `POST /integration-auth/oauth-token`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    async fn exchange_oauth_code(
        &self,
        request: &ExchangeCodeRequest,
    ) -> Result<IntegrationAuth, ApiError>;

    /// `POST /integration-auth/access-token`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    async fn save_access_token(
        &self,
        request: &SaveAccessTokenRequest,
    ) -> Result<IntegrationAuth, ApiError>;

    /// `POST /integration-auth/{id}/duplicate` into `project_id`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    async fn duplicate_integration_auth(
        &self,
        id: &str,
        project_id: &str,
    ) -> Result<IntegrationAuth, ApiError>;

    /// `GET /integration-auth/{id}/{endpoint}`, returning the raw list under
    /// `query.list_field` in server order.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails or the list is missing.
    async fn list_resources(
        &self,
        query: &ResourceQuery,
    ) -> Result<Vec<serde_json::Value>, ApiError>;

    /// `POST /integration`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    async fn create_integration(
        &self,
        request: &CreateIntegrationRequest,
    ) -> Result<Integration, ApiError>;
}
