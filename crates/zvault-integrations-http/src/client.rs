//! `reqwest` implementation of [`IntegrationApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use zvault_integrations::types::{
    CreateIntegrationRequest, ExchangeCodeRequest, SaveAccessTokenRequest,
};
use zvault_integrations::{
    ApiError, Integration, IntegrationApi, IntegrationAuth, IntegrationsConfig, ResourceQuery,
    Workspace,
};

use crate::error::ClientError;
use crate::wire::{ErrorBody, IntegrationAuthEnvelope, IntegrationEnvelope, WorkspaceEnvelope};

const USER_AGENT: &str = concat!("zvault-integrations/", env!("CARGO_PKG_VERSION"));

/// Bearer-authenticated client for `{api_url}/api/v1`.
///
/// Every call is a single request. Failures are never retried.
#[derive(Clone)]
pub struct HttpIntegrationApi {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpIntegrationApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpIntegrationApi")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpIntegrationApi {
    /// Build a client from the integration configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingToken`] without `api_token`, or another
    /// [`ClientError`] for a bad URL.
    pub fn from_config(config: &IntegrationsConfig) -> Result<Self, ClientError> {
        let token = config.api_token.as_deref().ok_or(ClientError::MissingToken)?;
        Self::new(&config.api_url, token, config.timeout)
    }

    /// Build a client for `api_url` (without the `/api/v1` suffix).
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] for an empty token or a bad URL.
    pub fn new(api_url: &str, token: &str, timeout: Duration) -> Result<Self, ClientError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ClientError::MissingToken);
        }
        let parsed = url::Url::parse(api_url).map_err(|e| ClientError::InvalidBaseUrl {
            url: api_url.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl {
                url: api_url.to_owned(),
                reason: "expected an http(s) URL".to_owned(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            base_url: format!("{}/api/v1", api_url.trim_end_matches('/')),
            token: token.to_owned(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url().path(), "integration API response");

        if status.is_success() {
            let text = response.text().await.map_err(transport_error)?;
            return serde_json::from_str(&text).map_err(|e| ApiError::Decode {
                reason: e.to_string(),
            });
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized { message },
            StatusCode::NOT_FOUND => ApiError::NotFound { message },
            _ => ApiError::Status {
                status: status.as_u16(),
                message,
            },
        })
    }
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else if e.is_decode() {
        ApiError::Decode {
            reason: e.to_string(),
        }
    } else {
        ApiError::Network {
            reason: e.to_string(),
        }
    }
}

fn encode(segment: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(segment)
}

#[async_trait]
impl IntegrationApi for HttpIntegrationApi {
    async fn get_workspace(&self, workspace_id: &str) -> Result<Workspace, ApiError> {
        let envelope: WorkspaceEnvelope = self
            .send(self.get(&format!("/workspace/{}", encode(workspace_id))))
            .await?;
        Ok(envelope.workspace)
    }

    async fn get_integration_auth(&self, id: &str) -> Result<IntegrationAuth, ApiError> {
        let envelope: IntegrationAuthEnvelope = self
            .send(self.get(&format!("/integration-auth/{}", encode(id))))
            .await?;
        Ok(envelope.integration_auth)
    }

    async fn exchange_oauth_code(
        &self,
        request: &ExchangeCodeRequest,
    ) -> Result<IntegrationAuth, ApiError> {
        let envelope: IntegrationAuthEnvelope = self
            .send(self.post("/integration-auth/oauth-token").json(request))
            .await?;
        Ok(envelope.integration_auth)
    }

    async fn save_access_token(
        &self,
        request: &SaveAccessTokenRequest,
    ) -> Result<IntegrationAuth, ApiError> {
        let envelope: IntegrationAuthEnvelope = self
            .send(self.post("/integration-auth/access-token").json(request))
            .await?;
        Ok(envelope.integration_auth)
    }

    async fn duplicate_integration_auth(
        &self,
        id: &str,
        project_id: &str,
    ) -> Result<IntegrationAuth, ApiError> {
        let body = serde_json::json!({ "projectId": project_id });
        let envelope: IntegrationAuthEnvelope = self
            .send(
                self.post(&format!("/integration-auth/{}/duplicate", encode(id)))
                    .json(&body),
            )
            .await?;
        Ok(envelope.integration_auth)
    }

    async fn list_resources(
        &self,
        query: &ResourceQuery,
    ) -> Result<Vec<serde_json::Value>, ApiError> {
        let mut body: serde_json::Map<String, serde_json::Value> = self
            .send(self.get(&query.path()).query(&query.params))
            .await?;
        match body.remove(&query.list_field) {
            Some(serde_json::Value::Array(items)) => Ok(items),
            Some(serde_json::Value::Null) | None => Err(ApiError::Decode {
                reason: format!("response has no '{}' list", query.list_field),
            }),
            Some(_) => Err(ApiError::Decode {
                reason: format!("'{}' is not a list", query.list_field),
            }),
        }
    }

    async fn create_integration(
        &self,
        request: &CreateIntegrationRequest,
    ) -> Result<Integration, ApiError> {
        let envelope: IntegrationEnvelope = self.send(self.post("/integration").json(request)).await?;
        Ok(envelope.integration)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use std::collections::BTreeMap;

    use mockito::Matcher;
    use serde_json::json;
    use zvault_integrations::Provider;

    use super::*;

    fn client(server: &mockito::ServerGuard) -> HttpIntegrationApi {
        HttpIntegrationApi::new(&server.url(), "tok_123", Duration::from_secs(5)).unwrap()
    }

    fn auth_body(id: &str, provider: &str) -> String {
        json!({
            "integrationAuth": {
                "_id": id,
                "integration": provider,
                "workspace": "proj_1",
            }
        })
        .to_string()
    }

    // ── Construction ────────────────────────────────────────────────

    #[test]
    fn rejects_blank_token_and_bad_url() {
        assert!(matches!(
            HttpIntegrationApi::new("https://api.zvault.cloud", "  ", Duration::from_secs(1)),
            Err(ClientError::MissingToken)
        ));
        assert!(matches!(
            HttpIntegrationApi::new("api.zvault.cloud", "t", Duration::from_secs(1)),
            Err(ClientError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn from_config_requires_token() {
        let config = IntegrationsConfig::default();
        assert!(matches!(
            HttpIntegrationApi::from_config(&config),
            Err(ClientError::MissingToken)
        ));
    }

    // ── Requests ────────────────────────────────────────────────────

    #[tokio::test]
    async fn exchange_posts_body_with_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/integration-auth/oauth-token")
            .match_header("authorization", "Bearer tok_123")
            .match_body(Matcher::Json(json!({
                "workspaceId": "proj_1",
                "code": "code_1",
                "integration": "github",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(auth_body("auth_9", "github"))
            .create_async()
            .await;

        let auth = client(&server)
            .exchange_oauth_code(&ExchangeCodeRequest {
                workspace_id: "proj_1".into(),
                code: "code_1".into(),
                integration: Provider::Github,
                installation_id: None,
                url: None,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(auth.id, "auth_9");
        assert_eq!(auth.integration, Provider::Github);
        assert_eq!(auth.project_id, "proj_1");
    }

    #[tokio::test]
    async fn list_resources_reads_list_field_and_sends_params() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/integration-auth/auth_1/qovery/projects")
            .match_query(Matcher::UrlEncoded("orgId".into(), "org_1".into()))
            .with_status(200)
            .with_body(json!({"projects": [{"projectId": "p1", "name": "shop"}]}).to_string())
            .create_async()
            .await;

        let items = client(&server)
            .list_resources(&ResourceQuery {
                integration_auth_id: "auth_1".into(),
                endpoint: "qovery/projects".into(),
                list_field: "projects".into(),
                params: BTreeMap::from([("orgId".to_owned(), "org_1".to_owned())]),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(items, [json!({"projectId": "p1", "name": "shop"})]);
    }

    #[tokio::test]
    async fn missing_list_field_is_a_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/integration-auth/auth_1/apps")
            .with_status(200)
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let err = client(&server)
            .list_resources(&ResourceQuery {
                integration_auth_id: "auth_1".into(),
                endpoint: "apps".into(),
                list_field: "apps".into(),
                params: BTreeMap::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn create_integration_returns_created_record() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/integration")
            .match_body(Matcher::PartialJson(json!({
                "integrationAuthId": "auth_1",
                "isActive": true,
                "sourceEnvironment": "dev",
                "secretPath": "/",
            })))
            .with_status(200)
            .with_body(json!({"integration": {"id": "int_1", "isActive": true, "app": "web"}}).to_string())
            .create_async()
            .await;

        let integration = client(&server)
            .create_integration(&CreateIntegrationRequest::new("auth_1", "dev", "/"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(integration.id, "int_1");
        assert_eq!(integration.app.as_deref(), Some("web"));
    }

    #[tokio::test]
    async fn duplicate_targets_project() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/integration-auth/gh_1/duplicate")
            .match_body(Matcher::Json(json!({"projectId": "proj_2"})))
            .with_status(200)
            .with_body(auth_body("gh_2", "github"))
            .create_async()
            .await;

        let copy = client(&server)
            .duplicate_integration_auth("gh_1", "proj_2")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(copy.id, "gh_2");
    }

    #[tokio::test]
    async fn workspace_is_unwrapped() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/workspace/proj_1")
            .with_status(200)
            .with_body(
                json!({"workspace": {"_id": "proj_1", "name": "Shop", "environments": [
                    {"name": "Development", "slug": "dev"}
                ]}})
                .to_string(),
            )
            .create_async()
            .await;

        let workspace = client(&server).get_workspace("proj_1").await.unwrap();
        assert_eq!(workspace.environments[0].slug, "dev");
    }

    // ── Error mapping ───────────────────────────────────────────────

    #[tokio::test]
    async fn status_codes_map_to_api_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/integration-auth/denied")
            .with_status(403)
            .with_body(r#"{"message": "forbidden project"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/integration-auth/gone")
            .with_status(404)
            .with_body(r#"{"error": {"message": "no such auth"}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/integration-auth/broken")
            .with_status(500)
            .with_body("oops")
            .expect(1)
            .create_async()
            .await;
        let api = client(&server);

        assert_eq!(
            api.get_integration_auth("denied").await.unwrap_err(),
            ApiError::Unauthorized {
                message: "forbidden project".into()
            }
        );
        assert_eq!(
            api.get_integration_auth("gone").await.unwrap_err(),
            ApiError::NotFound {
                message: "no such auth".into()
            }
        );
        assert_eq!(
            api.get_integration_auth("broken").await.unwrap_err(),
            ApiError::Status {
                status: 500,
                message: "HTTP 500".into()
            }
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let api = HttpIntegrationApi::new("http://127.0.0.1:1", "tok", Duration::from_secs(2)).unwrap();
        let err = api.get_integration_auth("a").await.unwrap_err();
        assert!(matches!(err, ApiError::Network { .. } | ApiError::Timeout));
    }

    #[test]
    fn error_body_shapes() {
        let nested: ErrorBody = serde_json::from_str(r#"{"error": {"message": "m"}}"#).unwrap();
        assert_eq!(nested.into_message().as_deref(), Some("m"));
        let flat: ErrorBody = serde_json::from_str(r#"{"error": "e"}"#).unwrap();
        assert_eq!(flat.into_message().as_deref(), Some("e"));
        let empty: ErrorBody = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.into_message(), None);
    }
}
