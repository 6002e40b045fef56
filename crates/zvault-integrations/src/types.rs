//! Data exchanged with the backend integration API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::Provider;

/// An authorization granted by a provider to one project.
///
/// Credential material stays on the server. Only non-secret metadata is
/// deserialized here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationAuth {
    /// Authorization id.
    #[serde(alias = "_id")]
    pub id: String,
    /// Provider the authorization belongs to.
    pub integration: Provider,
    /// Owning project.
    #[serde(alias = "workspace")]
    pub project_id: String,
    /// Provider team or account the grant is scoped to.
    #[serde(default)]
    pub team_id: Option<String>,
    /// Base URL of a self-hosted provider instance.
    #[serde(default)]
    pub url: Option<String>,
    /// Provider namespace (e.g. a Vault enterprise namespace).
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A project environment secrets are synced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceEnvironment {
    pub name: String,
    pub slug: String,
}

/// A project, with its environments in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub environments: Vec<WorkspaceEnvironment>,
}

/// How existing secrets are reconciled on the first sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InitialSyncBehavior {
    /// Replace everything in the target with the project's secrets.
    OverwriteTarget,
    /// Import target secrets, keeping target values on conflict.
    PreferTarget,
    /// Import target secrets, keeping project values on conflict.
    PreferSource,
}

impl InitialSyncBehavior {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OverwriteTarget => "overwrite-target",
            Self::PreferTarget => "prefer-target",
            Self::PreferSource => "prefer-source",
        }
    }

    /// Parse the kebab-case form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "overwrite-target" => Some(Self::OverwriteTarget),
            "prefer-target" => Some(Self::PreferTarget),
            "prefer-source" => Some(Self::PreferSource),
            _ => None,
        }
    }
}

/// How project secrets map onto target secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MappingBehavior {
    /// All secrets are stored as one JSON document in a single target secret.
    ManyToOne,
    /// Each secret becomes its own target secret.
    OneToOne,
}

impl MappingBehavior {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "many-to-one" => Some(Self::ManyToOne),
            "one-to-one" => Some(Self::OneToOne),
            _ => None,
        }
    }
}

/// A key/value tag attached to AWS secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretTag {
    pub key: String,
    pub value: String,
}

/// A label attached to GCP secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretLabel {
    pub label_name: String,
    pub label_value: String,
}

/// Optional provider-specific integration settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_sync_behavior: Option<InitialSyncBehavior>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping_behavior: Option<MappingBehavior>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_suffix: Option<String>,
    #[serde(rename = "secretAWSTag", skip_serializing_if = "Vec::is_empty", default)]
    pub secret_aws_tag: Vec<SecretTag>,
    #[serde(rename = "secretGCPLabel", skip_serializing_if = "Option::is_none")]
    pub secret_gcp_label: Option<SecretLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_mask_secrets: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_protect_secrets: Option<bool>,
    /// Provider-specific keys with no dedicated field.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl IntegrationMetadata {
    /// Whether no setting is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Body of `POST /integration`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntegrationRequest {
    pub integration_auth_id: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    pub source_environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_environment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_service_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub secret_path: String,
    #[serde(skip_serializing_if = "IntegrationMetadata::is_empty")]
    pub metadata: IntegrationMetadata,
}

impl CreateIntegrationRequest {
    /// A request carrying only the fields every provider shares.
    #[must_use]
    pub fn new(
        integration_auth_id: impl Into<String>,
        source_environment: impl Into<String>,
        secret_path: impl Into<String>,
    ) -> Self {
        Self {
            integration_auth_id: integration_auth_id.into(),
            is_active: true,
            app: None,
            app_id: None,
            source_environment: source_environment.into(),
            target_environment: None,
            target_environment_id: None,
            target_service: None,
            target_service_id: None,
            owner: None,
            path: None,
            region: None,
            scope: None,
            secret_path: secret_path.into(),
            metadata: IntegrationMetadata::default(),
        }
    }
}

/// A created integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub integration: Option<Provider>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub secret_path: Option<String>,
}

/// Body of `POST /integration-auth/oauth-token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeCodeRequest {
    pub workspace_id: String,
    pub code: String,
    pub integration: Provider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Body of `POST /integration-auth/access-token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAccessTokenRequest {
    pub workspace_id: String,
    pub integration: Provider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// A selectable resource owned by a provider (app, org, environment, ...).
///
/// Identifier and display name are normalized from endpoint-specific field
/// names; the original object is kept in `raw`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderResource {
    pub id: String,
    pub name: String,
    pub raw: serde_json::Value,
}

impl ProviderResource {
    /// A string attribute of the original object.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.raw.get(name).and_then(serde_json::Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;

    #[test]
    fn integration_auth_accepts_legacy_field_names() {
        let auth: IntegrationAuth = serde_json::from_value(json!({
            "_id": "auth_1",
            "integration": "github",
            "workspace": "proj_1",
            "accessToken": "never-read"
        }))
        .unwrap();
        assert_eq!(auth.id, "auth_1");
        assert_eq!(auth.project_id, "proj_1");
        assert_eq!(auth.integration, Provider::Github);
    }

    #[test]
    fn create_request_omits_empty_optionals() {
        let req = CreateIntegrationRequest::new("auth_1", "dev", "/");
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(
            body,
            json!({
                "integrationAuthId": "auth_1",
                "isActive": true,
                "sourceEnvironment": "dev",
                "secretPath": "/"
            })
        );
    }

    #[test]
    fn metadata_uses_backend_field_names() {
        let mut meta = IntegrationMetadata {
            initial_sync_behavior: Some(InitialSyncBehavior::PreferSource),
            mapping_behavior: Some(MappingBehavior::ManyToOne),
            secret_aws_tag: vec![SecretTag {
                key: "team".into(),
                value: "core".into(),
            }],
            secret_gcp_label: Some(SecretLabel {
                label_name: "managed-by".into(),
                label_value: "zvault".into(),
            }),
            ..IntegrationMetadata::default()
        };
        meta.extra.insert("scope".into(), json!("application"));

        let body = serde_json::to_value(&meta).unwrap();
        assert_eq!(body["initialSyncBehavior"], "prefer-source");
        assert_eq!(body["mappingBehavior"], "many-to-one");
        assert_eq!(body["secretAWSTag"][0]["key"], "team");
        assert_eq!(body["secretGCPLabel"]["labelName"], "managed-by");
        assert_eq!(body["scope"], "application");
    }

    #[test]
    fn exchange_request_shape() {
        let req = ExchangeCodeRequest {
            workspace_id: "proj_1".into(),
            code: "c0de".into(),
            integration: Provider::Github,
            installation_id: None,
            url: None,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"workspaceId": "proj_1", "code": "c0de", "integration": "github"})
        );
    }

    #[test]
    fn sync_behavior_parse() {
        assert_eq!(
            InitialSyncBehavior::parse("overwrite-target"),
            Some(InitialSyncBehavior::OverwriteTarget)
        );
        assert_eq!(InitialSyncBehavior::parse("merge"), None);
        assert_eq!(MappingBehavior::parse("one-to-one"), Some(MappingBehavior::OneToOne));
    }
}
