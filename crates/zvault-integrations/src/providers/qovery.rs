use serde_json::Value;

use crate::cascade::{ResourceNode, Route};
use crate::form::FormInput;
use crate::provider::Provider;
use crate::registry::{AuthKind, CredentialField, CredentialKey, FieldSpec, ProviderHandler};
use crate::types::CreateIntegrationRequest;

const SCOPE: &str = "scope";

const CREDENTIALS: &[CredentialField] = &[CredentialField::required(
    CredentialKey::AccessToken,
    "Qovery API token",
    "Access token cannot be blank",
)];

const FIELDS: &[FieldSpec] = &[FieldSpec::choice(
    SCOPE,
    "Qovery scope",
    &["application", "container", "job"],
    "application",
)];

const APP_ROUTES: &[Route] = &[
    Route {
        when: "application",
        endpoint: "qovery/apps",
        list_field: "apps",
    },
    Route {
        when: "container",
        endpoint: "qovery/containers",
        list_field: "containers",
    },
    Route {
        when: "job",
        endpoint: "qovery/jobs",
        list_field: "jobs",
    },
];

pub(crate) struct Qovery;

impl ProviderHandler for Qovery {
    fn provider(&self) -> Provider {
        Provider::Qovery
    }

    fn auth_kind(&self) -> AuthKind {
        AuthKind::AccessToken
    }

    fn credential_fields(&self) -> &'static [CredentialField] {
        CREDENTIALS
    }

    fn resources(&self) -> Vec<ResourceNode> {
        vec![
            ResourceNode::new("org", "organizations", "qovery/orgs", "orgs").id_field("orgId"),
            ResourceNode::new("project", "projects", "qovery/projects", "projects")
                .id_field("projectId")
                .parent("orgId", "org"),
            ResourceNode::new("environment", "environments", "qovery/environments", "environments")
                .id_field("environmentId")
                .parent("projectId", "project"),
            ResourceNode::routed("app", "apps", SCOPE, APP_ROUTES)
                .id_field("appId")
                .parent("environmentId", "environment"),
        ]
    }

    fn fields(&self) -> &'static [FieldSpec] {
        FIELDS
    }

    fn build(&self, input: &FormInput<'_>, request: &mut CreateIntegrationRequest) {
        super::set_app(input, "app", request);
        if let Some(environment) = input.selected("environment") {
            request.target_environment = Some(environment.name.clone());
            request.target_environment_id = Some(environment.id.clone());
        }

        let extra = &mut request.metadata.extra;
        if let Some(scope) = input.field(SCOPE) {
            extra.insert(SCOPE.to_owned(), Value::from(scope));
        }
        for key in ["org", "project"] {
            if let Some(resource) = input.selected(key) {
                extra.insert(format!("{key}Id"), Value::from(resource.id.as_str()));
                extra.insert(format!("{key}Name"), Value::from(resource.name.as_str()));
            }
        }
    }
}
