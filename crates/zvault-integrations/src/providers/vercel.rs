use crate::cascade::{ResourceNode, Route};
use crate::error::ConfigError;
use crate::form::{FormInput, TEAM_ID};
use crate::provider::Provider;
use crate::registry::{AuthKind, AuthorizeRequest, FieldSpec, ProviderHandler, with_query};
use crate::types::CreateIntegrationRequest;

const TARGET_ENVIRONMENT: &str = "targetEnvironment";

const FIELDS: &[FieldSpec] = &[FieldSpec::choice(
    TARGET_ENVIRONMENT,
    "Vercel environment",
    &["development", "preview", "production"],
    "development",
)];

// Branches only matter for preview deployments.
const BRANCH_ROUTES: &[Route] = &[Route {
    when: "preview",
    endpoint: "vercel/branches",
    list_field: "branches",
}];

pub(crate) struct Vercel;

impl ProviderHandler for Vercel {
    fn provider(&self) -> Provider {
        Provider::Vercel
    }

    fn auth_kind(&self) -> AuthKind {
        AuthKind::OAuth
    }

    /// Vercel authorizes by installing the integration.
    fn authorize_url(&self, request: &AuthorizeRequest<'_>) -> Result<String, ConfigError> {
        let slug = request.config.app_slug(Provider::Vercel)?;
        let base = format!(
            "https://vercel.com/integrations/{}/new",
            urlencoding::encode(slug)
        );
        Ok(with_query(&base, &[("state", request.state)]))
    }

    fn resources(&self) -> Vec<ResourceNode> {
        vec![
            ResourceNode::new("app", "apps", "apps", "apps")
                .id_field("appId")
                .optional_field("teamId", TEAM_ID),
            ResourceNode::routed("branch", "branches", TARGET_ENVIRONMENT, BRANCH_ROUTES)
                .parent("appId", "app")
                .optional_field("teamId", TEAM_ID)
                .optional(),
        ]
    }

    fn fields(&self) -> &'static [FieldSpec] {
        FIELDS
    }

    fn build(&self, input: &FormInput<'_>, request: &mut CreateIntegrationRequest) {
        super::set_app(input, "app", request);
        let target = input.field_owned(TARGET_ENVIRONMENT);
        if target.as_deref() == Some("preview") {
            request.path = input.selected("branch").map(|b| b.id.clone());
        }
        request.target_environment = target;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;
    use crate::cascade::NodeStatus;
    use crate::config::IntegrationsConfig;
    use crate::providers::test_support::{build, cascade, values};
    use crate::registry::AuthorizeParams;

    fn lists() -> Vec<(&'static str, Vec<serde_json::Value>)> {
        vec![
            ("apps", vec![json!({"appId": "prj_1", "name": "web"})]),
            ("vercel/branches", vec![json!("main"), json!("feature/x")]),
        ]
    }

    #[test]
    fn branches_load_only_for_preview() {
        let cascade = cascade(&Vercel, &[(TARGET_ENVIRONMENT, "production")], &lists());
        assert_eq!(cascade.status("branch").unwrap(), NodeStatus::Idle);
        assert!(cascade.is_ready());

        let cascade = cascade_for_preview();
        assert_eq!(cascade.selected("branch").unwrap().id, "main");
    }

    fn cascade_for_preview() -> crate::cascade::ResourceCascade {
        cascade(&Vercel, &[(TARGET_ENVIRONMENT, "preview")], &lists())
    }

    #[test]
    fn preview_branch_becomes_path() {
        let cascade = cascade_for_preview();
        let request = build(&Vercel, &values(&[(TARGET_ENVIRONMENT, "preview")]), &cascade).unwrap();
        assert_eq!(request.target_environment.as_deref(), Some("preview"));
        assert_eq!(request.path.as_deref(), Some("main"));
        assert_eq!(request.app_id.as_deref(), Some("prj_1"));
    }

    #[test]
    fn installation_url_needs_slug() {
        let params = AuthorizeParams::default();
        let missing = IntegrationsConfig::default();
        let err = Vercel
            .authorize_url(&AuthorizeRequest {
                config: &missing,
                state: "s1",
                params: &params,
            })
            .unwrap_err();
        assert!(err.to_string().contains("ZVAULT_CLIENT_SLUG_VERCEL"));

        let config = IntegrationsConfig::default().with_app_slug(Provider::Vercel, "zvault-sync");
        let url = Vercel
            .authorize_url(&AuthorizeRequest {
                config: &config,
                state: "s1",
                params: &params,
            })
            .unwrap();
        assert_eq!(url, "https://vercel.com/integrations/zvault-sync/new?state=s1");
    }
}
