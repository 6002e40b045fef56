use crate::form::FormInput;
use crate::provider::Provider;
use crate::registry::{AuthKind, CredentialField, CredentialKey, FieldSpec, ProviderHandler};
use crate::types::CreateIntegrationRequest;
use crate::validation::{self, ValidationErrors};

// AppRole login against a KV v2 engine.
const CREDENTIALS: &[CredentialField] = &[
    CredentialField::required(CredentialKey::AccessId, "Role ID", "Role ID cannot be blank"),
    CredentialField::required(CredentialKey::AccessToken, "Secret ID", "Secret ID cannot be blank"),
    CredentialField::required(CredentialKey::Url, "Vault cluster URL", "Vault URL cannot be blank"),
    CredentialField::optional(CredentialKey::Namespace, "Namespace"),
];

const FIELDS: &[FieldSpec] = &[
    FieldSpec::text("engine", "KV secrets engine path"),
    FieldSpec::text("path", "Secret path in the engine"),
];

pub(crate) struct HashicorpVault;

impl ProviderHandler for HashicorpVault {
    fn provider(&self) -> Provider {
        Provider::HashicorpVault
    }

    fn auth_kind(&self) -> AuthKind {
        AuthKind::AccessToken
    }

    fn credential_fields(&self) -> &'static [CredentialField] {
        CREDENTIALS
    }

    fn fields(&self) -> &'static [FieldSpec] {
        FIELDS
    }

    fn validate(&self, input: &FormInput<'_>, errors: &mut ValidationErrors) {
        validation::require(errors, "engine", input.field("engine"), "Engine path cannot be blank");
        validation::require(errors, "path", input.field("path"), "Path cannot be blank");
    }

    fn build(&self, input: &FormInput<'_>, request: &mut CreateIntegrationRequest) {
        request.app = input
            .field("engine")
            .map(|engine| engine.trim_matches('/').to_owned());
        request.path = input.field_owned("path");
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::providers::test_support::{build, cascade, values};

    #[test]
    fn engine_and_path_are_required() {
        let cascade = cascade(&HashicorpVault, &[], &[]);
        let errors = build(&HashicorpVault, &values(&[("engine", " ")]), &cascade).unwrap_err();
        assert_eq!(errors.get("engine").unwrap(), ["Engine path cannot be blank"]);
        assert_eq!(errors.get("path").unwrap(), ["Path cannot be blank"]);

        let request = build(
            &HashicorpVault,
            &values(&[("engine", "/kv/"), ("path", "apps/web")]),
            &cascade,
        )
        .unwrap();
        assert_eq!(request.app.as_deref(), Some("kv"));
        assert_eq!(request.path.as_deref(), Some("apps/web"));
    }
}
