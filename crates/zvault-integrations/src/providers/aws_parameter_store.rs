use crate::form::FormInput;
use crate::provider::Provider;
use crate::registry::{AuthKind, CredentialField, CredentialKey, FieldSpec, ProviderHandler};
use crate::types::CreateIntegrationRequest;
use crate::validation::ValidationErrors;

/// IAM access key pair shared by the AWS providers.
pub(super) const AWS_CREDENTIALS: &[CredentialField] = &[
    CredentialField::required(
        CredentialKey::AccessId,
        "Access Key ID",
        "Access key cannot be blank",
    ),
    CredentialField::required(
        CredentialKey::AccessToken,
        "Secret Access Key",
        "Secret key cannot be blank",
    ),
];

pub(super) const REGION: FieldSpec = FieldSpec::text("region", "AWS region").with_default("us-east-1");

const FIELDS: &[FieldSpec] = &[REGION, FieldSpec::text("path", "Parameter path")];

pub(crate) struct AwsParameterStore;

impl ProviderHandler for AwsParameterStore {
    fn provider(&self) -> Provider {
        Provider::AwsParameterStore
    }

    fn auth_kind(&self) -> AuthKind {
        AuthKind::AccessToken
    }

    fn credential_fields(&self) -> &'static [CredentialField] {
        AWS_CREDENTIALS
    }

    fn fields(&self) -> &'static [FieldSpec] {
        FIELDS
    }

    fn validate(&self, input: &FormInput<'_>, errors: &mut ValidationErrors) {
        if input.field("region").is_none() {
            errors.add("region", "Region cannot be blank");
        }
        match input.field("path") {
            None => errors.add("path", "Path cannot be blank"),
            Some(path) if !(path.starts_with('/') && path.ends_with('/')) => {
                errors.add("path", "Path must start and end with '/'");
            }
            Some(_) => {}
        }
    }

    fn build(&self, input: &FormInput<'_>, request: &mut CreateIntegrationRequest) {
        request.region = input.field_owned("region");
        request.path = input.field_owned("path");
    }
}
