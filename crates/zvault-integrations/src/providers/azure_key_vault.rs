use crate::error::ConfigError;
use crate::form::FormInput;
use crate::provider::Provider;
use crate::registry::{AuthKind, AuthorizeRequest, FieldSpec, ProviderHandler};
use crate::types::CreateIntegrationRequest;
use crate::validation::{self, ValidationErrors};

const SCOPE: &str = "https://vault.azure.net/.default openid offline_access";
const DEFAULT_TENANT: &str = "common";
const VAULT_BASE_URL: &str = "vaultBaseUrl";
const VAULT_HOST_SUFFIX: &str = ".vault.azure.net";

const FIELDS: &[FieldSpec] = &[FieldSpec::text(VAULT_BASE_URL, "Vault URI")];

pub(crate) struct AzureKeyVault;

impl ProviderHandler for AzureKeyVault {
    fn provider(&self) -> Provider {
        Provider::AzureKeyVault
    }

    fn auth_kind(&self) -> AuthKind {
        AuthKind::OAuth
    }

    fn authorize_url(&self, request: &AuthorizeRequest<'_>) -> Result<String, ConfigError> {
        let tenant = request
            .params
            .tenant_id
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TENANT);
        let base = format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/authorize",
            urlencoding::encode(tenant)
        );
        request.code_flow_url(Provider::AzureKeyVault, &base, Some(SCOPE), &[])
    }

    fn fields(&self) -> &'static [FieldSpec] {
        FIELDS
    }

    fn validate(&self, input: &FormInput<'_>, errors: &mut ValidationErrors) {
        match input.field(VAULT_BASE_URL) {
            None => errors.add(VAULT_BASE_URL, "Vault URI cannot be blank"),
            Some(url) => validation::https_url(
                errors,
                VAULT_BASE_URL,
                url,
                Some(VAULT_HOST_SUFFIX),
                "Vault URI must start with 'https://' and end with 'vault.azure.net'",
            ),
        }
    }

    fn build(&self, input: &FormInput<'_>, request: &mut CreateIntegrationRequest) {
        request.app = input.field_owned(VAULT_BASE_URL);
    }
}
