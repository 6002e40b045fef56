//! Built-in provider handlers.

mod aws_parameter_store;
mod aws_secret_manager;
mod azure_key_vault;
mod bitbucket;
mod checkly;
mod gcp_secret_manager;
mod github;
mod gitlab;
mod hashicorp_vault;
mod heroku;
mod netlify;
mod northflank;
mod qovery;
mod railway;
mod render;
mod teamcity;
mod vercel;

use crate::form::FormInput;
use crate::registry::ProviderRegistry;
use crate::types::CreateIntegrationRequest;

pub(crate) fn register_all(registry: &mut ProviderRegistry) {
    registry.register(github::Github);
    registry.register(gitlab::Gitlab);
    registry.register(heroku::Heroku);
    registry.register(vercel::Vercel);
    registry.register(netlify::Netlify);
    registry.register(bitbucket::Bitbucket);
    registry.register(azure_key_vault::AzureKeyVault);
    registry.register(gcp_secret_manager::GcpSecretManager);
    registry.register(aws_parameter_store::AwsParameterStore);
    registry.register(aws_secret_manager::AwsSecretManager);
    registry.register(qovery::Qovery);
    registry.register(railway::Railway);
    registry.register(render::Render);
    registry.register(checkly::Checkly);
    registry.register(northflank::Northflank);
    registry.register(teamcity::Teamcity);
    registry.register(hashicorp_vault::HashicorpVault);
}

/// Use the resource selected on `key` as the target app.
fn set_app(input: &FormInput<'_>, key: &str, request: &mut CreateIntegrationRequest) {
    if let Some(app) = input.selected(key) {
        request.app = Some(app.name.clone());
        request.app_id = Some(app.id.clone());
    }
}
