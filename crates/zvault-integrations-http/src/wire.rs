//! Response envelopes of the integration API.

use serde::Deserialize;
use zvault_integrations::{Integration, IntegrationAuth, Workspace};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IntegrationAuthEnvelope {
    pub integration_auth: IntegrationAuth,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkspaceEnvelope {
    pub workspace: Workspace,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IntegrationEnvelope {
    pub integration: Integration,
}

/// Error body, either `{"message": ..}` or `{"error": {"message": ..}}`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or_else(|| match self.error? {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Object(map) => map
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned),
            _ => None,
        })
    }
}
