//! The closed set of integration providers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A third-party system secrets can be synced into.
///
/// The serialized form is the kebab-case slug used in URLs, session keys, and
/// the backend's `integration` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    Github,
    Gitlab,
    Heroku,
    Vercel,
    Netlify,
    Bitbucket,
    AzureKeyVault,
    GcpSecretManager,
    AwsParameterStore,
    AwsSecretManager,
    Qovery,
    Railway,
    Render,
    Checkly,
    Northflank,
    Teamcity,
    HashicorpVault,
}

impl Provider {
    /// Every provider, in catalogue order.
    pub const ALL: [Self; 17] = [
        Self::Github,
        Self::Gitlab,
        Self::Heroku,
        Self::Vercel,
        Self::Netlify,
        Self::Bitbucket,
        Self::AzureKeyVault,
        Self::GcpSecretManager,
        Self::AwsParameterStore,
        Self::AwsSecretManager,
        Self::Qovery,
        Self::Railway,
        Self::Render,
        Self::Checkly,
        Self::Northflank,
        Self::Teamcity,
        Self::HashicorpVault,
    ];

    /// URL and storage slug, e.g. `azure-key-vault`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
            Self::Heroku => "heroku",
            Self::Vercel => "vercel",
            Self::Netlify => "netlify",
            Self::Bitbucket => "bitbucket",
            Self::AzureKeyVault => "azure-key-vault",
            Self::GcpSecretManager => "gcp-secret-manager",
            Self::AwsParameterStore => "aws-parameter-store",
            Self::AwsSecretManager => "aws-secret-manager",
            Self::Qovery => "qovery",
            Self::Railway => "railway",
            Self::Render => "render",
            Self::Checkly => "checkly",
            Self::Northflank => "northflank",
            Self::Teamcity => "teamcity",
            Self::HashicorpVault => "hashicorp-vault",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Github => "GitHub",
            Self::Gitlab => "GitLab",
            Self::Heroku => "Heroku",
            Self::Vercel => "Vercel",
            Self::Netlify => "Netlify",
            Self::Bitbucket => "Bitbucket",
            Self::AzureKeyVault => "Azure Key Vault",
            Self::GcpSecretManager => "GCP Secret Manager",
            Self::AwsParameterStore => "AWS Parameter Store",
            Self::AwsSecretManager => "AWS Secrets Manager",
            Self::Qovery => "Qovery",
            Self::Railway => "Railway",
            Self::Render => "Render",
            Self::Checkly => "Checkly",
            Self::Northflank => "Northflank",
            Self::Teamcity => "TeamCity",
            Self::HashicorpVault => "HashiCorp Vault",
        }
    }

    /// Suffix used in per-provider environment variables, e.g.
    /// `AZURE_KEY_VAULT` in `ZVAULT_CLIENT_ID_AZURE_KEY_VAULT`.
    #[must_use]
    pub fn env_suffix(self) -> String {
        self.as_str().to_ascii_uppercase().replace('-', "_")
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownProvider {
                value: s.to_owned(),
            })
    }
}
