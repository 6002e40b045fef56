//! The host environment the workflow runs in.
//!
//! Navigation and user-visible notices are side effects of the host: a browser
//! in the web app, a terminal in the CLI. The workflow only describes them.

use std::fmt;

use crate::provider::Provider;

/// Where the workflow sends the user next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A provider page outside the app (authorization, installation).
    External(String),
    /// The configuration form for a freshly authorized provider.
    ConfigureForm {
        provider: Provider,
        integration_auth_id: String,
    },
    /// The project's integration list.
    IntegrationsList { project_id: String },
}

impl Destination {
    /// Path inside the app, or the full URL for external destinations.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::External(url) => url.clone(),
            Self::ConfigureForm {
                provider,
                integration_auth_id,
            } => format!(
                "/integrations/{provider}/create?integrationAuthId={}",
                urlencoding::encode(integration_auth_id)
            ),
            Self::IntegrationsList { project_id } => {
                format!("/integrations/{}", urlencoding::encode(project_id))
            }
        }
    }

    /// Absolute URL, resolving app paths against `site_url`.
    #[must_use]
    pub fn url(&self, site_url: &str) -> String {
        match self {
            Self::External(url) => url.clone(),
            _ => format!("{}{}", site_url.trim_end_matches('/'), self.path()),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A dismissible message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Host side effects.
pub trait Shell: Send + Sync {
    /// Move the user to `destination`.
    fn navigate(&self, destination: &Destination);

    /// Show a dismissible notice.
    fn notify(&self, notice: &Notice);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_form_path() {
        let dest = Destination::ConfigureForm {
            provider: Provider::Github,
            integration_auth_id: "auth_1".into(),
        };
        assert_eq!(dest.path(), "/integrations/github/create?integrationAuthId=auth_1");
        assert_eq!(
            dest.url("https://app.zvault.cloud/"),
            "https://app.zvault.cloud/integrations/github/create?integrationAuthId=auth_1"
        );
    }

    #[test]
    fn integrations_list_path() {
        let dest = Destination::IntegrationsList {
            project_id: "proj_1".into(),
        };
        assert_eq!(dest.to_string(), "/integrations/proj_1");
    }

    #[test]
    fn external_url_is_untouched() {
        let dest = Destination::External("https://github.com/login/oauth/authorize?x=1".into());
        assert_eq!(dest.url("http://localhost:8080"), dest.path());
    }
}
