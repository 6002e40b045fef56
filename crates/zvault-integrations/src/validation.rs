//! Per-field validation errors and the shared field rules.

use std::collections::BTreeMap;
use std::fmt;

/// Validation messages keyed by field name.
///
/// Collected for every field before anything is sent, so a form can show all
/// problems at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Merge another set of messages into this one.
    pub fn extend(&mut self, other: ValidationErrors) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Messages recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Iterate `(field, messages)` in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// `Ok(())` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` if any field has a message.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Trimmed value, or `None` when absent or blank.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Record `message` when `value` is absent or blank.
pub fn require(errors: &mut ValidationErrors, field: &str, value: Option<&str>, message: &str) {
    if non_blank(value).is_none() {
        errors.add(field, message);
    }
}

/// Secret paths are absolute folder paths inside an environment.
pub fn secret_path(errors: &mut ValidationErrors, field: &str, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, "Secret path cannot be blank");
    } else if !value.starts_with('/') {
        errors.add(field, "Secret path must start with '/'");
    }
}

/// Record `message` unless `value` is an `https` URL whose host ends with
/// `host_suffix` (any host when `None`).
pub fn https_url(
    errors: &mut ValidationErrors,
    field: &str,
    value: &str,
    host_suffix: Option<&str>,
    message: &str,
) {
    let ok = url::Url::parse(value.trim()).is_ok_and(|url| {
        url.scheme() == "https"
            && url.host_str().is_some_and(|host| {
                host_suffix.is_none_or(|suffix| host.ends_with(suffix) && host.len() > suffix.len())
            })
    });
    if !ok {
        errors.add(field, message);
    }
}

/// Record `message` unless `value` parses as an absolute `http(s)` URL.
pub fn http_url(errors: &mut ValidationErrors, field: &str, value: &str, message: &str) {
    let ok = url::Url::parse(value.trim())
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host());
    if !ok {
        errors.add(field, message);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn collects_messages_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("accessId", "Access key cannot be blank");
        errors.add("accessToken", "Secret key cannot be blank");
        errors.add("accessId", "second");

        assert_eq!(errors.get("accessId").unwrap().len(), 2);
        assert_eq!(
            errors.to_string(),
            "accessId: Access key cannot be blank; accessId: second; accessToken: Secret key cannot be blank"
        );
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn empty_errors_are_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn require_treats_whitespace_as_blank() {
        let mut errors = ValidationErrors::new();
        require(&mut errors, "accessToken", Some("   "), "Token cannot be blank");
        require(&mut errors, "accessId", None, "Id cannot be blank");
        require(&mut errors, "url", Some("x"), "unused");
        assert!(errors.get("accessToken").is_some());
        assert!(errors.get("accessId").is_some());
        assert!(errors.get("url").is_none());
    }

    #[test]
    fn secret_path_must_be_absolute() {
        let mut errors = ValidationErrors::new();
        secret_path(&mut errors, "secretPath", "app/db");
        assert_eq!(
            errors.get("secretPath").unwrap(),
            ["Secret path must start with '/'"]
        );

        let mut errors = ValidationErrors::new();
        secret_path(&mut errors, "secretPath", "/app/db");
        assert!(errors.is_empty());
    }

    #[test]
    fn https_url_checks_scheme_and_host_suffix() {
        let check = |value: &str| {
            let mut errors = ValidationErrors::new();
            https_url(&mut errors, "vaultBaseUrl", value, Some(".vault.azure.net"), "bad");
            errors.is_empty()
        };
        assert!(check("https://foo.vault.azure.net"));
        assert!(check("https://foo.vault.azure.net/"));
        assert!(!check("http://foo.vault.azure.net"));
        assert!(!check("https://foo.example.com"));
        assert!(!check("https://.vault.azure.net"));
        assert!(!check("foo.vault.azure.net"));
    }

    #[test]
    fn http_url_accepts_both_schemes() {
        let check = |value: &str| {
            let mut errors = ValidationErrors::new();
            http_url(&mut errors, "url", value, "bad");
            errors.is_empty()
        };
        assert!(check("http://teamcity.internal:8111"));
        assert!(check("https://vault.example.com"));
        assert!(!check("ftp://vault.example.com"));
        assert!(!check("vault.example.com"));
    }
}
