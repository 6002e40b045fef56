//! Configuration-form input given on the command line.

use anyhow::{Result, bail};
use clap::Args;
use serde_json::{Map, Value};
use zvault_integrations::IntegrationForm;
use zvault_integrations::form::{INITIAL_SYNC_BEHAVIOR, SECRET_PATH, SOURCE_ENVIRONMENT};
use zvault_integrations::types::InitialSyncBehavior;

/// Values for an integration's configuration form.
#[derive(Args, Debug, Clone, Default)]
pub struct FormArgs {
    /// Source environment slug (defaults to the project's first environment).
    #[arg(long = "env")]
    pub source_environment: Option<String>,

    /// Secret path to sync from.
    #[arg(long = "path")]
    pub secret_path: Option<String>,

    /// Initial sync behavior: overwrite-target, prefer-target, or prefer-source.
    #[arg(long)]
    pub initial_sync: Option<String>,

    /// Provider field as NAME=VALUE, e.g. targetEnvironment=preview. Repeatable.
    #[arg(long = "field", value_name = "NAME=VALUE", value_parser = parse_pair)]
    pub fields: Vec<(String, String)>,

    /// Resource selection as NODE=ID, e.g. app=prj_123. Repeatable.
    #[arg(long = "select", value_name = "NODE=ID", value_parser = parse_pair)]
    pub selections: Vec<(String, String)>,
}

/// Parse `KEY=VALUE`.
pub fn parse_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.to_owned()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

impl FormArgs {
    fn initial_sync_behavior(&self) -> Result<Option<InitialSyncBehavior>> {
        match self.initial_sync.as_deref() {
            None => Ok(None),
            Some(raw) => match InitialSyncBehavior::parse(raw.trim()) {
                Some(behavior) => Ok(Some(behavior)),
                None => bail!(
                    "invalid --initial-sync '{raw}': expected overwrite-target, prefer-target, or prefer-source"
                ),
            },
        }
    }

    /// Form values to keep across the authorization redirect, if any.
    ///
    /// Selections are not included; resource ids are only known once the
    /// provider is authorized.
    pub fn pending_values(&self) -> Result<Option<Value>> {
        let mut pending = Map::new();
        for (name, value) in &self.fields {
            pending.insert(name.clone(), Value::String(value.clone()));
        }
        if let Some(env) = &self.source_environment {
            pending.insert(SOURCE_ENVIRONMENT.to_owned(), Value::String(env.clone()));
        }
        if let Some(path) = &self.secret_path {
            pending.insert(SECRET_PATH.to_owned(), Value::String(path.clone()));
        }
        if let Some(behavior) = self.initial_sync_behavior()? {
            pending.insert(
                INITIAL_SYNC_BEHAVIOR.to_owned(),
                Value::String(behavior.as_str().to_owned()),
            );
        }
        Ok((!pending.is_empty()).then_some(Value::Object(pending)))
    }

    /// Apply everything to a loaded form: fields first, since they can change
    /// which resources load, then selections in the order given.
    pub async fn apply(&self, form: &mut IntegrationForm) -> Result<()> {
        let behavior = self.initial_sync_behavior()?;
        for (name, value) in &self.fields {
            form.set_field(name, value).await?;
        }
        for (node, id) in &self.selections {
            form.select(node, id).await?;
        }
        if let Some(env) = &self.source_environment {
            form.set_source_environment(env)?;
        }
        if let Some(path) = &self.secret_path {
            form.set_secret_path(path);
        }
        if behavior.is_some() {
            form.set_initial_sync_behavior(behavior);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;

    use serde_json::json;
    use zvault_integrations::testing::{FakeApi, RecordingShell};
    use zvault_integrations::{
        IntegrationAuth, IntegrationsConfig, Provider, Session, SessionStore, WorkflowContext,
    };
    use zvault_session::{MemoryStore, keys};

    use super::*;

    #[test]
    fn pairs_split_on_first_equals() {
        assert_eq!(
            parse_pair("label=a=b").unwrap(),
            ("label".to_owned(), "a=b".to_owned())
        );
        assert_eq!(parse_pair(" app =").unwrap(), ("app".to_owned(), String::new()));
        assert!(parse_pair("=x").is_err());
        assert!(parse_pair("novalue").is_err());
    }

    #[test]
    fn pending_values_carry_fields_but_not_selections() {
        let args = FormArgs {
            secret_path: Some("/app".into()),
            fields: vec![("targetEnvironment".into(), "preview".into())],
            selections: vec![("app".into(), "prj_1".into())],
            ..FormArgs::default()
        };
        assert_eq!(
            args.pending_values().unwrap(),
            Some(json!({"targetEnvironment": "preview", "secretPath": "/app"}))
        );
        assert_eq!(FormArgs::default().pending_values().unwrap(), None);
    }

    #[test]
    fn unknown_initial_sync_is_rejected() {
        let args = FormArgs {
            initial_sync: Some("merge".into()),
            ..FormArgs::default()
        };
        assert!(args.pending_values().is_err());
    }

    #[tokio::test]
    async fn apply_selects_resources_and_environment() {
        let store = MemoryStore::new();
        store.set(keys::PROJECT_ID, "proj_1").await.unwrap();
        let api = FakeApi::new()
            .with_workspace("proj_1", &[("Development", "dev"), ("Production", "prod")])
            .with_auth(IntegrationAuth {
                id: "auth_1".into(),
                integration: Provider::Github,
                project_id: "proj_1".into(),
                team_id: None,
                url: None,
                namespace: None,
                created_at: None,
                updated_at: None,
            })
            .with_resources(
                "apps",
                &[],
                vec![
                    json!({"appId": "1", "name": "api"}),
                    json!({"appId": "2", "name": "web"}),
                ],
            );
        let ctx = WorkflowContext::new(
            IntegrationsConfig::default(),
            Session::new(Arc::new(store)),
            Arc::new(api),
            Arc::new(RecordingShell::new()),
        );
        let mut form = IntegrationForm::load(&ctx, Provider::Github, "auth_1").await.unwrap();

        let args = FormArgs {
            source_environment: Some("prod".into()),
            secret_path: Some("/web".into()),
            selections: vec![("repo".into(), "2".into())],
            ..FormArgs::default()
        };
        args.apply(&mut form).await.unwrap();

        let request = form.validate().unwrap();
        assert_eq!(request.app_id.as_deref(), Some("2"));
        assert_eq!(request.source_environment, "prod");
        assert_eq!(request.secret_path, "/web");
    }
}
