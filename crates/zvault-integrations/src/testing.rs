//! In-memory test doubles for the workflow's seams.
//!
//! [`FakeApi`] answers from canned data and records every call;
//! [`RecordingShell`] records navigations and notices. Both are available to
//! other crates' tests through the `testing` feature.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::api::{IntegrationApi, ResourceQuery};
use crate::error::ApiError;
use crate::shell::{Destination, Notice, Shell};
use crate::types::{
    CreateIntegrationRequest, ExchangeCodeRequest, Integration, IntegrationAuth,
    SaveAccessTokenRequest, Workspace, WorkspaceEnvironment,
};

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    GetWorkspace(String),
    GetIntegrationAuth(String),
    ExchangeOAuthCode(ExchangeCodeRequest),
    SaveAccessToken(SaveAccessTokenRequest),
    DuplicateIntegrationAuth { id: String, project_id: String },
    ListResources(ResourceQuery),
    CreateIntegration(CreateIntegrationRequest),
}

type ResourceKey = (String, BTreeMap<String, String>);

#[derive(Default)]
struct FakeState {
    workspaces: HashMap<String, Workspace>,
    auths: HashMap<String, IntegrationAuth>,
    resources: HashMap<ResourceKey, Result<Vec<serde_json::Value>, ApiError>>,
    transient: HashMap<ResourceKey, ApiError>,
    exchange_error: Option<ApiError>,
    create_error: Option<ApiError>,
    calls: Vec<ApiCall>,
}

/// A backend answering from canned data.
///
/// Exchanges and token saves succeed with an auth whose id is `auth_new`
/// unless a failure is configured. Unregistered resource listings fail with
/// [`ApiError::NotFound`].
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state(self, f: impl FnOnce(&mut FakeState)) -> Self {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner));
        self
    }

    /// Register a workspace with environments given as `(name, slug)`.
    #[must_use]
    pub fn with_workspace(self, id: &str, environments: &[(&str, &str)]) -> Self {
        let workspace = Workspace {
            id: id.to_owned(),
            name: format!("Project {id}"),
            environments: environments
                .iter()
                .map(|(name, slug)| WorkspaceEnvironment {
                    name: (*name).to_owned(),
                    slug: (*slug).to_owned(),
                })
                .collect(),
        };
        self.with_state(|s| {
            s.workspaces.insert(id.to_owned(), workspace);
        })
    }

    /// Register an existing integration auth.
    #[must_use]
    pub fn with_auth(self, auth: IntegrationAuth) -> Self {
        self.with_state(|s| {
            s.auths.insert(auth.id.clone(), auth);
        })
    }

    /// Answer listings of `endpoint` with `params` by `items`.
    #[must_use]
    pub fn with_resources(
        self,
        endpoint: &str,
        params: &[(&str, &str)],
        items: Vec<serde_json::Value>,
    ) -> Self {
        let key = resource_key(endpoint, params);
        self.with_state(|s| {
            s.resources.insert(key, Ok(items));
        })
    }

    /// Fail listings of `endpoint` with `params`.
    #[must_use]
    pub fn failing_resources(self, endpoint: &str, params: &[(&str, &str)], error: ApiError) -> Self {
        let key = resource_key(endpoint, params);
        self.with_state(|s| {
            s.resources.insert(key, Err(error));
        })
    }

    /// Fail the next listing of `endpoint` with `params`; later listings
    /// answer from the canned data.
    #[must_use]
    pub fn failing_resources_once(
        self,
        endpoint: &str,
        params: &[(&str, &str)],
        error: ApiError,
    ) -> Self {
        let key = resource_key(endpoint, params);
        self.with_state(|s| {
            s.transient.insert(key, error);
        })
    }

    /// Fail every code exchange.
    #[must_use]
    pub fn failing_exchange(self, error: ApiError) -> Self {
        self.with_state(|s| s.exchange_error = Some(error))
    }

    /// Fail every integration creation.
    #[must_use]
    pub fn failing_create(self, error: ApiError) -> Self {
        self.with_state(|s| s.create_error = Some(error))
    }

    fn record(&self, call: ApiCall) -> std::sync::MutexGuard<'_, FakeState> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.calls.push(call);
        state
    }

    /// Every call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .calls
            .clone()
    }

    /// Code exchanges so far.
    #[must_use]
    pub fn exchanges(&self) -> Vec<ExchangeCodeRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::ExchangeOAuthCode(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    /// Integration creations so far.
    #[must_use]
    pub fn creations(&self) -> Vec<CreateIntegrationRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::CreateIntegration(req) => Some(req),
                _ => None,
            })
            .collect()
    }
}

fn resource_key(endpoint: &str, params: &[(&str, &str)]) -> ResourceKey {
    (
        endpoint.to_owned(),
        params
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect(),
    )
}

fn new_auth(provider: crate::Provider, project_id: &str, id: &str) -> IntegrationAuth {
    IntegrationAuth {
        id: id.to_owned(),
        integration: provider,
        project_id: project_id.to_owned(),
        team_id: None,
        url: None,
        namespace: None,
        created_at: None,
        updated_at: None,
    }
}

#[async_trait]
impl IntegrationApi for FakeApi {
    async fn get_workspace(&self, workspace_id: &str) -> Result<Workspace, ApiError> {
        let state = self.record(ApiCall::GetWorkspace(workspace_id.to_owned()));
        state
            .workspaces
            .get(workspace_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound {
                message: format!("workspace {workspace_id}"),
            })
    }

    async fn get_integration_auth(&self, id: &str) -> Result<IntegrationAuth, ApiError> {
        let state = self.record(ApiCall::GetIntegrationAuth(id.to_owned()));
        state.auths.get(id).cloned().ok_or_else(|| ApiError::NotFound {
            message: format!("integration auth {id}"),
        })
    }

    async fn exchange_oauth_code(
        &self,
        request: &ExchangeCodeRequest,
    ) -> Result<IntegrationAuth, ApiError> {
        let mut state = self.record(ApiCall::ExchangeOAuthCode(request.clone()));
        if let Some(err) = &state.exchange_error {
            return Err(err.clone());
        }
        let mut auth = new_auth(request.integration, &request.workspace_id, "auth_new");
        auth.url.clone_from(&request.url);
        state.auths.insert(auth.id.clone(), auth.clone());
        Ok(auth)
    }

    async fn save_access_token(
        &self,
        request: &SaveAccessTokenRequest,
    ) -> Result<IntegrationAuth, ApiError> {
        let mut state = self.record(ApiCall::SaveAccessToken(request.clone()));
        let mut auth = new_auth(request.integration, &request.workspace_id, "auth_new");
        auth.url.clone_from(&request.url);
        auth.namespace.clone_from(&request.namespace);
        state.auths.insert(auth.id.clone(), auth.clone());
        Ok(auth)
    }

    async fn duplicate_integration_auth(
        &self,
        id: &str,
        project_id: &str,
    ) -> Result<IntegrationAuth, ApiError> {
        let mut state = self.record(ApiCall::DuplicateIntegrationAuth {
            id: id.to_owned(),
            project_id: project_id.to_owned(),
        });
        let source = state.auths.get(id).cloned().ok_or_else(|| ApiError::NotFound {
            message: format!("integration auth {id}"),
        })?;
        let copy = IntegrationAuth {
            id: format!("{id}_copy"),
            project_id: project_id.to_owned(),
            ..source
        };
        state.auths.insert(copy.id.clone(), copy.clone());
        Ok(copy)
    }

    async fn list_resources(
        &self,
        query: &ResourceQuery,
    ) -> Result<Vec<serde_json::Value>, ApiError> {
        let mut state = self.record(ApiCall::ListResources(query.clone()));
        let key = (query.endpoint.clone(), query.params.clone());
        if let Some(err) = state.transient.remove(&key) {
            return Err(err);
        }
        state
            .resources
            .get(&key)
            .cloned()
            .unwrap_or_else(|| {
                Err(ApiError::NotFound {
                    message: format!("no canned {} for {:?}", query.endpoint, query.params),
                })
            })
    }

    async fn create_integration(
        &self,
        request: &CreateIntegrationRequest,
    ) -> Result<Integration, ApiError> {
        let state = self.record(ApiCall::CreateIntegration(request.clone()));
        if let Some(err) = &state.create_error {
            return Err(err.clone());
        }
        Ok(Integration {
            id: format!("int_{}", state.calls.len()),
            integration: None,
            is_active: request.is_active,
            app: request.app.clone(),
            app_id: request.app_id.clone(),
            secret_path: Some(request.secret_path.clone()),
        })
    }
}

/// A shell that records what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingShell {
    navigations: Mutex<Vec<Destination>>,
    notices: Mutex<Vec<Notice>>,
}

impl RecordingShell {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn navigations(&self) -> Vec<Destination> {
        self.navigations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Shell for RecordingShell {
    fn navigate(&self, destination: &Destination) {
        self.navigations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(destination.clone());
    }

    fn notify(&self, notice: &Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice.clone());
    }
}
