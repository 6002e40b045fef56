//! Local HTTP listener receiving the provider's OAuth redirect.
//!
//! Serves `GET /integrations/{provider}/oauth2/callback`, the redirect URI
//! built from `ZVAULT_SITE_URL`. Each request runs its own
//! [`CallbackHandler`]; the single-use CSRF token guarantees one exchange
//! even if the browser repeats the request.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use zvault_integrations::{
    CallbackHandler, CallbackOutcome, CallbackQuery, CallbackState, Provider, WorkflowContext,
};

/// Final result of a callback: the outcome, or the user-facing failure.
pub type Completion = Result<Box<CallbackOutcome>, String>;

#[derive(Clone)]
struct ListenerState {
    ctx: WorkflowContext,
    provider: Provider,
    completions: mpsc::Sender<Completion>,
}

/// Router answering callbacks for `provider`.
pub fn router(ctx: WorkflowContext, provider: Provider, completions: mpsc::Sender<Completion>) -> Router {
    Router::new()
        .route("/integrations/{provider}/oauth2/callback", get(callback))
        .with_state(ListenerState {
            ctx,
            provider,
            completions,
        })
        .layer(TraceLayer::new_for_http())
}

async fn callback(
    State(state): State<ListenerState>,
    Path(slug): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let provider = match slug.parse::<Provider>() {
        Ok(provider) if provider == state.provider => provider,
        _ => {
            warn!(slug, expected = %state.provider, "callback for unexpected provider");
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let handler = CallbackHandler::new(&state.ctx, provider, query);
    match handler.run().await {
        CallbackState::Succeeded(outcome) => {
            let _ = state.completions.try_send(Ok(outcome));
            (
                StatusCode::OK,
                format!(
                    "{} is connected. You can close this window and return to the terminal.",
                    provider.display_name()
                ),
            )
                .into_response()
        }
        CallbackState::Failed(message) => {
            let _ = state.completions.try_send(Err(message.clone()));
            (StatusCode::BAD_GATEWAY, message).into_response()
        }
        // Mismatched or missing state: nothing happened, keep waiting.
        _ => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Serve callbacks on `addr` until one completes or the user interrupts.
///
/// # Errors
///
/// Fails if the address cannot be bound, the exchange fails, or the wait is
/// interrupted.
pub async fn wait_for_callback(
    ctx: &WorkflowContext,
    provider: Provider,
    addr: SocketAddr,
) -> Result<Box<CallbackOutcome>> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind callback listener to {addr}"))?;
    info!(%addr, %provider, "waiting for OAuth callback");

    let (tx, mut rx) = mpsc::channel(1);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let app = router(ctx.clone(), provider, tx);
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    let received = tokio::select! {
        completion = rx.recv() => completion,
        _ = tokio::signal::ctrl_c() => None,
    };

    let _ = stop_tx.send(());
    let _ = tokio::time::timeout(Duration::from_secs(5), server).await;

    match received {
        Some(Ok(outcome)) => Ok(outcome),
        Some(Err(message)) => bail!("authorization failed: {message}"),
        None => bail!("interrupted while waiting for authorization"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use zvault_integrations::testing::{FakeApi, RecordingShell};
    use zvault_integrations::{ApiError, IntegrationsConfig, Session, SessionStore};
    use zvault_session::{MemoryStore, keys};

    use super::*;

    async fn context(api: FakeApi) -> (WorkflowContext, Arc<FakeApi>) {
        let store = MemoryStore::new();
        store.set(keys::PROJECT_ID, "proj_1").await.unwrap();
        store.set(keys::CSRF_TOKEN, "abc123").await.unwrap();
        let api = Arc::new(api);
        let ctx = WorkflowContext::new(
            IntegrationsConfig::default(),
            Session::new(Arc::new(store)),
            api.clone(),
            Arc::new(RecordingShell::new()),
        );
        (ctx, api)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn matching_callback_completes() {
        let (ctx, api) = context(FakeApi::new()).await;
        let (tx, mut rx) = mpsc::channel(1);
        let app = router(ctx, Provider::Github, tx);

        let response = app
            .oneshot(get("/integrations/github/oauth2/callback?code=c1&state=abc123"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let outcome = rx.recv().await.unwrap().unwrap();
        assert_eq!(outcome.integration_auth.id, "auth_new");
        assert_eq!(api.exchanges().len(), 1);
    }

    #[tokio::test]
    async fn mismatched_state_is_a_silent_no_op() {
        let (ctx, api) = context(FakeApi::new()).await;
        let (tx, mut rx) = mpsc::channel(1);
        let app = router(ctx, Provider::Github, tx);

        let response = app
            .oneshot(get("/integrations/github/oauth2/callback?code=c1&state=forged"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(rx.try_recv().is_err());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn repeated_request_exchanges_once() {
        let (ctx, api) = context(FakeApi::new()).await;
        let (tx, _rx) = mpsc::channel(1);
        let app = router(ctx, Provider::Github, tx);
        let uri = "/integrations/github/oauth2/callback?code=c1&state=abc123";

        let first = app.clone().oneshot(get(uri)).await.unwrap();
        let second = app.oneshot(get(uri)).await.unwrap();

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::NO_CONTENT);
        assert_eq!(api.exchanges().len(), 1);
    }

    #[tokio::test]
    async fn other_provider_is_not_found() {
        let (ctx, api) = context(FakeApi::new()).await;
        let (tx, _rx) = mpsc::channel(1);
        let app = router(ctx, Provider::Github, tx);

        let response = app
            .oneshot(get("/integrations/gitlab/oauth2/callback?code=c1&state=abc123"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_exchange_reports_failure() {
        let (ctx, _api) = context(FakeApi::new().failing_exchange(ApiError::Status {
            status: 400,
            message: "bad_verification_code".into(),
        }))
        .await;
        let (tx, mut rx) = mpsc::channel(1);
        let app = router(ctx, Provider::Github, tx);

        let response = app
            .oneshot(get("/integrations/github/oauth2/callback?code=c1&state=abc123"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let message = rx.recv().await.unwrap().unwrap_err();
        assert!(message.contains("bad_verification_code"));
    }
}
