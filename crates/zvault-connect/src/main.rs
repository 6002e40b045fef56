//! `zvault-connect` — connect `ZVault` projects to third-party platforms.
//!
//! Drives the integration workflow from a terminal: OAuth providers are
//! authorized in the browser and the redirect is caught by a local
//! listener; token providers take credentials on the command line. Session
//! state (active project, CSRF token, pending form) lives in a local redb
//! file.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod form_args;
mod listener;
mod shell;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use zvault_integrations::{
    AccessTokenForm, AuthKind, AuthorizeParams, CallbackHandler, CallbackOutcome, CallbackQuery,
    CallbackState, Credentials, Integration, IntegrationAuth, IntegrationForm,
    IntegrationsConfig, Provider, ProviderRegistry, RedirectInitiator, Session, WorkflowContext,
    auth,
};
use zvault_integrations_http::HttpIntegrationApi;
use zvault_session::RedbStore;

use crate::form_args::FormArgs;
use crate::shell::{BOLD, CYAN, DIM, GREEN, RED, RESET, TerminalShell, header, kv_line, success, warning};

// ── CLI structure ────────────────────────────────────────────────────

/// ZVault Connect — sync project secrets to GitHub, Vercel, AWS, and more.
#[derive(Parser)]
#[command(
    name = "zvault-connect",
    version,
    about = "ZVault Connect — authorize providers and create secret-sync integrations",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         ZVAULT_API_URL                API base URL (default: https://api.zvault.cloud)\n  \
         ZVAULT_TOKEN                  API token\n  \
         ZVAULT_SITE_URL               Redirect URI base (default: http://localhost:8080)\n  \
         ZVAULT_CLIENT_ID_<PROVIDER>   OAuth client id, e.g. ZVAULT_CLIENT_ID_GITHUB\n  \
         ZVAULT_SESSION_PATH           Session database (default: .zvault-session.redb)\n\n\
         {DIM}Examples:{RESET}\n  \
         zvault-connect project use proj_123\n  \
         zvault-connect connect github\n  \
         zvault-connect create github auth_456 --select repo=101 --env prod\n  \
         zvault-connect token aws-parameter-store --access-id AKIA... --access-token ..."
    ),
)]
struct Cli {
    /// API base URL (overrides ZVAULT_API_URL).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// API token.
    #[arg(long, env = "ZVAULT_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Session database path (overrides ZVAULT_SESSION_PATH).
    #[arg(long, global = true)]
    session: Option<PathBuf>,

    /// Log workflow events to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Active project operations.
    Project {
        #[command(subcommand)]
        action: ProjectCommands,
    },
    /// List supported providers.
    Providers,
    /// Authorize an OAuth provider in the browser and wait for the redirect.
    Connect {
        /// Provider slug, e.g. github or azure-key-vault.
        provider: Provider,
        /// Address the redirect URI points at.
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: SocketAddr,
        /// Print the authorization URL instead of opening a browser.
        #[arg(long)]
        no_browser: bool,
        /// Azure AD tenant (Azure Key Vault).
        #[arg(long)]
        tenant_id: Option<String>,
        /// Self-hosted instance URL (GitLab).
        #[arg(long)]
        url: Option<String>,
        /// Create the integration right after authorization.
        #[arg(long)]
        create: bool,
        #[command(flatten)]
        form: FormArgs,
    },
    /// Complete an authorization from a pasted redirect.
    Callback {
        provider: Provider,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        installation_id: Option<String>,
        #[arg(long)]
        error: Option<String>,
        #[arg(long)]
        error_description: Option<String>,
    },
    /// Authorize a provider with pasted credentials.
    Token {
        provider: Provider,
        /// Access key id, role id, or username.
        #[arg(long)]
        access_id: Option<String>,
        /// Access token, API key, or secret.
        #[arg(long, env = "ZVAULT_PROVIDER_TOKEN", hide_env_values = true)]
        access_token: Option<String>,
        #[arg(long)]
        refresh_token: Option<String>,
        /// Instance URL for self-hosted providers.
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        namespace: Option<String>,
    },
    /// Show the resources an integration can target.
    Resources {
        provider: Provider,
        integration_auth_id: String,
        #[command(flatten)]
        form: FormArgs,
    },
    /// Create an integration.
    Create {
        provider: Provider,
        integration_auth_id: String,
        #[command(flatten)]
        form: FormArgs,
    },
    /// Integration authorization operations.
    Auth {
        #[command(subcommand)]
        action: AuthCommands,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Make a project the target of new integrations.
    Use { project_id: String },
    /// Show the active project.
    Show,
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Show an integration authorization.
    Show { integration_auth_id: String },
    /// Copy an authorization into the active project (GitHub only).
    Duplicate { integration_auth_id: String },
}

// ── Command dispatch ─────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = load_config(&cli);
    init_logging(&config, cli.verbose, cli.log_json);

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("  {RED}{BOLD}✗ Error:{RESET} {e:#}");
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> IntegrationsConfig {
    let mut config = IntegrationsConfig::from_env();
    if let Some(url) = &cli.api_url {
        url.trim_end_matches('/').clone_into(&mut config.api_url);
    }
    if let Some(token) = &cli.token {
        config.api_token = Some(token.clone());
    }
    if let Some(path) = &cli.session {
        config.session_path.clone_from(path);
    }
    config
}

fn init_logging(config: &IntegrationsConfig, verbose: bool, json: bool) {
    let level = if verbose || std::env::var_os("ZVAULT_LOG_LEVEL").is_some() {
        config.log_level.as_str()
    } else {
        "warn"
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open_session(config: &IntegrationsConfig) -> Result<Session> {
    let store = RedbStore::open(&config.session_path).with_context(|| {
        format!("failed to open session at {}", config.session_path.display())
    })?;
    Ok(Session::new(Arc::new(store)))
}

fn workflow_context(config: IntegrationsConfig, open_browser: bool) -> Result<WorkflowContext> {
    config.validate()?;
    let session = open_session(&config)?;
    let api = HttpIntegrationApi::from_config(&config)?;
    let shell = TerminalShell::new(config.site_url.clone(), open_browser);
    Ok(WorkflowContext::new(config, session, Arc::new(api), Arc::new(shell)))
}

async fn run(cmd: Commands, config: IntegrationsConfig) -> Result<()> {
    match cmd {
        Commands::Project { action } => cmd_project(&open_session(&config)?, action).await,
        Commands::Providers => {
            cmd_providers(&ProviderRegistry::builtin());
            Ok(())
        }
        Commands::Connect {
            provider,
            listen,
            no_browser,
            tenant_id,
            url,
            create,
            form,
        } => {
            let ctx = workflow_context(config, !no_browser)?;
            let params = AuthorizeParams { tenant_id, url };
            cmd_connect(&ctx, provider, listen, &params, create, &form).await
        }
        Commands::Callback {
            provider,
            code,
            state,
            installation_id,
            error,
            error_description,
        } => {
            let ctx = workflow_context(config, false)?;
            let query = CallbackQuery {
                code,
                state,
                installation_id,
                error,
                error_description,
            };
            cmd_callback(&ctx, provider, query).await
        }
        Commands::Token {
            provider,
            access_id,
            access_token,
            refresh_token,
            url,
            namespace,
        } => {
            let ctx = workflow_context(config, false)?;
            let credentials = Credentials {
                access_id,
                access_token,
                refresh_token,
                url,
                namespace,
            };
            cmd_token(&ctx, provider, &credentials).await
        }
        Commands::Resources {
            provider,
            integration_auth_id,
            form,
        } => {
            let ctx = workflow_context(config, false)?;
            cmd_resources(&ctx, provider, &integration_auth_id, &form).await
        }
        Commands::Create {
            provider,
            integration_auth_id,
            form,
        } => {
            let ctx = workflow_context(config, false)?;
            cmd_create(&ctx, provider, &integration_auth_id, None, &form).await
        }
        Commands::Auth { action } => {
            let ctx = workflow_context(config, false)?;
            cmd_auth(&ctx, action).await
        }
    }
}

// ── Project and provider commands ────────────────────────────────────

async fn cmd_project(session: &Session, action: ProjectCommands) -> Result<()> {
    match action {
        ProjectCommands::Use { project_id } => {
            let project_id = project_id.trim();
            if project_id.is_empty() {
                bail!("project id cannot be blank");
            }
            session.set_project_id(project_id).await?;
            success(&format!("Active project set to {BOLD}{project_id}{RESET}"));
        }
        ProjectCommands::Show => match session.project_id().await? {
            Some(id) => kv_line("Active project", &id),
            None => warning("No active project. Run `zvault-connect project use <id>`."),
        },
    }
    Ok(())
}

fn cmd_providers(registry: &ProviderRegistry) {
    println!();
    header("🔌", "Providers");
    for provider in Provider::ALL {
        let Ok(handler) = registry.get(provider) else {
            continue;
        };
        let kind = match handler.auth_kind() {
            AuthKind::OAuth => "oauth",
            AuthKind::AccessToken => "access token",
        };
        println!(
            "  {CYAN}{:<22}{RESET} {:<24} {DIM}{kind}{RESET}",
            provider.to_string(),
            provider.display_name()
        );
    }
    println!();
}

// ── Authorization commands ───────────────────────────────────────────

async fn cmd_connect(
    ctx: &WorkflowContext,
    provider: Provider,
    listen: SocketAddr,
    params: &AuthorizeParams,
    create: bool,
    form: &FormArgs,
) -> Result<()> {
    println!();
    header("🔗", &format!("Connect {}", provider.display_name()));
    println!();
    kv_line("Redirect URI", &ctx.config.redirect_uri(provider));
    println!();

    RedirectInitiator::new(ctx)
        .initiate(provider, params, form.pending_values()?)
        .await?;
    let outcome = listener::wait_for_callback(ctx, provider, listen).await?;
    print_outcome(&outcome);

    if create && outcome.integration.is_none() {
        println!();
        cmd_create(
            ctx,
            provider,
            &outcome.integration_auth.id,
            outcome.pending_form.as_ref(),
            form,
        )
        .await?;
    } else if outcome.integration.is_none() {
        println!();
        println!("  {DIM}Configure the integration with:{RESET}");
        println!(
            "    {CYAN}zvault-connect create {provider} {}{RESET}",
            outcome.integration_auth.id
        );
        println!();
    }
    Ok(())
}

async fn cmd_callback(ctx: &WorkflowContext, provider: Provider, query: CallbackQuery) -> Result<()> {
    let handler = CallbackHandler::new(ctx, provider, query);
    match handler.run().await {
        CallbackState::Succeeded(outcome) => {
            print_outcome(&outcome);
            Ok(())
        }
        CallbackState::Failed(message) => bail!("authorization failed: {message}"),
        _ => bail!(
            "callback ignored: state does not match the last authorization request; \
             run `zvault-connect connect {provider}` again"
        ),
    }
}

async fn cmd_token(ctx: &WorkflowContext, provider: Provider, credentials: &Credentials) -> Result<()> {
    let form = AccessTokenForm::new(ctx, provider)?;
    let auth = match form.submit(credentials).await {
        Ok(auth) => auth,
        Err(zvault_integrations::WorkflowError::Validation(errors)) => {
            for (field, messages) in errors.iter() {
                for message in messages {
                    eprintln!("  {RED}{field}:{RESET} {message}");
                }
            }
            bail!("credentials are incomplete");
        }
        Err(e) => return Err(e.into()),
    };
    println!();
    success(&format!("{} authorized", provider.display_name()));
    print_auth(&auth);
    Ok(())
}

async fn cmd_auth(ctx: &WorkflowContext, action: AuthCommands) -> Result<()> {
    match action {
        AuthCommands::Show {
            integration_auth_id,
        } => {
            let auth = auth::show(ctx, &integration_auth_id).await?;
            println!();
            header("🔑", "Integration Authorization");
            print_auth(&auth);
        }
        AuthCommands::Duplicate {
            integration_auth_id,
        } => {
            let copy = auth::duplicate(ctx, &integration_auth_id).await?;
            println!();
            success(&format!("Copied {integration_auth_id} into {}", copy.project_id));
            print_auth(&copy);
        }
    }
    println!();
    Ok(())
}

// ── Configuration commands ───────────────────────────────────────────

async fn load_form(
    ctx: &WorkflowContext,
    provider: Provider,
    integration_auth_id: &str,
    pending: Option<&serde_json::Value>,
    args: &FormArgs,
) -> Result<IntegrationForm> {
    let mut form = IntegrationForm::load(ctx, provider, integration_auth_id).await?;
    if let Some(pending) = pending {
        form.restore(pending).await?;
    }
    args.apply(&mut form).await?;
    Ok(form)
}

async fn cmd_resources(
    ctx: &WorkflowContext,
    provider: Provider,
    integration_auth_id: &str,
    args: &FormArgs,
) -> Result<()> {
    let form = load_form(ctx, provider, integration_auth_id, None, args).await?;
    println!();
    header("📦", &format!("{} resources", provider.display_name()));
    print_form(&form);
    println!();
    Ok(())
}

async fn cmd_create(
    ctx: &WorkflowContext,
    provider: Provider,
    integration_auth_id: &str,
    pending: Option<&serde_json::Value>,
    args: &FormArgs,
) -> Result<()> {
    let form = load_form(ctx, provider, integration_auth_id, pending, args).await?;
    let integration = match form.submit().await {
        Ok(integration) => integration,
        Err(zvault_integrations::WorkflowError::Validation(errors)) => {
            print_form(&form);
            println!();
            for (field, messages) in errors.iter() {
                for message in messages {
                    eprintln!("  {RED}{field}:{RESET} {message}");
                }
            }
            bail!("the integration form has errors");
        }
        Err(e) => return Err(e.into()),
    };
    success(&format!("{} integration created", provider.display_name()));
    print_integration(&integration);
    println!();
    Ok(())
}

// ── Output ───────────────────────────────────────────────────────────

fn print_auth(auth: &IntegrationAuth) {
    kv_line("ID", &auth.id);
    kv_line("Provider", auth.integration.display_name());
    kv_line("Project", &auth.project_id);
    if let Some(team) = &auth.team_id {
        kv_line("Team", team);
    }
    if let Some(url) = &auth.url {
        kv_line("URL", url);
    }
    if let Some(namespace) = &auth.namespace {
        kv_line("Namespace", namespace);
    }
    if let Some(created) = auth.created_at {
        kv_line("Created", &created.to_rfc3339());
    }
}

fn print_integration(integration: &Integration) {
    kv_line("ID", &integration.id);
    if let Some(app) = &integration.app {
        kv_line("Target", app);
    }
    if let Some(path) = &integration.secret_path {
        kv_line("Secret path", path);
    }
    let active = if integration.is_active {
        format!("{GREEN}yes{RESET}")
    } else {
        format!("{RED}no{RESET}")
    };
    kv_line("Active", &active);
}

fn print_outcome(outcome: &CallbackOutcome) {
    println!();
    success(&format!(
        "{} authorized",
        outcome.integration_auth.integration.display_name()
    ));
    print_auth(&outcome.integration_auth);
    if let Some(integration) = &outcome.integration {
        println!();
        success("Integration created");
        print_integration(integration);
    }
}

fn print_form(form: &IntegrationForm) {
    for view in form.selectors() {
        println!();
        println!("  {BOLD}{}{RESET} {DIM}({}){RESET}", view.label, view.key);
        for option in &view.options {
            let marker = if option.value == view.selected && !view.disabled {
                format!("{GREEN}●{RESET}")
            } else {
                format!("{DIM}○{RESET}")
            };
            println!("    {marker} {:<28} {DIM}{}{RESET}", option.label, option.value);
        }
    }
    let values = form.values();
    println!();
    kv_line("Secret path", &values.secret_path);
    for (name, value) in &values.fields {
        kv_line(name, value);
    }
    if !form.can_submit() {
        println!();
        warning("The form cannot be submitted yet.");
    }
}
