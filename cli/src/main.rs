use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use futures_util::future::join_all;
use rand::Rng;
use serde_json::{Value, json};
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;
use vigilert::config::{ConfigError, GateConfig};
use vigilert::navigator::NavigationError;
use vigilert::routes::RouteError;
use vigilert::{
    Identity, MemoryAuthProvider, NavigationGuard, NavigationOutcome, NavigationRequest, Navigator, RouteTable,
    SessionStore,
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("route table: {0}")]
    Routes(#[from] RouteError),
    #[error("navigation failed: {0}")]
    Navigation(#[from] NavigationError),
    #[error("navigation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "vigilert-cli", about = "Inspect and simulate VigiLERT navigation gating")]
struct Cli {
    /// YAML route table; the built-in table when omitted.
    #[arg(long, env = "VIGILERT_ROUTES_FILE")]
    routes_file: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the active route table as JSON lines.
    Routes,
    /// Decide a single navigation against an already-resolved session.
    Decide(DecideArgs),
    /// Issue navigations while the session is still resolving.
    Simulate(SimulateArgs),
}

#[derive(Args, Debug)]
struct DecideArgs {
    path: String,

    /// Resolve the session signed in as this user id.
    #[arg(long)]
    uid: Option<String>,
}

#[derive(Args, Debug)]
struct SimulateArgs {
    #[arg(required = true)]
    paths: Vec<String>,

    /// Resolve the session signed in as this user id.
    #[arg(long)]
    uid: Option<String>,

    #[arg(long, default_value_t = 50)]
    resolve_after_ms: u64,

    /// Spread request arrival over this many milliseconds.
    #[arg(long, default_value_t = 0)]
    jitter_ms: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    init_tracing();
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "failed to load .env");
        }
    }

    let cli = Cli::parse();
    let mut config = GateConfig::from_env()?;
    if cli.routes_file.is_some() {
        config.routes_file = cli.routes_file;
    }
    let routes = Arc::new(config.load_routes()?);

    match cli.command {
        Command::Routes => run_routes(&routes),
        Command::Decide(args) => run_decide(routes, args).await,
        Command::Simulate(args) => run_simulate(routes, config.max_redirects, args).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run_routes(routes: &RouteTable) -> Result<(), CliError> {
    for route in routes.routes() {
        println!("{}", serde_json::to_string(route)?);
    }
    Ok(())
}

async fn run_decide(routes: Arc<RouteTable>, args: DecideArgs) -> Result<(), CliError> {
    let (session, provider) = start_session();
    provider.emit(args.uid.map(Identity::new));

    let guard = NavigationGuard::new(session, routes);
    let request = NavigationRequest::new(args.path.clone(), None);
    let decision = guard.decide(&request).await.map_err(NavigationError::from)?;

    print_json(&json!({
        "path": args.path,
        "authenticated": guard.session().is_authenticated(),
        "result": serde_json::to_value(&decision)?,
    }))
}

async fn run_simulate(routes: Arc<RouteTable>, max_redirects: usize, args: SimulateArgs) -> Result<(), CliError> {
    let (session, provider) = start_session();
    let navigator = Navigator::with_max_redirects(NavigationGuard::new(session, routes), max_redirects);
    let started = Instant::now();

    let mut rng = rand::rng();
    let mut tasks = Vec::with_capacity(args.paths.len());
    for path in args.paths {
        let delay = if args.jitter_ms == 0 { 0 } else { rng.random_range(0..=args.jitter_ms) };
        let navigator = navigator.clone();
        tasks.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            let outcome = navigator.navigate(&path).await;
            (path, outcome, started.elapsed())
        }));
    }

    let identity = args.uid.map(Identity::new);
    let resolve_after = Duration::from_millis(args.resolve_after_ms);
    let resolver = tokio::spawn(async move {
        tokio::time::sleep(resolve_after).await;
        tracing::info!(authenticated = identity.is_some(), "provider resolved");
        provider.emit(identity);
    });

    for joined in join_all(tasks).await {
        let (path, outcome, elapsed) = joined?;
        print_json(&outcome_json(&path, outcome?, elapsed))?;
    }
    resolver.await?;

    print_json(&json!({ "current": navigator.current_path(), "history": navigator.history() }))
}

fn start_session() -> (SessionStore, MemoryAuthProvider) {
    let provider = MemoryAuthProvider::new();
    let session = SessionStore::new(Arc::new(provider.clone()));
    session.init();
    (session, provider)
}

fn outcome_json(path: &str, outcome: NavigationOutcome, elapsed: Duration) -> Value {
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    match outcome {
        NavigationOutcome::Committed { path: landed, redirected_from } => json!({
            "requested": path,
            "committed": landed,
            "redirected": redirected_from.is_some(),
            "elapsed_ms": elapsed_ms,
        }),
        NavigationOutcome::Superseded { path: landed } => json!({
            "requested": path,
            "superseded": landed,
            "elapsed_ms": elapsed_ms,
        }),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
