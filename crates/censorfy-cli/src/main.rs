//! `censorfy` — command-line front end for the Censorfy auth service.
//!
//! Logs in, keeps the session token in a local file, and manages API keys.
//! All remote work goes through `censorfy-client`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use censorfy_client::{
    CensorfyError, Client, ClientConfig, FileTokenStore, KeyManager, Session, SignupOutcome,
    TokenStore,
};

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

// ── CLI structure ────────────────────────────────────────────────────

/// Censorfy — API keys for the censorship service.
#[derive(Parser)]
#[command(
    name = "censorfy",
    version,
    about = "Censorfy CLI — log in, manage API keys, and run censorship checks",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         CENSORFY_API_URL      Auth service URL (default: https://api-service-server.vercel.app)\n  \
         CENSORFY_RELAY_URL    Censorship relay URL (default: http://localhost:3000)\n  \
         CENSORFY_TOKEN_FILE   Session token file (default: ~/.censorfy/token)\n\n\
         {DIM}Examples:{RESET}\n  \
         censorfy login --username a@b.com --password x\n  \
         censorfy keys create\n  \
         censorfy keys list\n  \
         censorfy keys exercise <key>"
    ),
)]
struct Cli {
    /// Auth service base URL.
    #[arg(long, env = "CENSORFY_API_URL")]
    api_url: Option<String>,

    /// Censorship relay base URL.
    #[arg(long, env = "CENSORFY_RELAY_URL")]
    relay_url: Option<String>,

    /// File holding the session token.
    #[arg(long, env = "CENSORFY_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// Log client activity to stderr.
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and save the session token.
    Login {
        /// Account email.
        #[arg(long)]
        username: String,
        /// Account password.
        #[arg(long, env = "CENSORFY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account.
    Signup {
        /// Display name.
        #[arg(long)]
        name: String,
        /// Account email.
        #[arg(long)]
        username: String,
        /// Account password.
        #[arg(long, env = "CENSORFY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the saved session token.
    Logout,
    /// Show whether a session is saved.
    Status,
    /// API key operations.
    Keys {
        #[command(subcommand)]
        action: KeyCommands,
    },
    /// Run a censorship check through the relay.
    Check {
        /// JSON object to submit, e.g. '{"text":"..."}'.
        payload: String,
    },
}

#[derive(Subcommand)]
enum KeyCommands {
    /// List your API keys.
    List,
    /// Create a new API key.
    Create,
    /// Delete an API key.
    Delete {
        /// The key value to delete.
        key: String,
    },
    /// Call the sample endpoint with a key and print the response.
    Exercise {
        /// The key value to use.
        key: String,
    },
}

// ── Pretty output helpers ────────────────────────────────────────────

fn header(icon: &str, title: &str) {
    println!("{BOLD}{CYAN}{icon} {title}{RESET}");
    println!("{DIM}─────────────────────────────────────────{RESET}");
}

fn kv_line(key: &str, value: &str) {
    println!("  {DIM}{key:<20}{RESET} {WHITE}{value}{RESET}");
}

fn success(msg: &str) {
    println!("{GREEN}{BOLD}✓{RESET} {msg}");
}

fn warning(msg: &str) {
    println!("{YELLOW}{BOLD}⚠{RESET} {YELLOW}{msg}{RESET}");
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("failed to format JSON: {e}"),
    }
}

// ── Context ──────────────────────────────────────────────────────────

struct CliContext {
    client: Client,
    store: Arc<FileTokenStore>,
}

impl CliContext {
    fn new(cli: &Cli) -> Result<Self> {
        let client = Client::with_config(&ClientConfig {
            base_url: cli.api_url.clone().unwrap_or_default(),
            relay_url: cli.relay_url.clone().unwrap_or_default(),
            ..Default::default()
        })?;
        let path = match &cli.token_file {
            Some(path) => path.clone(),
            None => default_token_path()?,
        };
        Ok(Self {
            client,
            store: Arc::new(FileTokenStore::new(path)),
        })
    }

    /// Key manager for the saved session. Fails with `NoSession` when logged out.
    fn manager(&self) -> Result<KeyManager, CensorfyError> {
        let session = Session::restore(self.store.clone())?;
        Ok(KeyManager::new(self.client.clone(), session))
    }

    fn new_session(&self) -> Session {
        Session::with_store(self.store.clone())
    }
}

fn default_token_path() -> Result<PathBuf> {
    Ok(home_dir()?.join(".censorfy").join("token"))
}

fn home_dir() -> Result<PathBuf> {
    #[cfg(unix)]
    {
        std::env::var("HOME").map(PathBuf::from).context("HOME not set")
    }
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .context("USERPROFILE not set")
    }
}

// ── Command dispatch ─────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("censorfy_client=debug"))
            .with_writer(std::io::stderr)
            .init();
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("  {RED}{BOLD}✗ Error:{RESET} {}", describe(&e));
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<CensorfyError>() {
        Some(CensorfyError::NoSession) => {
            "not logged in — run `censorfy login` first".to_owned()
        }
        Some(e) => e.user_message(),
        None => format!("{err:#}"),
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let ctx = CliContext::new(cli)?;
    match &cli.command {
        Commands::Login { username, password } => cmd_login(&ctx, username, password).await,
        Commands::Signup {
            name,
            username,
            password,
        } => cmd_signup(&ctx, name, username, password).await,
        Commands::Logout => cmd_logout(&ctx).await,
        Commands::Status => cmd_status(&ctx),
        Commands::Keys { action } => cmd_keys(&ctx, action).await,
        Commands::Check { payload } => cmd_check(&ctx, payload).await,
    }
}

// ── Session commands ─────────────────────────────────────────────────

async fn cmd_login(ctx: &CliContext, username: &str, password: &str) -> Result<()> {
    let token = ctx.client.login(username, password).await?;
    ctx.new_session().authenticate(token)?;
    success(&format!("Logged in as {username}"));
    kv_line("Token saved to", &ctx.store.path().display().to_string());
    Ok(())
}

async fn cmd_signup(ctx: &CliContext, name: &str, username: &str, password: &str) -> Result<()> {
    match ctx.client.signup(name, username, password).await? {
        SignupOutcome::Authenticated(token) => {
            ctx.new_session().authenticate(token)?;
            success(&format!("Account created — logged in as {username}"));
        }
        SignupOutcome::Registered { message } => {
            success(message.as_deref().unwrap_or("Registration successful!"));
            println!("  {DIM}Please log in: censorfy login --username {username}{RESET}");
        }
    }
    Ok(())
}

async fn cmd_logout(ctx: &CliContext) -> Result<()> {
    match ctx.manager() {
        Ok(manager) => manager.logout().await?,
        Err(CensorfyError::NoSession) => {
            // Still wipe a slot holding an unusable token.
            ctx.store.clear()?;
        }
        Err(e) => return Err(e.into()),
    }
    success("Logged out");
    Ok(())
}

fn cmd_status(ctx: &CliContext) -> Result<()> {
    header("◆", "Censorfy Session");
    kv_line("API", ctx.client.base_url());
    kv_line("Relay", ctx.client.relay_url());
    kv_line("Token file", &ctx.store.path().display().to_string());
    if ctx.store.load()?.is_some() {
        kv_line("Session", "logged in");
    } else {
        kv_line("Session", "not logged in");
    }
    Ok(())
}

// ── Key commands ─────────────────────────────────────────────────────

async fn cmd_keys(ctx: &CliContext, action: &KeyCommands) -> Result<()> {
    match action {
        KeyCommands::List => cmd_keys_list(&ctx.manager()?).await,
        KeyCommands::Create => cmd_keys_create(&ctx.manager()?).await,
        KeyCommands::Delete { key } => cmd_keys_delete(&ctx.manager()?, key).await,
        // Keys authenticate themselves; no session needed.
        KeyCommands::Exercise { key } => cmd_keys_exercise(&ctx.client, key).await,
    }
}

async fn cmd_keys_list(manager: &KeyManager) -> Result<()> {
    let keys = manager.refresh().await?;
    header("⚿", "API keys");
    if keys.is_empty() {
        warning("No API keys yet — create one with `censorfy keys create`");
    }
    for key in &keys {
        println!("  {key}");
    }
    Ok(())
}

async fn cmd_keys_create(manager: &KeyManager) -> Result<()> {
    let key = manager.create().await?;
    success("API key created");
    kv_line("Key", &key);
    Ok(())
}

async fn cmd_keys_delete(manager: &KeyManager, key: &str) -> Result<()> {
    manager.delete(key).await?;
    success(&format!("Deleted API key {key}"));
    Ok(())
}

async fn cmd_keys_exercise(client: &Client, key: &str) -> Result<()> {
    let payload = client.exercise_key(key).await?;
    println!("{}", payload.get());
    Ok(())
}

async fn cmd_check(ctx: &CliContext, payload: &str) -> Result<()> {
    let payload: Value =
        serde_json::from_str(payload).context("payload must be a JSON object")?;
    let manager = ctx.manager()?;
    let result = manager.check_censorship(payload).await?;
    print_json(&result);
    Ok(())
}
