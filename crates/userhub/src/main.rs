use std::env;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use config::{Config, Environment, File, FileFormat};
use log::{LevelFilter, debug, info};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use userhub::api;
use userhub::auth::{AuthConfig, AuthService, AuthState, Authorizer, PasswordHasher};
use userhub::db::Database;
use userhub::organization::{OrganizationRepository, OrganizationService};
use userhub::user::{UserRepository, UserService};

const APP_NAME: &str = "userhub";
const ENV_PREFIX: &str = "USERHUB";

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common.clone())?;
    ctx.init_logging();
    debug!("resolved paths: {:#?}", ctx.paths);

    match cli.command {
        Command::Serve(cmd) => run_server(ctx, cmd),
        Command::Init(cmd) => handle_init(&ctx, cmd),
        Command::Config { command } => handle_config(&ctx, command),
        Command::Completions { shell } => handle_completions(shell),
    }
}

#[tokio::main]
async fn run_server(ctx: RuntimeContext, cmd: ServeCommand) -> Result<()> {
    handle_serve(&ctx, cmd).await
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Userhub - multi-tenant user and organization management server.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Path to an alternate config file
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Suppress all output except errors
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// Raise log verbosity; repeat for more detail
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Shortcut for -vv
    #[arg(long, global = true)]
    debug: bool,
    /// Log everything, including per-request traces
    #[arg(long, global = true)]
    trace: bool,
    /// Emit machine-readable JSON where supported
    #[arg(long, global = true)]
    json: bool,
    /// Never emit ANSI color codes
    #[arg(long = "no-color", global = true, conflicts_with = "color")]
    no_color: bool,
    /// When to colorize output
    #[arg(long, value_enum, default_value_t = ColorOption::Auto, global = true)]
    color: ColorOption,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorOption {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeCommand),
    /// Create config directories and default files
    Init(InitCommand),
    /// Inspect and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Args)]
struct ServeCommand {
    /// Host address to bind to
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
    /// Path to the SQLite database file
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct InitCommand {
    /// Recreate configuration even if it already exists
    #[arg(long = "force")]
    force: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Output the effective configuration
    Show,
    /// Print the resolved config file path
    Path,
    /// Regenerate the default configuration file
    Reset,
}

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    paths: AppPaths,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts) -> Result<Self> {
        let paths = AppPaths::discover(common.config.clone())?;
        let config = load_or_init_config(&paths)?;
        fs::create_dir_all(&paths.data_dir)
            .with_context(|| format!("creating data directory {}", paths.data_dir.display()))?;

        Ok(Self {
            common,
            paths,
            config,
        })
    }

    fn init_logging(&self) {
        use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

        if self.common.quiet {
            log::set_max_level(LevelFilter::Off);
            return;
        }

        let level = self.effective_log_level().to_string().to_lowercase();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("userhub={level},tower_http={level}")));

        let registry = tracing_subscriber::registry().with(filter);
        if self.common.json {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .ok();
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_ansi(self.color_enabled()))
                .try_init()
                .ok();
        }

        // Route log-crate records from dependencies as well
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .filter_level(self.effective_log_level())
            .try_init()
            .ok();
    }

    fn color_enabled(&self) -> bool {
        if self.common.no_color
            || matches!(self.common.color, ColorOption::Never)
            || env::var_os("NO_COLOR").is_some()
        {
            return false;
        }
        matches!(self.common.color, ColorOption::Always)
            || env::var_os("FORCE_COLOR").is_some()
            || io::stderr().is_terminal()
    }

    fn effective_log_level(&self) -> LevelFilter {
        if self.common.trace {
            LevelFilter::Trace
        } else if self.common.debug {
            LevelFilter::Debug
        } else {
            match self.common.verbose {
                0 => self
                    .config
                    .logging
                    .level
                    .parse()
                    .unwrap_or(LevelFilter::Info),
                1 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

#[derive(Debug, Clone)]
struct AppPaths {
    config_file: PathBuf,
    data_dir: PathBuf,
}

impl AppPaths {
    fn discover(override_path: Option<PathBuf>) -> Result<Self> {
        let config_file = match override_path {
            Some(path) => {
                let expanded = expand_path(path)?;
                // A directory override means "put config.toml in there"
                if expanded.is_dir() {
                    expanded.join("config.toml")
                } else {
                    expanded
                }
            }
            None => xdg_dir("XDG_CONFIG_HOME", dirs::config_dir, ".config")?.join("config.toml"),
        };

        if config_file.parent().is_none() {
            return Err(anyhow!("invalid config file path: {config_file:?}"));
        }

        Ok(Self {
            config_file,
            data_dir: xdg_dir("XDG_DATA_HOME", dirs::data_dir, ".local/share")?,
        })
    }
}

/// Resolve an app-scoped base directory: explicit XDG variable first, then
/// the platform convention, then the dotted fallback under $HOME.
fn xdg_dir(
    env_var: &str,
    platform_dir: fn() -> Option<PathBuf>,
    home_fallback: &str,
) -> Result<PathBuf> {
    if let Some(base) = env::var_os(env_var).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(base).join(APP_NAME));
    }

    platform_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(home_fallback)))
        .map(|base| base.join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine {env_var} directory"))
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
struct AppConfig {
    logging: LoggingConfig,
    server: ServerConfig,
    database: DatabaseConfig,
    auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct LoggingConfig {
    level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ServerConfig {
    host: String,
    port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
struct DatabaseConfig {
    /// Path to the SQLite database file. Defaults to the data directory.
    path: Option<String>,
}

async fn handle_serve(ctx: &RuntimeContext, cmd: ServeCommand) -> Result<()> {
    info!("Starting userhub server...");

    // Database path: CLI overrides config, config overrides default
    let db_path = match (&cmd.database, &ctx.config.database.path) {
        (Some(path), _) => path.clone(),
        (None, Some(path)) => expand_str_path(path)?,
        (None, None) => ctx.paths.data_dir.join("userhub.db"),
    };
    info!("Database path: {}", db_path.display());
    let database = Database::new(&db_path).await?;

    // The signing key is resolved once here and shared, immutable, for
    // the life of the process.
    let auth_config = ctx.config.auth.clone();
    let auth_state = AuthState::new(&auth_config).context("Invalid auth configuration")?;
    let hasher = auth_config
        .bcrypt_cost
        .map(PasswordHasher::new)
        .unwrap_or_default();

    info!(
        "Membership enforcement: {}",
        if auth_config.enforce_membership {
            "enabled"
        } else {
            "disabled"
        }
    );

    // Wire repositories and services explicitly; no global registry
    let user_repo = UserRepository::new(database.pool().clone());
    let org_repo = OrganizationRepository::new(database.pool().clone());

    let user_service = UserService::new(user_repo.clone(), hasher);
    let auth_service = AuthService::new(user_repo.clone(), hasher, auth_state.issuer());
    let authorizer = Authorizer::new(auth_config.enforce_membership);
    let org_service = OrganizationService::new(org_repo, user_repo, authorizer);

    let state = api::AppState::new(user_service, org_service, auth_service, auth_state);
    let app = api::create_router(state);

    let host = cmd
        .host
        .clone()
        .unwrap_or_else(|| ctx.config.server.host.clone());
    let port = cmd.port.unwrap_or(ctx.config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("invalid address")?;

    info!("Listening on http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .context("binding to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running server")?;

    Ok(())
}

/// Resolve on ctrl-c or SIGTERM, whichever arrives first.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

fn handle_init(ctx: &RuntimeContext, cmd: InitCommand) -> Result<()> {
    if ctx.paths.config_file.exists() && !cmd.force {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            ctx.paths.config_file.display()
        ));
    }

    write_default_config(&ctx.paths.config_file)
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show if ctx.common.json => {
            let rendered = serde_json::to_string_pretty(&ctx.config)
                .context("serializing config to JSON")?;
            println!("{rendered}");
            Ok(())
        }
        ConfigCommand::Show => {
            println!("{:#?}", ctx.config);
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", ctx.paths.config_file.display());
            Ok(())
        }
        ConfigCommand::Reset => write_default_config(&ctx.paths.config_file),
    }
}

fn handle_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
    Ok(())
}

fn load_or_init_config(paths: &AppPaths) -> Result<AppConfig> {
    if !paths.config_file.exists() {
        write_default_config(&paths.config_file)?;
    }

    let built = Config::builder()
        .add_source(
            File::from(paths.config_file.as_path())
                .format(FileFormat::Toml)
                .required(false),
        )
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    built.try_deserialize().context("invalid configuration")
}

fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {parent:?}"))?;
    }

    // Fresh installs get a generated signing secret so the server starts
    // without manual key management.
    let config = AppConfig {
        auth: AuthConfig {
            jwt_secret: Some(AuthConfig::generate_jwt_secret()),
            ..AuthConfig::default()
        },
        ..AppConfig::default()
    };

    let rendered = toml::to_string_pretty(&config).context("serializing default config to TOML")?;
    let body = format!(
        "# Configuration for {APP_NAME}\n# File: {}\n\n{rendered}",
        path.display()
    );
    fs::write(path, body).with_context(|| format!("writing config file to {}", path.display()))
}

fn expand_path(path: PathBuf) -> Result<PathBuf> {
    match path.to_str() {
        Some(text) => expand_str_path(text),
        None => Ok(path),
    }
}

fn expand_str_path(text: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(text).context("expanding path")?;
    Ok(PathBuf::from(expanded.to_string()))
}
