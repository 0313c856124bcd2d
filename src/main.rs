use anyhow::Result;
use clap::Parser;
use pkgsync::commands::{self, Report};
use pkgsync::config::Config;
use pkgsync::engine::Engine;
use pkgsync::process::SystemRunner;
use pkgsync::runtime::RealRuntime;
use std::path::PathBuf;
use std::process::ExitCode;

/// pkgsync - keep a host in line with a package catalog
///
/// Reads a catalog of packages (`desktop.conf` by default), compares it with
/// what the platform package manager reports as installed, and installs,
/// updates or removes packages on request. Entries named `github:owner/repo`
/// are cloned from GitHub instead.
///
/// All output is JSON. The exit code is nonzero when any package action fails.
///
/// Examples:
///   pkgsync status             # Installed state of every catalog entry
///   pkgsync install firefox    # Install through the detected package manager
///   pkgsync install github:acme/webtools
#[derive(Parser, Debug)]
#[command(author, version = env!("PKGSYNC_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory the tool runs from (defaults to the current directory)
    #[arg(long, env = "PKGSYNC_BASE_DIR", value_name = "PATH", global = true)]
    pub base_dir: Option<PathBuf>,

    /// Catalog file (defaults to desktop.conf in the base directory)
    #[arg(long, env = "PKGSYNC_CATALOG", value_name = "FILE", global = true)]
    pub catalog: Option<PathBuf>,

    /// Bootstrap registry (defaults to bootstrap.json in the base directory)
    #[arg(long, env = "PKGSYNC_BOOTSTRAP", value_name = "FILE", global = true)]
    pub bootstrap: Option<PathBuf>,

    /// Status cache lifetime in seconds. Each run starts with an empty
    /// cache, so this only matters to an engine kept alive across requests
    #[arg(long, env = "PKGSYNC_CACHE_TTL", value_name = "SECS", global = true)]
    pub cache_ttl: Option<u64>,

    /// Log debug output to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Installed state of every catalog entry
    Status(StatusArgs),

    /// Status, reusing a result computed in the last few seconds
    Refresh,

    /// Show the catalog without querying the package manager
    List,

    /// Probe packages one by one, including available updates
    Probe(NamesArgs),

    /// Install packages
    Install(NamesArgs),

    /// Update packages
    Update(UpdateArgs),

    /// Uninstall packages
    Uninstall(UninstallArgs),

    /// Show the detected platform and package manager
    Detect,

    /// Show where a GitHub repository installs to
    Resolve(ResolveArgs),
}

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Ignore the cache
    #[arg(long)]
    pub refresh: bool,
}

#[derive(clap::Args, Debug)]
pub struct NamesArgs {
    /// Package names, or github:owner/repo
    #[arg(value_name = "NAME", required = true)]
    pub names: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Update every package that reports an update
    #[arg(long, conflicts_with = "names")]
    pub all: bool,

    /// Package names, or github:owner/repo
    #[arg(value_name = "NAME")]
    pub names: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct UninstallArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Package names, or github:owner/repo
    #[arg(value_name = "NAME", required = true)]
    pub names: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Repository in the format "github:owner/repo" or "owner/repo"
    #[arg(value_name = "REPO")]
    pub repo: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let runtime = RealRuntime;
    let config = Config::new(
        &runtime,
        cli.base_dir,
        cli.catalog,
        cli.bootstrap,
        cli.cache_ttl,
    )?;
    let engine = Engine::new(runtime, SystemRunner, config)?;

    let report = match cli.command {
        Commands::Status(args) => commands::status(&engine, args.refresh).await?,
        Commands::Refresh => commands::refresh(&engine).await?,
        Commands::List => commands::list(&engine)?,
        Commands::Probe(args) => commands::probe(&engine, &args.names).await?,
        Commands::Install(args) => commands::install(&engine, &args.names).await?,
        Commands::Update(args) => commands::update(&engine, args.all, &args.names).await?,
        Commands::Uninstall(args) => {
            commands::uninstall(&engine, &args.names, args.yes).await?
        }
        Commands::Detect => commands::detect(&engine)?,
        Commands::Resolve(args) => commands::resolve(&engine, &args.repo)?,
    };

    print_report(&report)
}

fn print_report(report: &Report) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(&report.value)?);
    Ok(if report.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
