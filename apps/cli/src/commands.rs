//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use drivedocs_core::output::{records_to_json, write_records};
use drivedocs_core::{BatchConfig, BuildReport, ProgressReporter, RecordBuilder, run_batch};
use drivedocs_drive::{DriveClient, DriveSession, build_client};
use drivedocs_keywords::AzureKeywordExtractor;
use drivedocs_shared::{
    AppConfig, expand_home, init_config, load_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// drivedocs: turn a Drive folder into knowledge-base records.
#[derive(Parser)]
#[command(
    name = "drivedocs",
    version,
    about = "Turn a Google Drive folder into tagged JSON records for knowledge-base ingestion.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Drive authentication flags shared by commands that talk to Drive.
#[derive(clap::Args)]
pub(crate) struct DriveAuth {
    /// Token file to use instead of the configured one.
    #[arg(long)]
    pub token: Option<PathBuf>,

    /// Bare OAuth access token (skips the token file; no refresh).
    #[arg(long, env = "DRIVEDOCS_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Process every file in a folder and emit records.
    Run {
        /// Drive folder id (defaults to `defaults.folder_id` from config).
        folder_id: Option<String>,

        /// Batch date stamped on every record, YYYY-MM-DD (defaults to today).
        #[arg(short, long)]
        date: Option<String>,

        /// Directory for per-record JSON files (defaults to `defaults.output_dir`).
        #[arg(short, long, conflicts_with = "stdout")]
        out: Option<PathBuf>,

        /// Print the records as one JSON array on stdout instead of writing files.
        #[arg(long)]
        stdout: bool,

        #[command(flatten)]
        auth: DriveAuth,
    },

    /// List the files in a folder without processing them.
    List {
        /// Drive folder id (defaults to `defaults.folder_id` from config).
        folder_id: Option<String>,

        #[command(flatten)]
        auth: DriveAuth,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "drivedocs=info",
        1 => "drivedocs=debug",
        _ => "drivedocs=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            folder_id,
            date,
            out,
            stdout,
            auth,
        } => cmd_run(folder_id, date, out, stdout, &auth).await,
        Command::List { folder_id, auth } => cmd_list(folder_id, &auth).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    folder_id: Option<String>,
    date: Option<String>,
    out: Option<PathBuf>,
    stdout: bool,
    auth: &DriveAuth,
) -> Result<()> {
    let config = load_config()?;
    // Fails fast when the API key variable is unset
    let extractor = AzureKeywordExtractor::from_config(&config.keywords)?;

    let folder_id = resolve_folder(folder_id, &config)?;
    let last_updated =
        date.unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());

    let drive = open_drive(&config, auth)?;
    let builder = RecordBuilder::new(&drive, &extractor);

    let batch = BatchConfig {
        folder_id: folder_id.clone(),
        last_updated: last_updated.clone(),
    };

    info!(folder_id = %folder_id, last_updated = %last_updated, "processing folder");

    let reporter = CliProgress::new();
    let report = run_batch(&batch, &drive, &builder, &reporter).await?;

    if stdout {
        println!("{}", records_to_json(&report.records)?);
    } else {
        let dir = out.unwrap_or_else(|| expand_home(&config.defaults.output_dir));
        let paths = write_records(&dir, &report.records)?;
        eprintln!("  Wrote {} record(s) to {}", paths.len(), dir.display());
    }

    print_summary(&report);
    Ok(())
}

async fn cmd_list(folder_id: Option<String>, auth: &DriveAuth) -> Result<()> {
    let config = load_config()?;
    let folder_id = resolve_folder(folder_id, &config)?;
    let drive = open_drive(&config, auth)?;

    let files = drive.try_list_files(&folder_id).await?;

    println!("{:<10}  {:<13}  {:<34}  TITLE", "MODIFIED", "TYPE", "ID");
    for file in &files {
        println!(
            "{:<10}  {:<13}  {:<34}  {}",
            file.modified.to_string(),
            file.file_type.as_str(),
            file.id,
            file.title
        );
    }
    eprintln!("  {} file(s)", files.len());

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_folder(folder_id: Option<String>, config: &AppConfig) -> Result<String> {
    folder_id
        .or_else(|| config.defaults.folder_id.clone())
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| {
            eyre!("no folder id given. Pass one as an argument or set defaults.folder_id in the config file")
        })
}

/// Build the Drive client from a bare access token or the token file.
fn open_drive(config: &AppConfig, auth: &DriveAuth) -> Result<DriveClient> {
    let http = build_client(config.drive.timeout_secs)?;

    let session = match &auth.access_token {
        Some(token) => DriveSession::from_access_token(token.clone(), http),
        None => {
            let path = auth
                .token
                .clone()
                .unwrap_or_else(|| expand_home(&config.drive.token_path));
            DriveSession::load(&path, http)?
        }
    };

    Ok(DriveClient::new(&config.drive, session)?)
}

fn print_summary(report: &BuildReport) {
    eprintln!();
    eprintln!("  Batch complete");
    eprintln!("  Run:       {}", report.run_id);
    eprintln!("  Processed: {}", report.processed());
    eprintln!("  Skipped:   {}", report.skipped());
    for failure in &report.failures {
        eprintln!("    - {}: {}", failure.title, failure.error);
    }
    eprintln!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    eprintln!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn file_started(&self, title: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Processing [{current}/{total}] {title}"));
    }

    fn file_skipped(&self, title: &str, error: &str) {
        self.spinner.println(format!("  skipped {title}: {error}"));
    }

    fn done(&self, _report: &BuildReport) {
        self.spinner.finish_and_clear();
    }
}
