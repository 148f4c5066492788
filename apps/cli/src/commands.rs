//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use expertbase_core::{
    BuildConfig, BuildResult, ExpertBase, MergeOutcome, ProgressReporter, RenderConfig, Renderer,
    build_base, build_listing, write_listing,
};
use expertbase_lookup::{LookupClient, MemoLookup};
use expertbase_registry::RegistryClient;
use expertbase_shared::{AppConfig, init_config, load_config, load_config_from};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Expert base builder: researcher profiles from ORCID to Quarto.
#[derive(Parser)]
#[command(
    name = "expertbase",
    version,
    about = "Build an expert directory from ORCID profiles, CSV overrides and templates.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.expertbase/expertbase.toml).
    #[arg(long, global = true, env = "EXPERTBASE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Store file (defaults to `[output] store_dir/store_file`).
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch every identifier in a CSV from the registry and store it.
    Build {
        /// Identifier CSV (identifier in column 2, topic tags in column 3).
        #[arg(short, long)]
        input: PathBuf,

        /// Reference day for current employments (YYYY-MM-DD, defaults to today).
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Merge an override CSV into the store.
    Merge {
        /// Override CSV whose first column is `orcid`.
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Render one Quarto page per expert.
    Render {
        /// Page template (defaults to `[render] template`).
        #[arg(long)]
        template: Option<PathBuf>,

        /// Topic tooltip JSON (defaults to `[render] tooltips`).
        #[arg(long)]
        tooltips: Option<PathBuf>,

        /// Output directory (defaults to `[output] pages_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Write the YAML listing of all experts.
    Listing {
        /// Output directory (defaults to the current directory).
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// File name (defaults to `[output] listing_file`).
        #[arg(long)]
        file: Option<String>,
    },

    /// Print the store as JSON.
    Show,

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

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "expertbase=info",
        1 => "expertbase=debug",
        _ => "expertbase=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
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
    if let Command::Config { action } = &cli.command {
        return match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()),
        };
    }

    let config = resolve_config(cli.config.as_deref())?;
    let store = cli
        .store
        .clone()
        .unwrap_or_else(|| config.output.store_path());

    match cli.command {
        Command::Build { input, today } => cmd_build(&config, &store, input, today).await,
        Command::Merge { input } => cmd_merge(&store, &input),
        Command::Render {
            template,
            tooltips,
            out,
        } => cmd_render(&config, &store, template, tooltips, out),
        Command::Listing { out, file } => cmd_listing(&config, &store, &out, file).await,
        Command::Show => cmd_show(&store),
        Command::Config { .. } => Ok(()),
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Split a store path into the directory and file name `ExpertBase::save` takes.
fn store_location(store: &Path) -> Result<(PathBuf, String)> {
    let file = store
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| eyre!("store path '{}' has no file name", store.display()))?;
    let dir = store
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((dir, file.to_string()))
}

fn save_store(base: &ExpertBase, store: &Path) -> Result<PathBuf> {
    let (dir, file) = store_location(store)?;
    Ok(base.save(&dir, &file)?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_build(
    config: &AppConfig,
    store: &Path,
    input: PathBuf,
    today: Option<NaiveDate>,
) -> Result<()> {
    let mut base = if store.exists() {
        ExpertBase::load(store)?
    } else {
        info!(store = %store.display(), "no existing store, starting empty");
        ExpertBase::new()
    };

    let registry = RegistryClient::new(&config.registry)?;
    let build_config = BuildConfig {
        input,
        today: today.unwrap_or_else(|| Local::now().date_naive()),
    };

    let reporter = CliProgress::new();
    let result = build_base(&build_config, &registry, &mut base, &reporter).await?;
    let path = save_store(&base, store)?;

    println!();
    println!("  Expert base updated!");
    println!("  Stored:  {}", result.added.len());
    println!("  Skipped: {}", result.skipped.len());
    println!("  Total:   {}", base.len());
    println!("  Path:    {}", path.display());
    println!("  Time:    {:.1}s", result.elapsed.as_secs_f64());
    println!();
    Ok(())
}

fn cmd_merge(store: &Path, input: &Path) -> Result<()> {
    let mut base = ExpertBase::load(store)?;

    match base.merge_overrides_from_csv(input)? {
        MergeOutcome::Applied(report) => {
            save_store(&base, store)?;
            println!("  Fields set:  {}", report.fields_set);
            if !report.unknown_ids.is_empty() {
                println!("  Unknown ids: {}", report.unknown_ids.join(", "));
            }
            Ok(())
        }
        MergeOutcome::Rejected { reason } => {
            Err(eyre!("override file '{}' rejected: {reason}", input.display()))
        }
    }
}

fn cmd_render(
    config: &AppConfig,
    store: &Path,
    template: Option<PathBuf>,
    tooltips: Option<PathBuf>,
    out: Option<PathBuf>,
) -> Result<()> {
    let base = ExpertBase::load(store)?;

    let mut render_config = RenderConfig::from(&config.render);
    if let Some(template) = template {
        render_config.template = template;
    }
    if tooltips.is_some() {
        render_config.tooltips = tooltips;
    }
    let out = out.unwrap_or_else(|| PathBuf::from(&config.output.pages_dir));

    let renderer = Renderer::new(&render_config)?;
    let paths = renderer.write_all(&base.list(), &out)?;
    println!("  Rendered {} pages into {}", paths.len(), out.display());
    Ok(())
}

async fn cmd_listing(
    config: &AppConfig,
    store: &Path,
    out: &Path,
    file: Option<String>,
) -> Result<()> {
    let base = ExpertBase::load(store)?;
    let lookup = MemoLookup::new(LookupClient::new(&config.lookup)?);

    let spinner = CliProgress::new();
    spinner.phase("Resolving organisations");
    let entries = build_listing(&base.list(), &lookup).await;
    spinner.finish();

    let file = file.unwrap_or_else(|| config.output.listing_file.clone());
    let path = write_listing(&entries, out, &file)?;
    info!(lookups = lookup.len(), "organisation lookups");
    println!("  Listing with {} entries written to {}", entries.len(), path.display());
    Ok(())
}

fn cmd_show(store: &Path) -> Result<()> {
    let base = ExpertBase::load(store)?;
    println!("{}", base.pretty()?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
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
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn expert_processed(&self, identifier: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Fetching [{current}/{total}] {identifier}"));
    }

    fn done(&self, result: &BuildResult) {
        self.finish();
        if !result.skipped.is_empty() {
            warn!(skipped = ?result.skipped, "some identifiers had no registry data");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_build_with_global_flags() {
        let cli = Cli::try_parse_from([
            "expertbase",
            "build",
            "--input",
            "ids.csv",
            "--today",
            "2024-06-15",
            "--store",
            "out/base.json",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.store, Some(PathBuf::from("out/base.json")));
        match cli.command {
            Command::Build { input, today } => {
                assert_eq!(input, PathBuf::from("ids.csv"));
                assert_eq!(today, NaiveDate::from_ymd_opt(2024, 6, 15));
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn store_location_splits_dir_and_file() {
        let (dir, file) = store_location(Path::new("data/expertbase.json")).unwrap();
        assert_eq!(dir, PathBuf::from("data"));
        assert_eq!(file, "expertbase.json");

        let (dir, _) = store_location(Path::new("expertbase.json")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
    }
}
