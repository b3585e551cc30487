//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use manualkit_core::pipeline::{BuildConfig, BuildResult, ProgressReporter};
use manualkit_shared::{AppConfig, ChunkPolicy, ChunkingConfig, init_config, load_config, load_config_from};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// manualkit: assemble, render and chunk XML technical manuals.
#[derive(Parser)]
#[command(
    name = "manualkit",
    version,
    about = "Assemble XML manual fragments into one document, render it, and cut it into chunks.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.manualkit/manualkit.toml.
    #[arg(long, global = true, env = "MANUALKIT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Chunking policy as accepted on the command line.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum PolicyArg {
    Balanced,
    PerSection,
}

impl From<PolicyArg> for ChunkPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Balanced => ChunkPolicy::Balanced,
            PolicyArg::PerSection => ChunkPolicy::PerSection,
        }
    }
}

/// Chunking overrides shared by `build` and `chunk`.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct ChunkArgs {
    /// Chunking policy.
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// Hard ceiling on chunk length in bytes.
    #[arg(long)]
    pub hard_ceiling: Option<usize>,

    /// Overlap carried into each following chunk, in bytes.
    #[arg(long)]
    pub overlap: Option<usize>,
}

impl ChunkArgs {
    /// Apply the overrides. A lowered hard ceiling pulls the soft ceiling,
    /// the preferred length and a configured overlap down with it.
    fn apply(&self, chunking: &mut ChunkingConfig) {
        if let Some(policy) = self.policy {
            chunking.policy = policy.into();
        }
        if let Some(hard) = self.hard_ceiling {
            chunking.hard_ceiling = hard;
            chunking.soft_ceiling = chunking.soft_ceiling.min(hard);
            chunking.preferred_len = chunking.preferred_len.min(chunking.soft_ceiling);
            if self.overlap.is_none() && chunking.overlap >= hard {
                chunking.overlap = hard / 10;
            }
        }
        if let Some(overlap) = self.overlap {
            chunking.overlap = overlap;
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Assemble a manual and write all artifacts.
    Build {
        /// Fragment order list (defaults to the configured one).
        #[arg(long)]
        order: Option<PathBuf>,

        /// Directory holding the XML fragments.
        #[arg(long)]
        xml_dir: Option<PathBuf>,

        /// Output directory for the artifacts.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Pre-built cross-reference table (CSV) to merge in.
        #[arg(long)]
        xref_table: Option<PathBuf>,

        #[command(flatten)]
        chunking: ChunkArgs,
    },

    /// Chunk an existing markup file into JSON Lines.
    Chunk {
        /// Markup file to chunk.
        #[arg(long)]
        input: PathBuf,

        /// Output file (defaults to the input name with a .jsonl extension).
        #[arg(short, long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        chunking: ChunkArgs,
    },

    /// List the element names used across a fragment directory.
    Tags {
        /// Directory holding the XML fragments.
        #[arg(long)]
        xml_dir: Option<PathBuf>,
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

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "manualkit=info",
        1 => "manualkit=debug",
        _ => "manualkit=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

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
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Build {
            order,
            xml_dir,
            out,
            xref_table,
            chunking,
        } => {
            let mut config = BuildConfig::from_app_config(
                &resolve_config(config_path)?,
                env!("CARGO_PKG_VERSION"),
            );
            if let Some(order) = order {
                config.order_file = order;
            }
            if let Some(dir) = xml_dir {
                config.xml_dir = dir;
            }
            if let Some(out) = out {
                config.output_dir = out;
            }
            if xref_table.is_some() {
                config.xref_table = xref_table;
            }
            chunking.apply(&mut config.chunking);
            cmd_build(&config)
        }
        Command::Chunk {
            input,
            out,
            chunking,
        } => {
            let mut chunk_config = resolve_config(config_path)?.chunking;
            chunking.apply(&mut chunk_config);
            let dest = out.unwrap_or_else(|| input.with_extension("jsonl"));
            cmd_chunk(&input, &dest, &chunk_config)
        }
        Command::Tags { xml_dir } => {
            let dir = match xml_dir {
                Some(dir) => dir,
                None => PathBuf::from(resolve_config(config_path)?.source.xml_dir),
            };
            cmd_tags(&dir)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

/// Load the config from `--config` when given, else from the default location.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_build(config: &BuildConfig) -> Result<()> {
    info!(
        order = %config.order_file.display(),
        xml_dir = %config.xml_dir.display(),
        policy = %config.chunking.policy,
        "building manual"
    );

    let reporter = CliProgress::new();
    let result = manualkit_core::build(config, &reporter)?;
    let manifest = &result.manifest;

    println!();
    println!("  Manual built successfully!");
    println!("  Run:       {}", manifest.id);
    println!(
        "  Fragments: {} ({} skipped)",
        manifest.fragment_count,
        result.fragment_errors.len()
    );
    println!("  Sections:  {}", manifest.section_count);
    println!("  Chunks:    {}", result.stats);
    println!(
        "  Refs:      {} unresolved, {} missing callouts",
        result.audit.unresolved_count(),
        result.audit.missing_count()
    );
    if !manifest.skipped_tags.is_empty() {
        let skipped: Vec<String> = manifest
            .skipped_tags
            .iter()
            .map(|(tag, count)| format!("{tag} ({count})"))
            .collect();
        println!("  Skipped:   {}", skipped.join(", "));
    }
    println!("  Path:      {}", result.output_dir.display());
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    for error in &result.fragment_errors {
        println!("  ! {error}");
    }
    println!();

    Ok(())
}

fn cmd_chunk(input: &Path, dest: &Path, chunking: &ChunkingConfig) -> Result<()> {
    info!(input = %input.display(), policy = %chunking.policy, "chunking markup file");

    let reporter = CliProgress::new();
    let stats = manualkit_core::chunk_file(input, dest, chunking, &reporter);
    reporter.finish();
    let stats = stats?;

    println!("{stats}");
    println!("Chunks written to: {}", dest.display());
    Ok(())
}

fn cmd_tags(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(eyre!("'{}' is not a directory", dir.display()));
    }

    let inventory = manualkit_fragments::tag_inventory(dir)?;

    let mut counts: Vec<(&String, &usize)> = inventory.counts.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (tag, count) in counts {
        println!("{count:>8}  {tag}");
    }
    println!();
    println!(
        "{} distinct elements in {} fragments",
        inventory.counts.len(),
        inventory.files
    );
    for failure in &inventory.failures {
        println!("  ! {failure}");
    }
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
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
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

    fn chunk_emitted(&self, current: usize) {
        if current % 64 == 0 {
            self.spinner.set_message(format!("Chunking [{current}]"));
        }
    }

    fn done(&self, _result: &BuildResult) {
        self.finish();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
