//! CLI argument parsing.

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};

/// Annotation-driven Java code generator for Action expressions.
#[derive(Debug, Parser)]
#[command(name = "actiongen")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Root directory of the annotated sources
    #[arg(long, default_value = ".")]
    pub workspace: Utf8PathBuf,

    /// Directory generated sources are written to
    #[arg(long = "out-dir", default_value = "generated")]
    pub out_dir: Utf8PathBuf,

    /// Output format for diagnostics
    #[arg(long, value_enum, default_value = "human")]
    pub output: OutputFormat,

    /// Minimum severity threshold
    #[arg(long, value_enum, default_value = "warning")]
    pub threshold: Threshold,

    /// Watch mode, regenerate on source changes
    #[arg(long)]
    pub watch: bool,

    /// Preserve watch output (don't clear screen)
    #[arg(long = "preserveWatchOutput")]
    pub preserve_watch_output: bool,

    /// Exit with error on warnings
    #[arg(long = "fail-on-warnings")]
    pub fail_on_warnings: bool,

    /// Glob patterns to ignore
    #[arg(long)]
    pub ignore: Vec<String>,

    /// `key=value` substitutions, `$`-prefixed keys are regex patterns
    #[arg(long = "define", short = 'D')]
    pub defines: Vec<String>,

    /// Suffix appended to generated class names
    #[arg(long = "generation-suffix", default_value = "_")]
    pub generation_suffix: String,

    /// Print the registered actions and their overloads, then exit
    #[arg(long = "debug-actions")]
    pub debug_actions: bool,

    /// Disable the generated-file cache
    #[arg(long = "no-cache")]
    pub no_cache: bool,

    /// Print timing breakdowns
    #[arg(long)]
    pub timings: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// Human-readable with code snippets
    HumanVerbose,
    /// JSON output
    Json,
    /// Machine-readable (one line per diagnostic)
    Machine,
}

/// Severity threshold.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum Threshold {
    /// Only show errors
    Error,
    /// Show errors and warnings (default)
    #[default]
    Warning,
}
