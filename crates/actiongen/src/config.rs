//! Configuration loading and merging.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fs;

use crate::cli::Args;

/// Project configuration from `actiongen.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ProjectConfig {
    /// Suffix appended to generated class names.
    pub generation_suffix: Option<String>,

    /// Directory generated sources are written to.
    pub out_dir: Option<Utf8PathBuf>,

    /// `key=value` substitutions, `$`-prefixed keys are regex patterns.
    pub defines: Vec<String>,

    /// Glob patterns to ignore.
    pub ignore: Vec<String>,

    /// Whether the generated-file cache is enabled.
    pub cache: Option<bool>,
}

impl ProjectConfig {
    /// Loads `actiongen.toml` from the workspace root, defaulting on absence.
    pub fn load(workspace: &Utf8Path) -> Self {
        let path = workspace.join("actiongen.toml");
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse {}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read {}: {}", path, e);
                Self::default()
            }
        }
    }
}

/// Effective options for one generation run.
///
/// CLI arguments win over `actiongen.toml`; `ACTIONGEN_DEBUG` wins over
/// both for the debug flag.
#[derive(Debug, Clone)]
pub struct ProcessingOptions {
    pub generation_suffix: String,
    pub out_dir: Utf8PathBuf,
    pub defines: Vec<String>,
    pub ignore: Vec<String>,
    pub cache_enabled: bool,
    pub debug_actions: bool,
}

impl ProcessingOptions {
    /// Merges the CLI arguments with the project configuration.
    pub fn merge(args: &Args, config: &ProjectConfig) -> Self {
        let generation_suffix = if args.generation_suffix != "_" {
            args.generation_suffix.clone()
        } else {
            config
                .generation_suffix
                .clone()
                .unwrap_or_else(|| args.generation_suffix.clone())
        };

        let out_dir = if args.out_dir.as_str() != "generated" {
            args.out_dir.clone()
        } else {
            config.out_dir.clone().unwrap_or_else(|| args.out_dir.clone())
        };

        let mut defines = config.defines.clone();
        defines.extend(args.defines.iter().cloned());

        let mut ignore = config.ignore.clone();
        ignore.extend(args.ignore.iter().cloned());

        let cache_enabled = !args.no_cache && config.cache.unwrap_or(true);

        let debug_actions =
            args.debug_actions || read_env_bool("ACTIONGEN_DEBUG").unwrap_or(false);

        Self {
            generation_suffix,
            out_dir,
            defines,
            ignore,
            cache_enabled,
            debug_actions,
        }
    }
}

fn read_env_bool(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
