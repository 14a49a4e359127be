//! Main orchestration logic.

use crate::cli::{Args, OutputFormat, Threshold};
use crate::config::{ProcessingOptions, ProjectConfig};
use crate::filer::{self, fingerprint, CachedFiler, DiskFiler};
use crate::generate::generate_units;
use crate::host::{parse_unit, register_actions, SourceUnit};
use crate::output::{FormattedDiagnostic, Formatter, RunSummary};
use action_diagnostics::{Diagnostic, DiagnosticSink, Severity};
use action_model::ActionRegistry;
use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSetBuilder};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::time::Instant;
use thiserror::Error;
use walkdir::WalkDir;

/// Generated holders can reference other generated classes, so the round
/// loop re-runs over fresh outputs, bounded to stay terminating.
const MAX_ROUNDS: usize = 3;

/// Orchestration errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Invalid glob pattern.
    #[error("invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// Watch error.
    #[error("watch error: {0}")]
    WatchFailed(String),

    /// Generated sources could not be written.
    #[error(transparent)]
    FilerFailed(#[from] filer::FilerError),
}

/// Runs generation over the whole workspace.
pub async fn run(args: Args) -> Result<RunSummary, OrchestratorError> {
    let workspace = if args.workspace.is_relative() {
        std::env::current_dir()
            .map(|p| Utf8PathBuf::try_from(p).unwrap_or_default())
            .unwrap_or_default()
            .join(&args.workspace)
    } else {
        args.workspace.clone()
    };

    let config = ProjectConfig::load(&workspace);
    let options = ProcessingOptions::merge(&args, &config);

    // Build ignore glob set
    let mut ignore_builder = GlobSetBuilder::new();
    for pattern in &options.ignore {
        let glob = Glob::new(pattern).map_err(|e| OrchestratorError::InvalidGlob(e.to_string()))?;
        ignore_builder.add(glob);
    }

    // Default ignores, the output and cache trees included.
    let default_ignores = [
        "**/build/**".to_string(),
        "**/target/**".to_string(),
        "**/.actiongen-cache/**".to_string(),
        format!("{}/**", options.out_dir),
    ];
    for pattern in &default_ignores {
        if let Ok(glob) = Glob::new(pattern) {
            ignore_builder.add(glob);
        }
    }

    let ignore_set = ignore_builder
        .build()
        .map_err(|e| OrchestratorError::InvalidGlob(e.to_string()))?;

    // Find annotated Java sources
    let files: Vec<Utf8PathBuf> = WalkDir::new(&workspace)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| Utf8PathBuf::try_from(e.into_path()).ok())
        .filter(|p| p.extension() == Some("java"))
        .filter(|p| {
            let relative = p.strip_prefix(&workspace).unwrap_or(p);
            !ignore_set.is_match(relative.as_str())
        })
        .collect();

    if args.watch {
        run_watch_mode(&args, &options, &workspace, files).await
    } else {
        run_generation(&args, &options, &workspace, files).await
    }
}

/// Output sink with or without the cache layer.
enum OutputSink {
    Plain(DiskFiler),
    Cached(CachedFiler),
}

impl OutputSink {
    fn begin_round(&mut self) {
        match self {
            Self::Plain(filer) => filer.begin_round(),
            Self::Cached(filer) => filer.begin_round(),
        }
    }

    fn is_fresh(&self, input: &str, digest: &str) -> bool {
        match self {
            Self::Plain(_) => false,
            Self::Cached(filer) => filer.is_fresh(input, digest),
        }
    }

    fn restore(&mut self, input: &str) -> Result<usize, filer::FilerError> {
        match self {
            Self::Plain(_) => Ok(0),
            Self::Cached(filer) => filer.restore(input),
        }
    }

    fn create_source(
        &mut self,
        input: &str,
        digest: &str,
        qualified_name: &str,
        content: &str,
    ) -> Result<bool, filer::FilerError> {
        match self {
            Self::Plain(filer) => filer.create_source(qualified_name, content),
            Self::Cached(filer) => filer.create_source(input, digest, qualified_name, content),
        }
    }

    async fn finish(&mut self, live: &HashSet<String>) -> Result<(), filer::FilerError> {
        if let Self::Cached(filer) = self {
            filer.retain_inputs(live);
            filer.flush().await?;
        }
        Ok(())
    }
}

struct ParsedFile {
    path: Utf8PathBuf,
    source: String,
    unit: SourceUnit,
    diagnostics: Vec<Diagnostic>,
}

/// Runs one full generation pass.
async fn run_generation(
    args: &Args,
    options: &ProcessingOptions,
    workspace: &Utf8Path,
    files: Vec<Utf8PathBuf>,
) -> Result<RunSummary, OrchestratorError> {
    let total_start = Instant::now();
    let formatter = Formatter::new(args.output);
    let output_json = matches!(args.output, OutputFormat::Json);

    let out_dir = if options.out_dir.is_relative() {
        workspace.join(&options.out_dir)
    } else {
        options.out_dir.clone()
    };
    let mut sink = if options.cache_enabled {
        OutputSink::Cached(CachedFiler::new(
            out_dir.clone(),
            workspace.join(".actiongen-cache"),
        ))
    } else {
        OutputSink::Plain(DiskFiler::new(out_dir.clone()))
    };

    let mut registry = ActionRegistry::new(options.generation_suffix.as_str());
    let mut round_inputs = files.clone();
    let mut round_count = 0usize;
    let mut generated_count = 0usize;
    let mut error_count = 0usize;
    let mut warning_count = 0usize;
    let mut json_output: Vec<FormattedDiagnostic> = Vec::new();
    let mut live_inputs: HashSet<String> = HashSet::new();

    while !round_inputs.is_empty() && round_count < MAX_ROUNDS {
        round_count += 1;
        sink.begin_round();

        // Parse this round's inputs in parallel.
        let parsed: Vec<ParsedFile> = round_inputs
            .par_iter()
            .filter_map(|path| {
                let source = match fs::read_to_string(path) {
                    Ok(s) => s,
                    Err(e) => {
                        eprintln!("Failed to read {}: {}", path, e);
                        return None;
                    }
                };
                let mut file_sink = DiagnosticSink::new();
                let unit = parse_unit(&source, &mut file_sink);
                Some(ParsedFile {
                    path: path.clone(),
                    source,
                    unit,
                    diagnostics: file_sink.into_diagnostics(),
                })
            })
            .collect();

        // Refresh the registry before any synthesis uses it.
        registry.clear_round_metadata();
        for file in &parsed {
            register_actions(&file.unit, &mut registry);
        }
        if options.debug_actions {
            for (name, info) in registry.iter() {
                eprintln!(
                    "action ${} -> {} ({} method group(s))",
                    name,
                    info.holder,
                    info.method_groups().count()
                );
            }
        }

        // Synthesis is single-threaded within a round, as are filer writes.
        let mut next_inputs = Vec::new();
        for mut file in parsed {
            let relative = file.path.strip_prefix(workspace).unwrap_or(&file.path);
            let digest = fingerprint(&file.source);
            live_inputs.insert(relative.to_string());

            if sink.is_fresh(relative.as_str(), &digest) {
                generated_count += sink.restore(relative.as_str())?;
                continue;
            }

            let mut file_sink = DiagnosticSink::new();
            let units = generate_units(&file.unit, &registry, &options.defines, &mut file_sink);
            file.diagnostics.extend(file_sink.into_diagnostics());
            file.diagnostics
                .retain(|diag| include_severity(diag.severity, args.threshold));

            for unit in units {
                if sink.create_source(
                    relative.as_str(),
                    &digest,
                    &unit.qualified_name,
                    &unit.content,
                )? {
                    generated_count += 1;
                    // A generated holder feeds the next round's registry.
                    if unit.content.contains("@ActionFor") {
                        next_inputs.push(out_dir.join(filer::source_path(&unit.qualified_name)));
                    }
                }
            }

            for diag in &file.diagnostics {
                match diag.severity {
                    Severity::Error => error_count += 1,
                    Severity::Warning => warning_count += 1,
                    Severity::Hint => {}
                }
            }
            if !file.diagnostics.is_empty() {
                if output_json {
                    json_output.extend(Formatter::format_json_diagnostics(
                        &file.diagnostics,
                        relative,
                        &file.source,
                    ));
                } else {
                    print!(
                        "{}",
                        formatter.format(&file.diagnostics, relative, &file.source)
                    );
                }
            }
        }

        round_inputs = next_inputs;
    }

    sink.finish(&live_inputs).await?;

    if args.timings {
        eprintln!(
            "actiongen: {} round(s) over {} file(s) in {:?}",
            round_count,
            files.len(),
            total_start.elapsed()
        );
    }

    let summary = RunSummary {
        file_count: files.len(),
        generated_count,
        round_count,
        error_count,
        warning_count,
        fail_on_warnings: args.fail_on_warnings,
    };

    if output_json {
        let json = serde_json::to_string_pretty(&json_output).unwrap_or_else(|_| "[]".to_string());
        println!("{}", json);
    } else {
        println!("{}", summary.format());
    }

    Ok(summary)
}

fn include_severity(severity: Severity, threshold: Threshold) -> bool {
    match threshold {
        Threshold::Error => matches!(severity, Severity::Error),
        Threshold::Warning => true,
    }
}

/// Runs in watch mode.
async fn run_watch_mode(
    args: &Args,
    options: &ProcessingOptions,
    workspace: &Utf8Path,
    initial_files: Vec<Utf8PathBuf>,
) -> Result<RunSummary, OrchestratorError> {
    use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
    use std::time::Duration;

    println!("Starting watch mode...\n");

    let _summary = run_generation(args, options, workspace, initial_files.clone()).await?;

    let (tx, mut rx) = tokio::sync::mpsc::channel(100);

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.blocking_send(event);
            }
        },
        Config::default().with_poll_interval(Duration::from_secs(1)),
    )
    .map_err(|e| OrchestratorError::WatchFailed(e.to_string()))?;

    watcher
        .watch(workspace.as_std_path(), RecursiveMode::Recursive)
        .map_err(|e| OrchestratorError::WatchFailed(e.to_string()))?;

    println!("Watching for changes... (Ctrl+C to stop)\n");

    while let Some(event) = rx.recv().await {
        let java_changed = event
            .paths
            .iter()
            .any(|p| p.extension().map(|ext| ext == "java").unwrap_or(false));

        if java_changed {
            if !args.preserve_watch_output {
                // Clear screen
                print!("\x1B[2J\x1B[1;1H");
            }

            println!("File changed, re-generating...\n");

            let _ = run_generation(args, options, workspace, initial_files.clone()).await;
        }
    }

    Err(OrchestratorError::WatchFailed(
        "watch channel closed unexpectedly".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_error_threshold_drops_warnings() {
        assert!(include_severity(Severity::Error, Threshold::Error));
        assert!(!include_severity(Severity::Warning, Threshold::Error));
        assert!(include_severity(Severity::Warning, Threshold::Warning));
    }

    #[tokio::test]
    async fn test_end_to_end_toast_synthesis() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();

        fs::write(
            src.join("ToastHolder.java"),
            r#"
            package com.example.actions;

            import com.actiongen.api.ActionFor;
            import java.lang.Runnable;

            @ActionFor("Toast")
            public class ToastHolder {
                public ToastHolder init(String title) { return this; }
                void build(Runnable Done) {}
                void execute() {}
            }
            "#,
        )
        .unwrap();

        fs::write(
            src.join("MainActivity.java"),
            r#"
            package com.example;

            public class MainActivity {
                @Click("saveButton")
                void onSave() {
                    $Toast("Hi");
                    if ($Toast.Done) {
                        finish();
                    }
                }
            }
            "#,
        )
        .unwrap();

        let args = Args::parse_from([
            "actiongen",
            "--workspace",
            dir.path().to_str().unwrap(),
            "--no-cache",
        ]);
        let summary = run(args).await.unwrap();
        assert_eq!(summary.error_count, 0);
        assert_eq!(summary.generated_count, 1);
        assert_eq!(summary.round_count, 1);

        let generated = fs::read_to_string(
            dir.path().join("generated/com/example/MainActivity_.java"),
        )
        .unwrap();

        // Synthesis order: construct, init, Done object, build, execute.
        let construct = generated.find("new ToastHolder(").unwrap();
        let init = generated.find(".init(\"Hi\")").unwrap();
        let done = generated.find("toastDone0 = new").unwrap();
        let build = generated.find(".build(").unwrap();
        let execute = generated.find(".execute(").unwrap();
        assert!(construct < init);
        assert!(init < done);
        assert!(done < build);
        assert!(build < execute);

        // The branch body runs inside the Done object's run method.
        let run_open = generated[done..].find("public void run()").unwrap() + done;
        let finish = generated.find("finish();").unwrap();
        assert!(run_open < finish && finish < build);
    }
}
