//! # Run Command Implementation
//!
//! Processes every version of the filtered graph in topological order and
//! commits each one to the target repository.
//!
//! ## Process
//!
//! 1.  **Configure**: Load `.chronicle.yaml` and apply flag overrides.
//! 2.  **Build**: Load metadata, resolve semantic versions and build the
//!     filtered graph.
//! 3.  **Open**: Initialize the target repository, named after the mapping
//!     flavour and the active filters unless configured explicitly.
//! 4.  **Process**: Run the standard pipeline per version, reporting progress
//!     as each version completes. The first error stops the run; the
//!     repository keeps its last good commit.

use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use chronicle::committer::Committer;
use chronicle::output::OutputConfig;
use chronicle::pipeline::steps::{standard_steps, StepServices};
use chronicle::pipeline::tools::{DirectoryPatchData, PatchDataProvider, Toolbox};
use chronicle::pipeline::{Pipeline, PipelineReport, StepName, StepStatus};
use chronicle::repository::DefaultVcsOperations;
use chronicle::tasks::BoundedRunner;

use super::{load_config, FilterArgs, Session, SourceArgs};

/// Process versions and commit them
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Target repository (default: derived from the storage root, mapping and filters)
    #[arg(long, value_name = "DIR", env = "CHRONICLE_REPO")]
    pub repository: Option<PathBuf>,

    /// Run the pipeline without committing anything
    #[arg(long)]
    pub no_repo: bool,

    /// Rewrite JSON files with sorted keys before committing
    #[arg(long)]
    pub sort_json: bool,

    /// Run the data generator and commit its reports
    #[arg(long)]
    pub datagen: bool,

    /// Print every step status per version
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the `run` command.
pub fn execute(args: RunArgs, output: &OutputConfig) -> Result<()> {
    let start_time = Instant::now();
    let mut config = load_config(&args.source, &args.filters)?;
    if let Some(repository) = args.repository {
        config.repository = Some(repository);
    }
    config.no_repo |= args.no_repo;
    config.artifacts.sort_json |= args.sort_json;
    config.artifacts.load_datagen |= args.datagen;

    let session = Session::open(config)?;
    let view = session.filtered()?;
    let config = &session.config;

    if view.is_empty() {
        if !args.quiet {
            println!("No versions to process");
        }
        return Ok(());
    }

    let committer = if config.no_repo {
        None
    } else {
        let identifier = view.repo_tags_identifier(config.mapping, &config.fallback_mappings);
        let repository = config.repository_path(&identifier);
        if !args.quiet {
            println!("Repository: {}", repository.display());
        }
        Some(Committer::new(
            Box::new(DefaultVcsOperations::open(repository)?),
            config.git.clone(),
            config.artifacts.clone(),
            session.paths.clone(),
        ))
    };

    let patches: Rc<dyn PatchDataProvider> =
        Rc::new(DirectoryPatchData::new(config.patch_data_dir.clone()));
    let pipeline = Pipeline::new(standard_steps(StepServices {
        downloader: Arc::clone(&session.downloader),
        runner: Arc::new(BoundedRunner::new(config.network.fetch_threads)?),
        tools: Rc::new(Toolbox::from_settings(&config.tools)),
        patches,
        committer,
    }));

    let bar = progress_bar(view.len(), args.quiet);
    let result = pipeline.run_graph(&view, config, &session.paths, |report| {
        bar.set_message(report.version.clone());
        if args.verbose {
            bar.println(describe(report, output));
        }
        bar.inc(1);
    });

    let reports = match result {
        Ok(reports) => {
            bar.finish_and_clear();
            reports
        }
        Err(e) => {
            bar.abandon();
            return Err(e.into());
        }
    };

    if !args.quiet {
        let committed = reports
            .iter()
            .filter(|r| r.status_of(StepName::Commit) == Some(StepStatus::Success))
            .count();
        println!(
            "Processed {} versions, {} new commits in {:.1}s",
            reports.len(),
            committed,
            start_time.elapsed().as_secs_f64()
        );
    }
    Ok(())
}

fn progress_bar(len: usize, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

/// One line per version: the id, the aggregate status and every step.
fn describe(report: &PipelineReport, output: &OutputConfig) -> String {
    let steps: Vec<String> = report
        .steps
        .iter()
        .map(|(name, status)| format!("{}={}", name, output.status(*status)))
        .collect();
    format!(
        "{}: {} ({})",
        output.emphasis(&report.version),
        output.status(report.aggregate()),
        steps.join(" ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_lists_every_step() {
        let report = PipelineReport {
            version: "1.14.4".to_string(),
            steps: vec![
                (StepName::FetchArtifacts, StepStatus::UpToDate),
                (StepName::Decompile, StepStatus::Success),
                (StepName::Commit, StepStatus::NotRun),
            ],
        };
        let line = describe(&report, &OutputConfig::from_env_and_flag("never"));
        assert_eq!(
            line,
            "1.14.4: success (fetch-artifacts=up-to-date decompile=success commit=not-run)"
        );
    }

    #[test]
    fn test_execute_missing_config() {
        let args = RunArgs {
            source: SourceArgs {
                config: Some(PathBuf::from("/nonexistent/config.yaml")),
                ..SourceArgs::default()
            },
            filters: FilterArgs::default(),
            repository: None,
            no_repo: true,
            sort_json: false,
            datagen: false,
            verbose: false,
            quiet: true,
        };
        let err = execute(args, &OutputConfig::from_env_and_flag("never")).unwrap_err();
        assert!(err.to_string().contains("Configuration file not found"));
    }
}
