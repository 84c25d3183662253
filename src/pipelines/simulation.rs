//! Replicate simulation orchestrator.
//!
//! Iterates replicate indices in order, materializing for each one a
//! reference copy and a pair of synthetic read files, then driving the
//! analysis pipeline over them. Every step is guarded by a filesystem
//! existence check, so the whole batch can be re-run any number of times
//! and each replicate only advances through states not yet satisfied on
//! disk. A failure in one replicate is recorded and the batch moves on.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use log::{debug, error, info, warn};

use crate::cli;
use crate::config::defs::{
    MCCLINTOCK_TAG, MCCLINTOCK_V1_TAG, McClintockConfig, PYTHON3_TAG, PipelineError,
    RUN_STATUS_FILE, RUN_STDERR_FILE, RUN_STDOUT_FILE, RunConfig, SUMMARY_REPORT_HTML,
    SUMMARY_REPORT_TXT,
};
use crate::utils::command::{CommandRunner, ToolRunner};
use crate::utils::file::{check_file_exists, copy_if_absent, ensure_dir_tree, sibling_with_ending};
use crate::utils::reads::ReadSynthesizer;
use crate::utils::status::{self, StageStatus};

/// One independent simulated dataset + analysis run. All paths are fixed
/// at construction from the output root, the run id, and the index.
pub struct Replicate {
    pub index: u32,
    pub data_dir: PathBuf,
    pub reference: PathBuf,
    pub fastq1: PathBuf,
    pub fastq2: PathBuf,
    pub analysis_dir: PathBuf,
}

impl Replicate {
    pub fn new(out: &Path, run_id: &str, index: u32, reference: &Path) -> Self {
        let ref_name = reference
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let data_dir = out.join("data");
        let reference = data_dir.join(format!("{}{}.{}", run_id, index, ref_name));
        let fastq1 = sibling_with_ending(&reference, "_1.fastq");
        let fastq2 = sibling_with_ending(&reference, "_2.fastq");
        let analysis_dir = out
            .join("results")
            .join(format!("run{}_{}", run_id, index));
        Replicate {
            index,
            data_dir,
            reference,
            fastq1,
            fastq2,
            analysis_dir,
        }
    }

    pub fn summary_report(&self) -> PathBuf {
        self.analysis_dir
            .join("results")
            .join("summary")
            .join(SUMMARY_REPORT_TXT)
    }

    pub fn summary_html(&self) -> PathBuf {
        self.analysis_dir
            .join("results")
            .join("summary")
            .join(SUMMARY_REPORT_HTML)
    }

    pub fn status_file(&self) -> PathBuf {
        self.analysis_dir.join(RUN_STATUS_FILE)
    }

    /// A replicate with a recognized summary artifact is permanently
    /// complete and never reprocessed.
    pub fn analysis_done(&self) -> bool {
        self.summary_report().exists() || self.summary_html().exists()
    }

    pub fn reads_ready(&self, single: bool) -> bool {
        self.fastq1.exists() && (single || self.fastq2.exists())
    }
}

struct AnalysisInputs {
    reference: PathBuf,
    consensus: PathBuf,
    locations: PathBuf,
    taxonomy: PathBuf,
}

pub async fn run(config: Arc<RunConfig>) -> Result<(), PipelineError> {
    let runner = ToolRunner;
    run_with(&config, &runner).await
}

/// Orchestrator entry; `runner` is injected for tests.
pub async fn run_with<R: CommandRunner>(
    config: &RunConfig,
    runner: &R,
) -> Result<(), PipelineError> {
    let args = &config.args;
    let mcc = config
        .tools
        .mcclintock
        .as_ref()
        .ok_or_else(|| PipelineError::InvalidConfig("config has no mcclintock section".to_string()))?;

    // Required inputs are validated up front: a missing file aborts the
    // whole batch before any replicate state is written.
    let inputs = AnalysisInputs {
        reference: check_file_exists(Path::new(cli::required_arg(&args.reference, "-r/--reference")?))?,
        consensus: check_file_exists(Path::new(cli::required_arg(&args.consensus, "-c/--consensus")?))?,
        locations: check_file_exists(Path::new(cli::required_arg(&args.locations, "-g/--locations")?))?,
        taxonomy: check_file_exists(Path::new(cli::required_arg(&args.taxonomy, "-t/--taxonomy")?))?,
    };

    let synthesizer = ReadSynthesizer::from_args(args);
    for index in args.start..=args.end {
        let replicate = Replicate::new(&config.out_dir, &args.runid, index, &inputs.reference);
        info!("replicate {}: processing", index);
        if let Err(e) = process_replicate(config, runner, mcc, &synthesizer, &inputs, &replicate).await
        {
            error!("replicate {} failed: {}", index, e);
            if let Err(w) = status::write(&replicate.status_file(), StageStatus::Failed) {
                warn!("replicate {}: could not record status: {}", index, w);
            }
        }
    }
    Ok(())
}

async fn process_replicate<R: CommandRunner>(
    config: &RunConfig,
    runner: &R,
    mcc: &McClintockConfig,
    synthesizer: &ReadSynthesizer,
    inputs: &AnalysisInputs,
    replicate: &Replicate,
) -> Result<(), PipelineError> {
    ensure_dir_tree(&replicate.data_dir)?;
    ensure_dir_tree(&replicate.analysis_dir)?;

    if copy_if_absent(&inputs.reference, &replicate.reference)? {
        debug!("replicate {}: materialized reference copy", replicate.index);
    }

    if !replicate.reads_ready(synthesizer.single) {
        let num_pairs = synthesizer.num_pairs(runner, &replicate.reference).await?;
        debug!(
            "replicate {}: simulating {} read pairs",
            replicate.index, num_pairs
        );
        synthesizer
            .synthesize(runner, &replicate.reference, replicate.index, num_pairs)
            .await?;
    }

    if replicate.analysis_done() {
        debug!(
            "replicate {}: summary present, skipping analysis",
            replicate.index
        );
        return Ok(());
    }

    run_analysis(config, runner, mcc, inputs, replicate).await?;

    if replicate.summary_report().exists() {
        status::write(&replicate.status_file(), StageStatus::Completed)?;
    } else {
        warn!(
            "run at {} failed: no summary report",
            replicate.analysis_dir.display()
        );
    }
    Ok(())
}

async fn run_analysis<R: CommandRunner>(
    config: &RunConfig,
    runner: &R,
    mcc: &McClintockConfig,
    inputs: &AnalysisInputs,
    replicate: &Replicate,
) -> Result<(), PipelineError> {
    let args = &config.args;
    let stdout_file = replicate.analysis_dir.join(RUN_STDOUT_FILE);
    let stderr_file = replicate.analysis_dir.join(RUN_STDERR_FILE);

    match args.mcc_version {
        2 => {
            let mcc_path = mcc.path.as_ref().ok_or_else(|| {
                PipelineError::InvalidConfig("mcclintock.path is required for version 2".to_string())
            })?;
            let mut cmd = vec![
                PYTHON3_TAG.to_string(),
                mcc_path.join(MCCLINTOCK_TAG).display().to_string(),
                "-r".to_string(),
                inputs.reference.display().to_string(),
                "-c".to_string(),
                inputs.consensus.display().to_string(),
                "-1".to_string(),
                replicate.fastq1.display().to_string(),
            ];
            if !args.single {
                cmd.extend(["-2".to_string(), replicate.fastq2.display().to_string()]);
            }
            cmd.extend([
                "-p".to_string(),
                args.threads.to_string(),
                "-o".to_string(),
                replicate.analysis_dir.display().to_string(),
                "-g".to_string(),
                inputs.locations.display().to_string(),
                "-t".to_string(),
                inputs.taxonomy.display().to_string(),
                "-m".to_string(),
                mcc.methods.join(","),
                "--keep_intermediate".to_string(),
                args.keep_intermediate.clone(),
            ]);
            if let Some(augment) = &mcc.augment {
                cmd.extend(["-a".to_string(), augment.display().to_string()]);
            }
            info!(
                "running mcclintock... output: {}",
                replicate.analysis_dir.display()
            );
            debug!("{:?}", cmd);
            runner
                .run_stdout(&cmd, &stdout_file, Some(&stderr_file))
                .await?;
        }
        1 => {
            let mcc_path = mcc.v1_path.as_ref().ok_or_else(|| {
                PipelineError::InvalidConfig(
                    "mcclintock.v1_path is required for version 1".to_string(),
                )
            })?;
            let mut cmd = vec![
                mcc_path.join(MCCLINTOCK_V1_TAG).display().to_string(),
                "-o".to_string(),
                replicate.analysis_dir.display().to_string(),
                "-r".to_string(),
                inputs.reference.display().to_string(),
                "-c".to_string(),
                inputs.consensus.display().to_string(),
                "-g".to_string(),
                inputs.locations.display().to_string(),
                "-t".to_string(),
                inputs.taxonomy.display().to_string(),
                "-1".to_string(),
                replicate.fastq1.display().to_string(),
                "-p".to_string(),
                args.threads.to_string(),
                "-i".to_string(),
            ];
            if !args.single {
                cmd.extend(["-2".to_string(), replicate.fastq2.display().to_string()]);
            }
            if mcc.augment.is_some() {
                cmd.push("-C".to_string());
            }
            info!(
                "running mcclintock... output: {}",
                replicate.analysis_dir.display()
            );
            debug!("{:?}", cmd);
            runner
                .run_stdout(&cmd, &stdout_file, Some(&stderr_file))
                .await?;
            reorder_legacy_output(replicate.index, &replicate.analysis_dir)?;
        }
        version => {
            return Err(PipelineError::InvalidConfig(format!(
                "unsupported pipeline version: {}",
                version
            )));
        }
    }
    Ok(())
}

/// Replaces the first `_` in a legacy result line with the `|` separator
/// the current layout uses; later underscores are untouched.
pub fn rewrite_first_separator(line: &str) -> String {
    line.replacen('_', "|", 1)
}

/// Method name embedded in a legacy result file name:
/// `2_telocate_nonredundant.bed` -> `telocate`.
pub fn legacy_method_name(base_name: &str) -> &str {
    let method = base_name
        .strip_suffix("_nonredundant.bed")
        .unwrap_or(base_name);
    match method.find('_') {
        Some(i) => &method[i + 1..],
        None => method,
    }
}

/// The legacy pipeline scatters per-method result files through its own
/// directory layout. Relocate them into the current version's layout under
/// `<idx>.modref_1/results/<method>/`, rewriting the identifier separator
/// on the way.
pub fn reorder_legacy_output(index: u32, analysis_dir: &Path) -> Result<(), PipelineError> {
    let results_dir = analysis_dir
        .join(format!("{}.modref_1", index))
        .join("results");
    ensure_dir_tree(&results_dir)?;

    let pattern = format!(
        "{}*/*/*/results/*_nonredundant.bed",
        analysis_dir.display()
    );
    let beds = glob::glob(&pattern).map_err(|e| PipelineError::Other(anyhow!(e)))?;
    for entry in beds {
        let bed = entry.map_err(|e| PipelineError::Other(anyhow!(e)))?;
        let base_name = bed
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let method_dir = results_dir.join(legacy_method_name(&base_name));
        ensure_dir_tree(&method_dir)?;

        let content = fs::read_to_string(&bed)?;
        let mut out = File::create(method_dir.join(&base_name))?;
        for line in content.lines() {
            writeln!(out, "{}", rewrite_first_separator(line))?;
        }
    }
    Ok(())
}
