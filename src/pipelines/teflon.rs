//! TEFLoN staged tool chain: detect -> collapse -> count -> genotype.
//!
//! The four stage invocations form one failure-isolated unit. The chain is
//! gated by an upstream status file; whatever happens inside it, the final
//! expected output path exists afterwards (real output or empty
//! placeholder) and the status file records the outcome. Errors never
//! propagate past `run_gated`.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info};

use crate::cli;
use crate::config::defs::{
    PREP_TF_DIR, PYTHON_TAG, PipelineError, RunConfig, SAMPLES_TSV, TEFLON_COLLAPSE_TAG,
    TEFLON_COUNT_TAG, TEFLON_DETECT_TAG, TEFLON_GENOTYPE_TAG, TeflonParams,
};
use crate::utils::command::{CommandRunner, ToolRunner};
use crate::utils::file::{append_log, check_file_exists, ensure_dir_tree, touch};
use crate::utils::status::{self, StageStatus};

/// Writes the single-row sample descriptor consumed by every stage.
/// Rewritten fresh on every run.
pub fn make_sample_table(work_dir: &Path, alignment: &Path) -> io::Result<PathBuf> {
    let table = work_dir.join(SAMPLES_TSV);
    std::fs::write(&table, format!("{}\tsample\n", alignment.display()))?;
    Ok(table)
}

pub struct TeflonChain<'a> {
    pub work_dir: PathBuf,
    pub prep_dir: PathBuf,
    pub script_dir: PathBuf,
    pub sample_table: PathBuf,
    pub threads: usize,
    pub log: Option<PathBuf>,
    pub params: &'a TeflonParams,
}

impl<'a> TeflonChain<'a> {
    pub fn new(
        work_dir: PathBuf,
        script_dir: PathBuf,
        threads: usize,
        log: Option<PathBuf>,
        params: &'a TeflonParams,
    ) -> Self {
        let prep_dir = work_dir.join(PREP_TF_DIR);
        let sample_table = work_dir.join(SAMPLES_TSV);
        TeflonChain {
            work_dir,
            prep_dir,
            script_dir,
            sample_table,
            threads,
            log,
            params,
        }
    }

    fn script(&self, name: &str) -> String {
        self.script_dir.join(name).display().to_string()
    }

    fn detect_args(&self) -> Vec<String> {
        let mut cmd = vec![
            PYTHON_TAG.to_string(),
            self.script(TEFLON_DETECT_TAG),
            "-wd".to_string(),
            self.work_dir.display().to_string(),
            "-d".to_string(),
            self.prep_dir.display().to_string(),
            "-s".to_string(),
            self.sample_table.display().to_string(),
            "-i".to_string(),
            "sample".to_string(),
            "-l1".to_string(),
            "family".to_string(),
            "-l2".to_string(),
            "family".to_string(),
            "-t".to_string(),
            self.threads.to_string(),
            "-q".to_string(),
            self.params.quality_threshold.to_string(),
        ];
        if let Some(stdev) = self.params.stdev {
            cmd.extend(["-sd".to_string(), stdev.to_string()]);
        }
        if let Some(cov) = self.params.coverage_cutoff {
            cmd.extend(["-cov".to_string(), cov.to_string()]);
        }
        cmd
    }

    fn collapse_args(&self) -> Vec<String> {
        vec![
            PYTHON_TAG.to_string(),
            self.script(TEFLON_COLLAPSE_TAG),
            "-wd".to_string(),
            self.work_dir.display().to_string(),
            "-d".to_string(),
            self.prep_dir.display().to_string(),
            "-s".to_string(),
            self.sample_table.display().to_string(),
            "-t".to_string(),
            self.threads.to_string(),
            "-n1".to_string(),
            self.params.te_support1.to_string(),
            "-n2".to_string(),
            self.params.te_support2.to_string(),
            "-q".to_string(),
            self.params.quality_threshold.to_string(),
        ]
    }

    fn count_args(&self) -> Vec<String> {
        vec![
            PYTHON_TAG.to_string(),
            self.script(TEFLON_COUNT_TAG),
            "-wd".to_string(),
            self.work_dir.display().to_string(),
            "-d".to_string(),
            self.prep_dir.display().to_string(),
            "-s".to_string(),
            self.sample_table.display().to_string(),
            "-i".to_string(),
            "sample".to_string(),
            "-l2".to_string(),
            "family".to_string(),
            "-t".to_string(),
            self.threads.to_string(),
            "-q".to_string(),
            self.params.quality_threshold.to_string(),
        ]
    }

    fn genotype_args(&self) -> Vec<String> {
        let mut cmd = vec![
            PYTHON_TAG.to_string(),
            self.script(TEFLON_GENOTYPE_TAG),
            "-wd".to_string(),
            self.work_dir.display().to_string(),
            "-d".to_string(),
            self.prep_dir.display().to_string(),
            "-s".to_string(),
            self.sample_table.display().to_string(),
            "-lt".to_string(),
            self.params.read_count_lower.to_string(),
            "-dt".to_string(),
            "pooled".to_string(),
        ];
        if let Some(upper) = self.params.read_count_upper {
            cmd.extend(["-ht".to_string(), upper.to_string()]);
        }
        cmd
    }

    /// Runs the four dependent stages in their fixed order. Stages hand
    /// state to each other through files under the working directory; the
    /// first failing stage short-circuits the rest.
    pub async fn run_stages<R: CommandRunner>(&self, runner: &R) -> Result<(), PipelineError> {
        runner.run(&self.detect_args(), self.log.as_deref()).await?;
        runner.run(&self.collapse_args(), self.log.as_deref()).await?;
        runner.run(&self.count_args(), self.log.as_deref()).await?;
        runner.run(&self.genotype_args(), self.log.as_deref()).await?;
        Ok(())
    }
}

async fn run_checked<R: CommandRunner>(
    chain: &TeflonChain<'_>,
    runner: &R,
    alignment: &Path,
    final_output: &Path,
) -> Result<(), PipelineError> {
    make_sample_table(&chain.work_dir, alignment)?;
    chain.run_stages(runner).await?;
    // A clean exit without the expected artifact is still a failure.
    check_file_exists(final_output)
        .map_err(|_| PipelineError::MissingOutput(final_output.to_path_buf()))?;
    Ok(())
}

/// Gated chain entry. If the upstream status file does not record a
/// completed run, nothing is invoked and an empty placeholder satisfies
/// the downstream dependency check. Stage failures are caught here,
/// logged, recorded as FAILED, and converted into the same placeholder.
pub async fn run_gated<R: CommandRunner>(
    chain: &TeflonChain<'_>,
    runner: &R,
    alignment: &Path,
    status_log: &Path,
    final_output: &Path,
) -> Result<(), PipelineError> {
    if !status::succeeded(status_log) {
        touch(final_output)?;
        return Ok(());
    }

    match run_checked(chain, runner, alignment, final_output).await {
        Ok(()) => {
            status::write(status_log, StageStatus::Completed)?;
        }
        Err(e) => {
            error!("teflon run failed: {}", e);
            if let Some(log) = &chain.log {
                let _ = append_log(log, &format!("{}\n", e));
            }
            status::write(status_log, StageStatus::Failed)?;
            touch(final_output)?;
        }
    }
    Ok(())
}

pub async fn run(config: Arc<RunConfig>) -> Result<(), PipelineError> {
    let runner = ToolRunner;
    run_with(&config, &runner).await
}

/// Module entry used by main; `runner` is injected for tests.
pub async fn run_with<R: CommandRunner>(
    config: &RunConfig,
    runner: &R,
) -> Result<(), PipelineError> {
    let args = &config.args;
    let alignment = check_file_exists(Path::new(cli::required_arg(&args.bam, "--bam")?))?;
    let script_dir = PathBuf::from(cli::required_arg(&args.script_dir, "--script-dir")?);
    let status_log = PathBuf::from(cli::required_arg(&args.status_log, "--status-log")?);
    let final_output = PathBuf::from(cli::required_arg(&args.output, "--output")?);

    ensure_dir_tree(&config.out_dir)?;
    let chain = TeflonChain::new(
        config.out_dir.clone(),
        script_dir,
        args.threads,
        args.log.clone().map(PathBuf::from),
        &config.tools.teflon,
    );

    info!("Running TEFLoN");
    run_gated(&chain, runner, &alignment, &status_log, &final_output).await
}
