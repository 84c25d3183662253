#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tesim_pipelines::cli::{Arguments, Simulator};
use tesim_pipelines::config::defs::{McClintockConfig, PipelineError, RunConfig, TeflonParams, ToolConfig};
use tesim_pipelines::utils::command::CommandRunner;
use tesim_pipelines::utils::file::write_fasta_record;

/// Test double for CommandRunner: records every argv, optionally fails on
/// a named tool or stage script, and materializes the artifacts the real
/// tool would leave behind so the filesystem guards observe them.
pub struct ScriptedRunner {
    calls: Mutex<Vec<Vec<String>>>,
    fail_on: Option<String>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        ScriptedRunner {
            calls: Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    /// Runner that fails any invocation whose argv mentions `tag`.
    pub fn failing_on(tag: &str) -> Self {
        ScriptedRunner {
            calls: Mutex::new(Vec::new()),
            fail_on: Some(tag.to_string()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    fn flag_value(cmd: &[String], flag: &str) -> Option<String> {
        cmd.iter()
            .position(|a| a == flag)
            .and_then(|i| cmd.get(i + 1))
            .cloned()
    }

    fn record(&self, cmd: &[String]) -> Result<(), PipelineError> {
        self.calls.lock().unwrap().push(cmd.to_vec());
        if let Some(tag) = &self.fail_on {
            if cmd.iter().any(|a| a.contains(tag.as_str())) {
                return Err(PipelineError::ToolExecution {
                    tool: cmd[0].clone(),
                    error: format!("scripted failure in {}", tag),
                });
            }
        }
        Ok(())
    }

    fn materialize(&self, cmd: &[String]) -> std::io::Result<()> {
        let program = cmd[0].as_str();
        let script = cmd.get(1).map(|s| s.as_str()).unwrap_or("");

        if program == "samtools" && script == "faidx" {
            write_fai(Path::new(&cmd[2]))?;
        } else if program == "wgsim" {
            // The last two args are the raw output files. Their bytes are
            // the argv line so determinism tests can compare content.
            let line = cmd.join(" ");
            fs::write(&cmd[cmd.len() - 2], &line)?;
            fs::write(&cmd[cmd.len() - 1], &line)?;
        } else if program == "art_illumina" {
            let prefix = Self::flag_value(cmd, "-o").expect("art argv has -o");
            let line = cmd.join(" ");
            if cmd.iter().any(|a| a == "-p") {
                fs::write(format!("{}1.fq", prefix), &line)?;
                fs::write(format!("{}2.fq", prefix), &line)?;
            } else {
                fs::write(format!("{}.fq", prefix), &line)?;
            }
        } else if script.ends_with("mcclintock.py") {
            let out = PathBuf::from(Self::flag_value(cmd, "-o").expect("mcclintock argv has -o"));
            let summary = out.join("results").join("summary");
            fs::create_dir_all(&summary)?;
            fs::write(summary.join("summary_report.txt"), "ok\n")?;
        } else if program.ends_with("mcclintock.sh") {
            // Legacy layout: results scattered three levels below a
            // sibling of the analysis dir.
            let out = Self::flag_value(cmd, "-o").expect("mcclintock.sh argv has -o");
            let results = PathBuf::from(format!("{}_1", out))
                .join("sacCer")
                .join("run")
                .join("results");
            fs::create_dir_all(&results)?;
            fs::write(
                results.join("2_telocate_nonredundant.bed"),
                "chrI_TY1\t100\t200\nchrII_TY2_x\t5\t9\n",
            )?;
        } else if script.ends_with("teflon_genotype.py") {
            let wd = PathBuf::from(Self::flag_value(cmd, "-wd").expect("genotype argv has -wd"));
            fs::write(wd.join("genotypes.txt"), "sample\t1\n")?;
        }
        Ok(())
    }
}

impl CommandRunner for ScriptedRunner {
    async fn run(&self, cmd: &[String], _log: Option<&Path>) -> Result<(), PipelineError> {
        self.record(cmd)?;
        self.materialize(cmd).map_err(PipelineError::Io)
    }

    async fn run_stdout(
        &self,
        cmd: &[String],
        stdout_to: &Path,
        _log: Option<&Path>,
    ) -> Result<(), PipelineError> {
        self.record(cmd)?;
        fs::File::create(stdout_to).map_err(PipelineError::Io)?;
        self.materialize(cmd).map_err(PipelineError::Io)
    }
}

fn write_fai(fasta: &Path) -> std::io::Result<()> {
    let content = fs::read_to_string(fasta)?;
    let mut out = String::new();
    let mut name = String::new();
    let mut len = 0usize;
    for line in content.lines() {
        if let Some(header) = line.strip_prefix('>') {
            if !name.is_empty() {
                out.push_str(&format!("{}\t{}\t0\t60\t61\n", name, len));
            }
            name = header.split_whitespace().next().unwrap_or("").to_string();
            len = 0;
        } else {
            len += line.trim().len();
        }
    }
    if !name.is_empty() {
        out.push_str(&format!("{}\t{}\t0\t60\t61\n", name, len));
    }
    let mut fai = fasta.as_os_str().to_os_string();
    fai.push(".fai");
    fs::write(fai, out)
}

/// Writes a one-contig reference of `length` bases.
pub fn write_reference(dir: &Path, name: &str, length: usize) -> PathBuf {
    let path = dir.join(name);
    let mut file = fs::File::create(&path).unwrap();
    let seq: Vec<u8> = b"ACGT".iter().copied().cycle().take(length).collect();
    write_fasta_record(&mut file, "chrI", None, &seq).unwrap();
    path
}

/// Arguments/RunConfig pair for the simulation module over small fixture
/// inputs created under `fixtures`.
pub fn simulation_config(out_dir: &Path, fixtures: &Path, reference_len: usize) -> RunConfig {
    let reference = write_reference(fixtures, "sacCer.fasta", reference_len);
    let consensus = write_reference(fixtures, "consensus.fasta", 400);
    let locations = fixtures.join("te.gff");
    fs::write(&locations, "chrI\t.\tte\t1\t100\t.\t+\t.\tID=TY1_1\n").unwrap();
    let taxonomy = fixtures.join("taxonomy.tsv");
    fs::write(&taxonomy, "TY1_1\tTY1\n").unwrap();

    let args = Arguments {
        module: "simulation".to_string(),
        reference: Some(reference.display().to_string()),
        consensus: Some(consensus.display().to_string()),
        locations: Some(locations.display().to_string()),
        taxonomy: Some(taxonomy.display().to_string()),
        tool_config: String::new(),
        threads: 1,
        coverage: 10,
        length: 100,
        insert: 300,
        error: 0.01,
        keep_intermediate: "general".to_string(),
        start: 1,
        end: 1,
        seed: Some("stable-seed".to_string()),
        runid: String::new(),
        simulator: Simulator::Wgsim,
        single: false,
        mcc_version: 2,
        ..Default::default()
    };

    RunConfig {
        cwd: out_dir.to_path_buf(),
        out_dir: out_dir.to_path_buf(),
        args,
        tools: ToolConfig {
            mcclintock: Some(McClintockConfig {
                path: Some(PathBuf::from("/opt/mcclintock")),
                v1_path: Some(PathBuf::from("/opt/mcclintock1")),
                methods: vec!["temp".to_string(), "telocate".to_string()],
                augment: None,
            }),
            teflon: TeflonParams::default(),
        },
    }
}
