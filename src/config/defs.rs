use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cli::Arguments;

// External software
pub const PYTHON_TAG: &str = "python";
pub const PYTHON3_TAG: &str = "python3";
pub const SAMTOOLS_TAG: &str = "samtools";
pub const WGSIM_TAG: &str = "wgsim";
pub const ART_TAG: &str = "art_illumina";
pub const MCCLINTOCK_TAG: &str = "mcclintock.py";
pub const MCCLINTOCK_V1_TAG: &str = "mcclintock.sh";
pub const TEFLON_DETECT_TAG: &str = "teflon.v0.4.py";
pub const TEFLON_COLLAPSE_TAG: &str = "teflon_collapse.py";
pub const TEFLON_COUNT_TAG: &str = "teflon_count.py";
pub const TEFLON_GENOTYPE_TAG: &str = "teflon_genotype.py";

// Static Filenames
pub const PREP_TF_DIR: &str = "teflon.prep_TF";
pub const SAMPLES_TSV: &str = "samples.tsv";
pub const SUMMARY_REPORT_TXT: &str = "summary_report.txt";
pub const SUMMARY_REPORT_HTML: &str = "summary_report.html";
pub const RUN_STATUS_FILE: &str = "run.status";
pub const RUN_STDOUT_FILE: &str = "run.stdout";
pub const RUN_STDERR_FILE: &str = "run.stderr";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{tool} failed: {error}")]
    ToolExecution { tool: String, error: String },
    #[error("Cannot find file: {0}")]
    MissingInput(PathBuf),
    #[error("Expected output missing: {0}")]
    MissingOutput(PathBuf),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub struct RunConfig {
    pub cwd: PathBuf,
    pub out_dir: PathBuf,
    pub args: Arguments,
    pub tools: ToolConfig,
}

/// Parameter sections for the wrapped external tools, loaded once from a
/// JSON file and never mutated afterwards.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolConfig {
    #[serde(default)]
    pub mcclintock: Option<McClintockConfig>,
    #[serde(default)]
    pub teflon: TeflonParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct McClintockConfig {
    /// Install path of the current pipeline version.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Install path of the legacy pipeline version.
    #[serde(default)]
    pub v1_path: Option<PathBuf>,
    /// Component methods enabled for the run, passed through as `-m`.
    pub methods: Vec<String>,
    /// Optional augmentation reference handed to the pipeline.
    #[serde(default)]
    pub augment: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeflonParams {
    #[serde(default = "default_quality")]
    pub quality_threshold: u32,
    #[serde(default)]
    pub stdev: Option<u32>,
    #[serde(default)]
    pub coverage_cutoff: Option<u32>,
    #[serde(default = "default_support")]
    pub te_support1: u32,
    #[serde(default = "default_support")]
    pub te_support2: u32,
    #[serde(default = "default_support")]
    pub read_count_lower: u32,
    #[serde(default)]
    pub read_count_upper: Option<u32>,
}

impl Default for TeflonParams {
    fn default() -> Self {
        TeflonParams {
            quality_threshold: default_quality(),
            stdev: None,
            coverage_cutoff: None,
            te_support1: default_support(),
            te_support2: default_support(),
            read_count_lower: default_support(),
            read_count_upper: None,
        }
    }
}

fn default_quality() -> u32 {
    20
}

fn default_support() -> u32 {
    1
}

/// Loads the typed tool configuration from a JSON file.
///
/// # Arguments
///
/// * `path` - Path to the JSON config file.
///
/// # Returns
/// ToolConfig, or InvalidConfig if the file cannot be read or parsed.
pub fn load_tool_config(path: &Path) -> Result<ToolConfig, PipelineError> {
    let file = File::open(path)
        .map_err(|e| PipelineError::InvalidConfig(format!("cannot open {}: {}", path.display(), e)))?;
    serde_json::from_reader(file)
        .map_err(|e| PipelineError::InvalidConfig(format!("cannot parse {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = File::create(&path).unwrap();
        write!(
            file,
            r#"{{
                "mcclintock": {{
                    "path": "/opt/mcclintock",
                    "v1_path": "/opt/mcclintock1",
                    "methods": ["temp", "telocate"],
                    "augment": "/data/extra.fasta"
                }},
                "teflon": {{
                    "quality_threshold": 30,
                    "stdev": 25,
                    "te_support1": 2,
                    "te_support2": 3,
                    "read_count_lower": 2,
                    "read_count_upper": 10
                }}
            }}"#
        )
        .unwrap();

        let config = load_tool_config(&path).unwrap();
        let mcc = config.mcclintock.unwrap();
        assert_eq!(mcc.path.unwrap(), PathBuf::from("/opt/mcclintock"));
        assert_eq!(mcc.methods, vec!["temp", "telocate"]);
        assert_eq!(config.teflon.quality_threshold, 30);
        assert_eq!(config.teflon.stdev, Some(25));
        assert_eq!(config.teflon.coverage_cutoff, None);
        assert_eq!(config.teflon.read_count_upper, Some(10));
    }

    #[test]
    fn teflon_section_defaults_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"mcclintock": {"methods": ["temp"]}}"#).unwrap();

        let config = load_tool_config(&path).unwrap();
        assert_eq!(config.teflon.quality_threshold, 20);
        assert_eq!(config.teflon.te_support1, 1);
        assert!(config.teflon.read_count_upper.is_none());
    }

    #[test]
    fn rejects_malformed_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_tool_config(&path).is_err());
    }
}
