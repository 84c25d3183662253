// src/utils/fastx.rs: FASTA index helpers

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::defs::PipelineError;

/// Index path `samtools faidx` writes next to a reference.
pub fn fai_path(reference: &Path) -> PathBuf {
    let mut name = reference
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".fai");
    reference.with_file_name(name)
}

/// Sums the per-contig lengths (column 2) of a `.fai` index.
pub fn total_length_from_fai(fai: &Path) -> Result<u64, PipelineError> {
    let content = fs::read_to_string(fai)?;
    let mut total = 0u64;
    for line in content.lines() {
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let name = fields.next();
        let length = fields
            .next()
            .and_then(|f| f.parse::<u64>().ok())
            .ok_or_else(|| {
                PipelineError::InvalidConfig(format!(
                    "malformed fai line for {:?} in {}",
                    name,
                    fai.display()
                ))
            })?;
        total += length;
    }
    Ok(total)
}
