use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::defs::PipelineError;

/// Resolves an input file to an absolute path, failing fast when it does
/// not exist. Used for required inputs before any state is written.
pub fn check_file_exists(path: &Path) -> Result<PathBuf, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::MissingInput(path.to_path_buf()));
    }
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir()?;
        Ok(cwd.join(path))
    }
}

/// Creates the full directory tree once; safe to call on an existing tree.
pub fn ensure_dir_tree(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Creates an empty file at `path` if absent, leaving existing content
/// untouched. Placeholder artifacts for the downstream build graph are
/// made this way.
pub fn touch(path: &Path) -> io::Result<()> {
    OpenOptions::new().create(true).append(true).open(path)?;
    Ok(())
}

/// Copies `src` to `dst` unless `dst` already exists. Returns whether a
/// copy happened.
pub fn copy_if_absent(src: &Path, dst: &Path) -> io::Result<bool> {
    if dst.exists() {
        return Ok(false);
    }
    fs::copy(src, dst)?;
    Ok(true)
}

/// Appends `msg` to the log file at `path`, creating it if needed.
pub fn append_log(path: &Path, msg: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(msg.as_bytes())
}

/// Derives a sibling path by stripping the final extension and appending
/// `ending`: `data/a1.sacCer.fasta` + `_1.fastq` -> `data/a1.sacCer_1.fastq`.
pub fn sibling_with_ending(path: &Path, ending: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}", stem, ending))
}

pub fn write_fastq_record(
    file: &mut File,
    id: &str,
    desc: Option<&str>,
    seq: &[u8],
    qual: &[u8],
) -> io::Result<()> {
    if let Some(desc) = desc {
        writeln!(file, "@{} {}", id, desc)?;
    } else {
        writeln!(file, "@{}", id)?;
    }
    file.write_all(seq)?;
    writeln!(file)?;
    writeln!(file, "+")?;
    file.write_all(qual)?;
    writeln!(file)?;
    Ok(())
}

pub fn write_fasta_record(
    file: &mut File,
    id: &str,
    desc: Option<&str>,
    seq: &[u8],
) -> io::Result<()> {
    if let Some(desc) = desc {
        writeln!(file, ">{} {}", id, desc)?;
    } else {
        writeln!(file, ">{}", id)?;
    }
    file.write_all(seq)?;
    writeln!(file)?;
    Ok(())
}
