//! Run export helpers.
//!
//! Serde already provides the JSON form of a [`RunResult`]; this module
//! handles files and the plain-text grid rendering used for quick
//! inspection (one snapshot per line, `.` susceptible, `#` infected,
//! `o` recovered).

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{EpiError, EpiResult};
use crate::simulation::RunResult;

/// Writes `result` as pretty JSON to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns `EpiError::Internal` on I/O or serialization failure.
pub fn write_json(result: &RunResult, path: impl AsRef<Path>) -> EpiResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| io_error("create", path, &e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, result)
        .map_err(|e| EpiError::internal(format!("serialize run: {e}")))?;
    writer.write_all(b"\n").map_err(|e| io_error("write", path, &e))?;
    writer.flush().map_err(|e| io_error("flush", path, &e))?;
    Ok(())
}

/// Reads a run previously written by [`write_json`].
///
/// # Errors
///
/// `EpiError::Internal` if the file cannot be opened, `EpiError::Config` if
/// it does not hold a run.
pub fn read_json(path: impl AsRef<Path>) -> EpiResult<RunResult> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| io_error("open", path, &e))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| EpiError::config(format!("deserialize run from {}: {e}", path.display())))
}

/// Renders every snapshot as `t<TAB>cells`, one per line.
///
/// # Errors
///
/// Returns `EpiError::Internal` if the writer fails.
pub fn write_grid_text<W: Write>(result: &RunResult, mut out: W) -> EpiResult<()> {
    for snap in &result.snapshots {
        writeln!(out, "{:>10.3}\t{}", snap.t, snap.grid)
            .map_err(|e| EpiError::internal(format!("write grid text: {e}")))?;
    }
    out.flush()
        .map_err(|e| EpiError::internal(format!("write grid text: {e}")))
}

fn io_error(action: &str, path: &Path, e: &std::io::Error) -> EpiError {
    EpiError::internal(format!("{action} {}: {e}", path.display()))
}
