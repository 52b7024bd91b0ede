use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;

/// Read a JSON Lines table. Blank lines are ignored; any other line must
/// deserialize into `T`.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        rows.push(serde_json::from_str(&line)?);
    }
    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Write one JSON object per line, creating parent directories as needed.
pub fn write_jsonl<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// `{dir}/{stem}_{YYYYmmdd_HHMMSS}.jsonl`
pub fn timestamped_path(output_dir: &Path, stem: &str) -> PathBuf {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    output_dir.join(format!("{stem}_{timestamp}.jsonl"))
}

/// Persist a table under the output directory with a timestamped file name.
pub fn persist_table<T: Serialize>(rows: &[T], stem: &str, output_dir: &Path) -> Result<PathBuf> {
    let path = timestamped_path(output_dir, stem);
    write_jsonl(&path, rows)?;
    info!("💾 Saved {} rows to {}", rows.len(), path.display());
    Ok(path)
}
