//! Study preparation from flight data folders.
//!
//! Every flight folder under the data root becomes a study: a copy of the
//! reference study with the flight's `.dbf` input tables laid over it.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;
use walkdir::WalkDir;

/// Create one study per flight folder under `data_root`. Returns the study names, sorted.
pub fn prepare_studies(data_root: &Path, studies_root: &Path, reference: &str) -> Result<Vec<String>> {
    let reference_dir = studies_root.join(reference);
    if !reference_dir.is_dir() {
        anyhow::bail!("reference study {} not found", reference_dir.display());
    }

    let mut flights = Vec::new();
    for entry in fs::read_dir(data_root)
        .with_context(|| format!("list flight folders in {}", data_root.display()))?
    {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            flights.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    flights.sort();

    info!("Creating study directories...");
    for flight in &flights {
        let dest = studies_root.join(flight);
        copy_tree(&reference_dir, &dest)
            .with_context(|| format!("copy reference study into {}", dest.display()))?;
        let copied = copy_inputs(&data_root.join(flight), &dest)?;
        info!(inputs = copied, "Study directory created for {flight}");
    }
    Ok(flights)
}

/// Recursive copy; existing files are overwritten.
fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

/// Copy the `.dbf` files of a flight folder (case-insensitive extension).
fn copy_inputs(flight_dir: &Path, dest: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in fs::read_dir(flight_dir)
        .with_context(|| format!("list inputs in {}", flight_dir.display()))?
    {
        let path = entry?.path();
        let is_dbf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("dbf"));
        if is_dbf && path.is_file() {
            if let Some(name) = path.file_name() {
                fs::copy(&path, dest.join(name))
                    .with_context(|| format!("copy {}", path.display()))?;
                copied += 1;
            }
        }
    }
    Ok(copied)
}
