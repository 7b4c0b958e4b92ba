use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{info, warn};
use ndarray::{ArrayBase, Data, Dimension};
use ndarray_npy::WriteNpyExt;

use super::{descriptor::NetworkArtifact, metadata::METADATA_FILE};
use crate::{ExportErr, Result};

const STAGING_DIR: &str = ".staging";

/// Returns the file name (without extension) of the `k`-th layer's weight, e.g. `layer1_weight`.
pub fn weight_name(k: usize) -> String {
    format!("layer{k}_weight")
}

/// Returns the file name (without extension) of the `k`-th layer's bias, e.g. `layer1_bias`.
pub fn bias_name(k: usize) -> String {
    format!("layer{k}_bias")
}

pub(crate) fn npy_file(name: &str) -> String {
    format!("{name}.npy")
}

/// Persists a `NetworkArtifact` as one `.npy` file per array plus a `model_info.json` record.
///
/// Every file is first written to a staging directory inside `dest`. Arrays are moved into place
/// once all of them were written and the metadata record is moved last, so a directory holding a
/// `model_info.json` always holds the full array set it describes. Layer arrays of an earlier,
/// deeper export are removed before the record is published.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dest: PathBuf,
}

impl ArtifactWriter {
    /// Creates a new `ArtifactWriter`.
    ///
    /// # Arguments
    /// * `dest` - The destination directory, created if absent.
    ///
    /// # Returns
    /// A new `ArtifactWriter` instance.
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self { dest: dest.into() }
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Writes the artifact.
    ///
    /// # Arguments
    /// * `artifact` - The canonical network to persist.
    ///
    /// # Returns
    /// The paths of the published files, metadata record last, or the first error found. On error
    /// the destination holds no metadata record, that is, no artifact.
    pub fn write(&self, artifact: &NetworkArtifact) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dest).map_err(|e| ExportErr::io(&self.dest, e))?;
        self.retract_previous()?;

        let staging = self.dest.join(STAGING_DIR);
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| ExportErr::io(&staging, e))?;
        }
        fs::create_dir(&staging).map_err(|e| ExportErr::io(&staging, e))?;

        let res = self
            .stage(artifact, &staging)
            .and_then(|staged| self.publish(&staging, staged));

        if let Err(e) = fs::remove_dir_all(&staging) {
            warn!("failed to clean up {}: {e}", staging.display());
        }

        let published = res?;
        info!(
            "exported {} layers to {}",
            artifact.len(),
            self.dest.display()
        );

        Ok(published)
    }

    /// Removes the metadata record of a previous export so a failed write leaves no artifact.
    fn retract_previous(&self) -> Result<()> {
        let record = self.dest.join(METADATA_FILE);
        match fs::remove_file(&record) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ExportErr::io(record, e)),
        }
    }

    fn stage(&self, artifact: &NetworkArtifact, staging: &Path) -> Result<Vec<String>> {
        let mut staged = Vec::with_capacity(2 * artifact.len() + 1);

        for (i, layer) in artifact.layers().iter().enumerate() {
            let k = i + 1;
            staged.push(write_array(staging, &weight_name(k), &layer.weight().view())?);
            staged.push(write_array(staging, &bias_name(k), &layer.bias())?);
        }

        let record = staging.join(METADATA_FILE);
        let json = serde_json::to_string_pretty(&artifact.metadata()).map_err(|e| {
            ExportErr::Metadata {
                path: record.clone(),
                source: e,
            }
        })?;

        let mut file = File::create(&record).map_err(|e| ExportErr::io(&record, e))?;
        writeln!(file, "{json}").map_err(|e| ExportErr::io(&record, e))?;
        file.sync_all().map_err(|e| ExportErr::io(&record, e))?;
        staged.push(METADATA_FILE.to_string());

        Ok(staged)
    }

    fn publish(&self, staging: &Path, mut staged: Vec<String>) -> Result<Vec<PathBuf>> {
        // Staged last, published last.
        let record = staged.pop();

        let mut published = staged
            .iter()
            .map(|file| self.publish_file(staging, file))
            .collect::<Result<Vec<_>>>()?;

        self.prune_stale(&staged)?;

        if let Some(record) = record {
            published.push(self.publish_file(staging, &record)?);
        }

        Ok(published)
    }

    fn publish_file(&self, staging: &Path, file: &str) -> Result<PathBuf> {
        let from = staging.join(file);
        let to = self.dest.join(file);
        fs::rename(&from, &to).map_err(|e| ExportErr::io(&to, e))?;
        Ok(to)
    }

    /// Removes layer arrays left by an earlier export that the new record doesn't describe.
    fn prune_stale(&self, current: &[String]) -> Result<()> {
        let entries = fs::read_dir(&self.dest).map_err(|e| ExportErr::io(&self.dest, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| ExportErr::io(&self.dest, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_layer_array(&name) || current.contains(&name) {
                continue;
            }

            let path = entry.path();
            fs::remove_file(&path).map_err(|e| ExportErr::io(&path, e))?;
            info!("removed stale {name}");
        }

        Ok(())
    }
}

/// Whether `file` is named like `layer{K}_weight.npy` or `layer{K}_bias.npy`.
fn is_layer_array(file: &str) -> bool {
    let Some(rest) = file.strip_prefix("layer") else {
        return false;
    };
    let Some(k) = rest
        .strip_suffix("_weight.npy")
        .or_else(|| rest.strip_suffix("_bias.npy"))
    else {
        return false;
    };

    !k.is_empty() && k.bytes().all(|b| b.is_ascii_digit())
}

fn write_array<S, D>(dir: &Path, name: &str, array: &ArrayBase<S, D>) -> Result<String>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    let file = npy_file(name);
    let path = dir.join(&file);

    let mut writer = BufWriter::new(File::create(&path).map_err(|e| ExportErr::io(&path, e))?);
    array
        .write_npy(&mut writer)
        .map_err(|e| ExportErr::WriteNpy {
            path: path.clone(),
            source: e,
        })?;
    writer
        .into_inner()
        .map_err(|e| ExportErr::io(&path, e.into_error()))?
        .sync_all()
        .map_err(|e| ExportErr::io(&path, e))?;

    info!("saved {name}: shape {:?}, dtype f32", array.shape());
    Ok(file)
}
