use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use log::{debug, info};
use ndarray::{Array1, Array2};
use ndarray_npy::ReadNpyExt;

use super::{
    descriptor::{Activation, LayerDescriptor, NetworkArtifact},
    layout::CanonicalWeight,
    metadata::{METADATA_FILE, ShapeMetadata},
    writer::{bias_name, npy_file, weight_name},
};
use crate::{ExportErr, Result};

/// Reconstructs a `NetworkArtifact` from an artifact directory alone.
#[derive(Debug, Clone)]
pub struct ArtifactReader {
    dir: PathBuf,
}

impl ArtifactReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Reads the metadata record of the artifact directory.
    ///
    /// # Returns
    /// The validated metadata, or an error if it is missing, malformed or breaks an invariant.
    pub fn read_metadata(&self) -> Result<ShapeMetadata> {
        let path = self.dir.join(METADATA_FILE);
        let file = File::open(&path).map_err(|e| ExportErr::io(&path, e))?;
        let metadata: ShapeMetadata =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| ExportErr::Metadata {
                path: path.clone(),
                source: e,
            })?;

        metadata.validate()?;
        Ok(metadata)
    }

    /// Reads every layer listed in the metadata record, in the record's order.
    ///
    /// # Returns
    /// The reconstructed artifact, or an error if an array file is missing, unreadable or does
    /// not have the shape its metadata entry records.
    pub fn read(&self) -> Result<NetworkArtifact> {
        let metadata = self.read_metadata()?;
        let nlayers = metadata.layers().len();

        let layers = metadata
            .layers()
            .iter()
            .enumerate()
            .map(|(i, shapes)| {
                let k = i + 1;

                let weight: Array2<f32> = self.read_array(&weight_name(k))?;
                if weight.shape() != shapes.export_weight {
                    return Err(ExportErr::shape(
                        k,
                        "weight",
                        weight.shape(),
                        format!("{:?} as recorded in {METADATA_FILE}", shapes.export_weight),
                    ));
                }

                let bias: Array1<f32> = self.read_array(&bias_name(k))?;
                if bias.shape() != shapes.bias {
                    return Err(ExportErr::shape(
                        k,
                        "bias",
                        bias.shape(),
                        format!("{:?} as recorded in {METADATA_FILE}", shapes.bias),
                    ));
                }

                debug!("loaded {}: weight {:?}", shapes.name, shapes.export_weight);
                Ok(LayerDescriptor::new(
                    CanonicalWeight::new(weight),
                    bias,
                    Activation::for_position(i, nlayers),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        info!("loaded {nlayers} layers from {}", self.dir.display());
        NetworkArtifact::new(layers)
    }

    fn read_array<T: ReadNpyExt>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(npy_file(name));
        let file = File::open(&path).map_err(|e| ExportErr::io(&path, e))?;
        T::read_npy(BufReader::new(file)).map_err(|e| ExportErr::ReadNpy { path, source: e })
    }
}

/// Loads the artifact stored in `dir`.
pub fn load_artifact(dir: impl AsRef<Path>) -> Result<NetworkArtifact> {
    ArtifactReader::new(dir.as_ref()).read()
}
