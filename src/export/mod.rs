mod descriptor;
mod layout;
mod metadata;
mod reader;
mod transformer;
mod writer;

use std::path::Path;

pub use descriptor::{Activation, LayerDescriptor, NetworkArtifact, layer_name};
pub use layout::{CanonicalWeight, NativeWeight};
pub use metadata::{LayerShapes, METADATA_FILE, ShapeMetadata};
pub use reader::{ArtifactReader, load_artifact};
pub use transformer::LayoutTransformer;
pub use writer::{ArtifactWriter, bias_name, weight_name};

use crate::{Result, model::TrainedModel};

/// Transforms `model` into the export layout and writes it to `dest`.
///
/// Every layer is transformed before the first file is written, so a malformed layer leaves the
/// destination untouched.
///
/// # Arguments
/// * `model` - The trained model.
/// * `dest` - The artifact directory.
///
/// # Returns
/// The in-memory artifact that was written.
pub fn export_model<M: TrainedModel>(model: &M, dest: impl AsRef<Path>) -> Result<NetworkArtifact> {
    let artifact = LayoutTransformer::new().transform_model(model)?;
    ArtifactWriter::new(dest.as_ref()).write(&artifact)?;
    Ok(artifact)
}
