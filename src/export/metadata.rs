use std::fmt;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};

use super::descriptor::layer_name;
use crate::{ExportErr, Result};

/// File name of the metadata record inside an artifact directory.
pub const METADATA_FILE: &str = "model_info.json";

/// The shapes recorded for one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerShapes {
    pub name: String,
    /// `(out, in)` as held by the training framework.
    pub native_weight: [usize; 2],
    /// `(in, out)` as stored in the artifact.
    pub export_weight: [usize; 2],
    pub bias: [usize; 1],
}

#[derive(Serialize, Deserialize)]
struct ShapesRecord {
    pytorch_weight: [usize; 2],
    saved_weight: [usize; 2],
    bias: [usize; 1],
}

impl LayerShapes {
    pub fn in_features(&self) -> usize {
        self.export_weight[0]
    }

    pub fn out_features(&self) -> usize {
        self.export_weight[1]
    }

    fn check(&self) -> Result<()> {
        let [n_out, n_in] = self.native_weight;
        if self.export_weight != [n_in, n_out] {
            return Err(self.invalid(format!(
                "saved weight {:?} is not the transpose of the native weight {:?}",
                self.export_weight, self.native_weight
            )));
        }

        if self.bias[0] != n_out {
            return Err(self.invalid(format!(
                "bias length {} does not match {n_out} output features",
                self.bias[0]
            )));
        }

        Ok(())
    }

    fn invalid(&self, reason: String) -> ExportErr {
        ExportErr::InvalidMetadata {
            layer: self.name.clone(),
            reason,
        }
    }
}

/// Shape metadata for every layer, in evaluation order.
///
/// Serialized as a JSON object keyed by layer name. Key order in the document is the layer order,
/// so (de)serialization goes through an ordered `Vec` instead of a map type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMetadata {
    layers: Vec<LayerShapes>,
}

impl ShapeMetadata {
    pub fn new(layers: Vec<LayerShapes>) -> Self {
        Self { layers }
    }

    pub fn layers(&self) -> &[LayerShapes] {
        &self.layers
    }

    /// Checks every invariant of the record.
    ///
    /// # Returns
    /// An error if the record is empty, a layer is named out of order, a layer breaks the
    /// transpose law or two consecutive layers cannot be chained.
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(ExportErr::EmptyNetwork);
        }

        for (i, layer) in self.layers.iter().enumerate() {
            let expected = layer_name(i + 1);
            if layer.name != expected {
                return Err(layer.invalid(format!(
                    "found at position {}, expected {expected} there",
                    i + 1
                )));
            }

            layer.check()?;

            if i > 0 {
                let prev = &self.layers[i - 1];
                if prev.out_features() != layer.in_features() {
                    return Err(layer.invalid(format!(
                        "takes {} inputs but {} produces {}",
                        layer.in_features(),
                        prev.name,
                        prev.out_features()
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Serialize for ShapeMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.layers.len()))?;
        for layer in &self.layers {
            let record = ShapesRecord {
                pytorch_weight: layer.native_weight,
                saved_weight: layer.export_weight,
                bias: layer.bias,
            };
            map.serialize_entry(&layer.name, &record)?;
        }

        map.end()
    }
}

impl<'de> Deserialize<'de> for ShapeMetadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = ShapeMetadata;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a map from layer name to its shapes")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut layers = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, record)) = access.next_entry::<String, ShapesRecord>()? {
                    layers.push(LayerShapes {
                        name,
                        native_weight: record.pytorch_weight,
                        export_weight: record.saved_weight,
                        bias: record.bias,
                    });
                }

                Ok(ShapeMetadata { layers })
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}
