use ndarray::{Array1, Array2, ArrayView1};

use super::{
    layout::CanonicalWeight,
    metadata::{LayerShapes, ShapeMetadata},
};
use crate::{ExportErr, Result};

/// The squashing applied after a layer's affine map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Tanh,
    Identity,
}

impl Activation {
    /// Returns the activation a layer gets from its position: tanh for hidden layers, identity
    /// for the output layer.
    pub fn for_position(index: usize, nlayers: usize) -> Self {
        if index + 1 == nlayers {
            Activation::Identity
        } else {
            Activation::Tanh
        }
    }

    pub fn apply(self, z: Array2<f32>) -> Array2<f32> {
        match self {
            Activation::Tanh => z.mapv_into(f32::tanh),
            Activation::Identity => z,
        }
    }
}

/// Canonical representation of one affine layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDescriptor {
    weight: CanonicalWeight,
    bias: Array1<f32>,
    activation: Activation,
}

impl LayerDescriptor {
    pub(crate) fn new(weight: CanonicalWeight, bias: Array1<f32>, activation: Activation) -> Self {
        Self {
            weight,
            bias,
            activation,
        }
    }

    pub fn weight(&self) -> &CanonicalWeight {
        &self.weight
    }

    pub fn bias(&self) -> ArrayView1<'_, f32> {
        self.bias.view()
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn in_features(&self) -> usize {
        self.weight.in_features()
    }

    pub fn out_features(&self) -> usize {
        self.weight.out_features()
    }
}

/// The ordered collection of canonical layers, evaluation order first to last.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkArtifact {
    layers: Vec<LayerDescriptor>,
}

impl NetworkArtifact {
    /// Creates a new `NetworkArtifact`.
    ///
    /// # Arguments
    /// * `layers` - The layers in evaluation order.
    ///
    /// # Returns
    /// A new `NetworkArtifact`, or an error if there are no layers, a bias does not match its
    /// weight or two consecutive layers cannot be chained.
    pub fn new(layers: Vec<LayerDescriptor>) -> Result<Self> {
        if layers.is_empty() {
            return Err(ExportErr::EmptyNetwork);
        }

        for (i, layer) in layers.iter().enumerate() {
            let k = i + 1;
            if layer.bias.len() != layer.out_features() {
                return Err(ExportErr::shape(
                    k,
                    "bias",
                    layer.bias.shape(),
                    format!("({},)", layer.out_features()),
                ));
            }

            if let Some(prev) = i.checked_sub(1).map(|j| &layers[j]) {
                if prev.out_features() != layer.in_features() {
                    return Err(ExportErr::shape(
                        k,
                        "weight",
                        &layer.weight.shape(),
                        format!("({}, {})", prev.out_features(), layer.out_features()),
                    ));
                }
            }
        }

        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[LayerDescriptor] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// The layer consuming the raw input features.
    pub fn input_layer(&self) -> &LayerDescriptor {
        &self.layers[0]
    }

    /// The tanh layers between the input and output layers.
    pub fn hidden_layers(&self) -> &[LayerDescriptor] {
        match self.layers.len() {
            0..=2 => &[],
            n => &self.layers[1..n - 1],
        }
    }

    /// The identity layer producing the network output.
    pub fn output_layer(&self) -> &LayerDescriptor {
        &self.layers[self.layers.len() - 1]
    }

    pub fn input_features(&self) -> usize {
        self.input_layer().in_features()
    }

    pub fn output_features(&self) -> usize {
        self.output_layer().out_features()
    }

    /// Describes every layer's native, export and bias shapes.
    pub fn metadata(&self) -> ShapeMetadata {
        let entries = self
            .layers
            .iter()
            .enumerate()
            .map(|(i, layer)| {
                let [n_in, n_out] = layer.weight.shape();
                LayerShapes {
                    name: layer_name(i + 1),
                    native_weight: [n_out, n_in],
                    export_weight: [n_in, n_out],
                    bias: [layer.bias.len()],
                }
            })
            .collect();

        ShapeMetadata::new(entries)
    }
}

/// Returns the name of the `k`-th layer (1-indexed), e.g. `layer3`.
pub fn layer_name(k: usize) -> String {
    format!("layer{k}")
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn dense(n_in: usize, n_out: usize, activation: Activation) -> LayerDescriptor {
        LayerDescriptor::new(
            CanonicalWeight::new(Array2::zeros((n_in, n_out))),
            Array1::zeros(n_out),
            activation,
        )
    }

    #[test]
    fn only_the_last_layer_is_linear() {
        assert_eq!(Activation::for_position(0, 3), Activation::Tanh);
        assert_eq!(Activation::for_position(1, 3), Activation::Tanh);
        assert_eq!(Activation::for_position(2, 3), Activation::Identity);
        assert_eq!(Activation::for_position(0, 1), Activation::Identity);
    }

    #[test]
    fn role_accessors() {
        let artifact = NetworkArtifact::new(vec![
            dense(2, 64, Activation::Tanh),
            dense(64, 64, Activation::Tanh),
            dense(64, 1, Activation::Identity),
        ])
        .unwrap();

        assert_eq!(artifact.input_features(), 2);
        assert_eq!(artifact.output_features(), 1);
        assert_eq!(artifact.hidden_layers().len(), 1);
        assert_eq!(artifact.hidden_layers()[0].in_features(), 64);
    }

    #[test]
    fn single_layer_has_no_hidden_layers() {
        let artifact = NetworkArtifact::new(vec![dense(3, 1, Activation::Identity)]).unwrap();
        assert!(artifact.hidden_layers().is_empty());
        assert_eq!(artifact.input_layer(), artifact.output_layer());
    }

    #[test]
    fn empty_network_is_rejected() {
        assert!(matches!(
            NetworkArtifact::new(vec![]),
            Err(ExportErr::EmptyNetwork)
        ));
    }

    #[test]
    fn unchainable_layers_are_rejected() {
        let res = NetworkArtifact::new(vec![
            dense(2, 8, Activation::Tanh),
            dense(4, 1, Activation::Identity),
        ]);

        assert!(matches!(
            res,
            Err(ExportErr::ShapeMismatch { layer: 2, what: "weight", .. })
        ));
    }

    #[test]
    fn metadata_lists_layers_in_order() {
        let artifact = NetworkArtifact::new(vec![
            dense(2, 64, Activation::Tanh),
            dense(64, 64, Activation::Tanh),
            dense(64, 1, Activation::Identity),
        ])
        .unwrap();

        let metadata = artifact.metadata();
        let names: Vec<_> = metadata.layers().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["layer1", "layer2", "layer3"]);
        assert_eq!(metadata.layers()[0].native_weight, [64, 2]);
        assert_eq!(metadata.layers()[0].export_weight, [2, 64]);
        assert_eq!(metadata.layers()[2].bias, [1]);
    }

    #[test]
    fn tanh_squashes_identity_does_not() {
        let z = array![[0.0f32, 100.0, -100.0]];
        assert_eq!(Activation::Tanh.apply(z.clone()), array![[0.0f32, 1.0, -1.0]]);
        assert_eq!(Activation::Identity.apply(z.clone()), z);
    }
}
