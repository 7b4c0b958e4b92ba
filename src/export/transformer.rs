use ndarray::{Ix1, Ix2};

use super::{
    descriptor::{Activation, LayerDescriptor, NetworkArtifact},
    layout::NativeWeight,
};
use crate::{
    ExportErr, Result,
    model::{NativeLayer, TrainedModel},
};

/// Converts a trained model's native parameters into canonical `LayerDescriptor`s.
#[derive(Debug, Default, Clone, Copy)]
pub struct LayoutTransformer;

impl LayoutTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Transforms every affine layer of `model`.
    ///
    /// # Arguments
    /// * `model` - The trained model.
    ///
    /// # Returns
    /// The canonical artifact, or a `ShapeMismatch` naming the first malformed layer.
    pub fn transform_model<M: TrainedModel>(&self, model: &M) -> Result<NetworkArtifact> {
        self.transform(&model.native_layers())
    }

    /// Transforms a list of native layers, in evaluation order.
    ///
    /// # Arguments
    /// * `layers` - The native `(out, in)` weights and `(out,)` biases.
    ///
    /// # Returns
    /// The canonical artifact, or a `ShapeMismatch` naming the first malformed layer.
    pub fn transform(&self, layers: &[NativeLayer<'_>]) -> Result<NetworkArtifact> {
        let nlayers = layers.len();
        let descriptors = layers
            .iter()
            .enumerate()
            .map(|(i, layer)| {
                self.transform_layer(i + 1, layer, Activation::for_position(i, nlayers))
            })
            .collect::<Result<Vec<_>>>()?;

        NetworkArtifact::new(descriptors)
    }

    fn transform_layer(
        &self,
        k: usize,
        layer: &NativeLayer<'_>,
        activation: Activation,
    ) -> Result<LayerDescriptor> {
        let weight = layer
            .weight
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| {
                ExportErr::shape(k, "weight", layer.weight.shape(), "a 2-D (out, in) matrix")
            })?;

        let bias = layer
            .bias
            .view()
            .into_dimensionality::<Ix1>()
            .map_err(|_| ExportErr::shape(k, "bias", layer.bias.shape(), "a 1-D (out,) vector"))?;

        let n_out = weight.nrows();
        if bias.len() != n_out {
            return Err(ExportErr::shape(
                k,
                "bias",
                bias.shape(),
                format!("({n_out},) to match the weight's out_features"),
            ));
        }

        let native = NativeWeight::new(weight.as_standard_layout().into_owned());
        Ok(LayerDescriptor::new(
            native.to_canonical(),
            bias.as_standard_layout().into_owned(),
            activation,
        ))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, ArrayD, IxDyn, array};

    use super::*;

    #[test]
    fn weights_are_transposed_and_biases_copied() {
        let w = array![[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]].into_dyn();
        let b = array![0.1f32, 0.2, 0.3].into_dyn();
        let w2 = array![[1.0f32, 1.0, 1.0]].into_dyn();
        let b2 = array![0.5f32].into_dyn();
        let layers = [
            NativeLayer::new(w.view(), b.view()),
            NativeLayer::new(w2.view(), b2.view()),
        ];

        let artifact = LayoutTransformer::new().transform(&layers).unwrap();
        let first = artifact.input_layer();

        assert_eq!(first.weight().view(), array![[1.0f32, 3.0, 5.0], [2.0, 4.0, 6.0]]);
        assert_eq!(first.bias(), array![0.1f32, 0.2, 0.3]);
        assert_eq!(first.activation(), Activation::Tanh);
        assert_eq!(artifact.output_layer().activation(), Activation::Identity);
        assert_eq!(artifact.output_layer().weight().shape(), [3, 1]);
    }

    #[test]
    fn one_dimensional_weight_is_a_shape_mismatch() {
        let w = Array1::<f32>::zeros(4).into_dyn();
        let b = Array1::<f32>::zeros(4).into_dyn();

        let res = LayoutTransformer::new().transform(&[NativeLayer::new(w.view(), b.view())]);
        assert!(matches!(
            res,
            Err(ExportErr::ShapeMismatch { layer: 1, what: "weight", .. })
        ));
    }

    #[test]
    fn two_dimensional_bias_is_a_shape_mismatch() {
        let w = ArrayD::<f32>::zeros(IxDyn(&[4, 2]));
        let b = ArrayD::<f32>::zeros(IxDyn(&[4, 1]));

        let res = LayoutTransformer::new().transform(&[NativeLayer::new(w.view(), b.view())]);
        assert!(matches!(
            res,
            Err(ExportErr::ShapeMismatch { layer: 1, what: "bias", .. })
        ));
    }

    #[test]
    fn out_features_must_agree() {
        let w = ArrayD::<f32>::zeros(IxDyn(&[4, 2]));
        let b = ArrayD::<f32>::zeros(IxDyn(&[3]));

        let res = LayoutTransformer::new().transform(&[NativeLayer::new(w.view(), b.view())]);
        assert!(matches!(
            res,
            Err(ExportErr::ShapeMismatch { layer: 1, what: "bias", got, .. }) if got == [3]
        ));
    }

    #[test]
    fn malformed_layer_is_reported_by_position() {
        let good_w = ArrayD::<f32>::zeros(IxDyn(&[4, 2]));
        let good_b = ArrayD::<f32>::zeros(IxDyn(&[4]));
        let bad_w = ArrayD::<f32>::zeros(IxDyn(&[4]));
        let bad_b = ArrayD::<f32>::zeros(IxDyn(&[1]));
        let layers = [
            NativeLayer::new(good_w.view(), good_b.view()),
            NativeLayer::new(bad_w.view(), bad_b.view()),
        ];

        let res = LayoutTransformer::new().transform(&layers);
        assert!(matches!(
            res,
            Err(ExportErr::ShapeMismatch { layer: 2, what: "weight", .. })
        ));
    }

    #[test]
    fn no_layers_is_an_empty_network() {
        assert!(matches!(
            LayoutTransformer::new().transform(&[]),
            Err(ExportErr::EmptyNetwork)
        ));
    }
}
