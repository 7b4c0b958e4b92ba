//! Safetensors checkpoints for a trained `Pinn`.
//!
//! Every layer `k` (0-based) is stored as two f32 tensors, `layers.{k}.weight` with shape
//! `(out, in)` and `layers.{k}.bias` with shape `(out,)`.

use std::{collections::HashMap, fs, path::Path};

use ndarray::{Array1, Array2};
use safetensors::{Dtype, SafeTensors, tensor::TensorView};

use super::{activations::ActFn, dense::Dense, model::Pinn};
use crate::{ExportErr, Result};

const FORMAT_KEY: &str = "format";
const FORMAT: &str = "pinn";

fn weight_key(k: usize) -> String {
    format!("layers.{k}.weight")
}

fn bias_key(k: usize) -> String {
    format!("layers.{k}.bias")
}

fn checkpoint_err(path: &Path, reason: impl Into<String>) -> ExportErr {
    ExportErr::Checkpoint {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

pub(super) fn save(pinn: &Pinn, path: &Path) -> Result<()> {
    let mut weights = Vec::with_capacity(pinn.layers().len());
    let mut biases = Vec::with_capacity(pinn.layers().len());

    for layer in pinn.layers() {
        let w = layer
            .weight()
            .to_slice()
            .ok_or(ExportErr::NonContiguous { what: "weight" })?;
        let b = layer
            .bias()
            .to_slice()
            .ok_or(ExportErr::NonContiguous { what: "bias" })?;
        weights.push((layer.weight().shape().to_vec(), w));
        biases.push((layer.bias().shape().to_vec(), b));
    }

    let mut tensors = Vec::with_capacity(2 * weights.len());
    for (k, ((w_shape, w), (b_shape, b))) in weights.into_iter().zip(biases).enumerate() {
        let w = TensorView::new(Dtype::F32, w_shape, bytemuck::cast_slice(w))
            .map_err(|e| checkpoint_err(path, e.to_string()))?;
        let b = TensorView::new(Dtype::F32, b_shape, bytemuck::cast_slice(b))
            .map_err(|e| checkpoint_err(path, e.to_string()))?;
        tensors.push((weight_key(k), w));
        tensors.push((bias_key(k), b));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ExportErr::io(parent, e))?;
    }

    let info = HashMap::from([(FORMAT_KEY.to_string(), FORMAT.to_string())]);
    safetensors::serialize_to_file(tensors, &Some(info), path)
        .map_err(|e| checkpoint_err(path, e.to_string()))
}

pub(super) fn load(path: &Path) -> Result<Pinn> {
    let bytes = fs::read(path).map_err(|e| ExportErr::io(path, e))?;

    let (_, header) =
        SafeTensors::read_metadata(&bytes).map_err(|e| checkpoint_err(path, e.to_string()))?;
    let format = header.metadata().as_ref().and_then(|m| m.get(FORMAT_KEY));
    if let Some(format) = format.filter(|&f| f != FORMAT) {
        return Err(checkpoint_err(path, format!("unknown format '{format}'")));
    }

    let tensors =
        SafeTensors::deserialize(&bytes).map_err(|e| checkpoint_err(path, e.to_string()))?;

    let nlayers = (0..)
        .take_while(|&k| tensors.tensor(&weight_key(k)).is_ok())
        .count();
    if nlayers == 0 {
        return Err(checkpoint_err(path, "no 'layers.0.weight' tensor"));
    }
    if tensors.len() != 2 * nlayers {
        return Err(checkpoint_err(
            path,
            format!("expected {} tensors, found {}", 2 * nlayers, tensors.len()),
        ));
    }

    let layers = (0..nlayers)
        .map(|k| {
            let weight = read_f32(&tensors, &weight_key(k), path)?;
            let bias = read_f32(&tensors, &bias_key(k), path)?;

            let [out, inp] = weight.0[..] else {
                return Err(checkpoint_err(path, format!("{} is not 2-D", weight_key(k))));
            };
            if bias.0 != [out] {
                return Err(checkpoint_err(
                    path,
                    format!("{} has shape {:?}, expected [{out}]", bias_key(k), bias.0),
                ));
            }

            let weight = Array2::from_shape_vec((out, inp), weight.1)
                .map_err(|e| checkpoint_err(path, e.to_string()))?;
            let act_fn = (k + 1 < nlayers).then_some(ActFn::Tanh);

            Dense::new(weight, Array1::from_vec(bias.1), act_fn)
        })
        .collect::<Result<Vec<_>>>()?;

    Pinn::from_layers(layers)
}

fn read_f32(tensors: &SafeTensors<'_>, name: &str, path: &Path) -> Result<(Vec<usize>, Vec<f32>)> {
    let view = tensors
        .tensor(name)
        .map_err(|_| checkpoint_err(path, format!("missing tensor '{name}'")))?;

    if view.dtype() != Dtype::F32 {
        return Err(checkpoint_err(
            path,
            format!("{name} has dtype {:?}, expected F32", view.dtype()),
        ));
    }

    Ok((view.shape().to_vec(), bytemuck::pod_collect_to_vec(view.data())))
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::model::TrainedModel;

    #[test]
    fn round_trip_keeps_every_parameter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        let net = Pinn::new(&[2, 16, 16, 1], &mut StdRng::seed_from_u64(5)).unwrap();

        net.save(&path).unwrap();
        let loaded = Pinn::load(&path).unwrap();

        assert_eq!(loaded.dims(), net.dims());
        for (a, b) in net.layers().iter().zip(loaded.layers()) {
            assert_eq!(a.weight(), b.weight());
            assert_eq!(a.bias(), b.bias());
            assert_eq!(a.act_fn(), b.act_fn());
        }

        let x = array![[15.0f32, 0.5]];
        assert_eq!(net.predict(x.view()).unwrap(), loaded.predict(x.view()).unwrap());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Pinn::load(&dir.path().join("nope.safetensors")).unwrap_err();
        assert!(matches!(err, ExportErr::Io { .. }));
    }

    #[test]
    fn garbage_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        fs::write(&path, b"definitely not safetensors").unwrap();

        assert!(matches!(
            Pinn::load(&path).unwrap_err(),
            ExportErr::Checkpoint { .. }
        ));
    }

    #[test]
    fn foreign_dtype_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        let w = [0.0f64; 4];
        let b = [0.0f64; 2];
        let tensors = [
            (
                weight_key(0),
                TensorView::new(Dtype::F64, vec![2, 2], bytemuck::cast_slice(&w)).unwrap(),
            ),
            (
                bias_key(0),
                TensorView::new(Dtype::F64, vec![2], bytemuck::cast_slice(&b)).unwrap(),
            ),
        ];
        safetensors::serialize_to_file(tensors, &None, &path).unwrap();

        assert!(matches!(
            Pinn::load(&path).unwrap_err(),
            ExportErr::Checkpoint { .. }
        ));
    }
}
