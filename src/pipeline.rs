use log::info;
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    Result,
    config::Config,
    export::{self, NetworkArtifact},
    model::TrainedModel,
    pinn::{Pinn, Trainer},
    verification::{VerificationController, VerificationReport},
};

/// Trains a `Pinn` as configured and saves its checkpoint to `config.model_path`.
///
/// # Returns
/// The trained model and its per-epoch losses.
pub fn train(config: &Config) -> Result<(Pinn, Vec<f32>)> {
    let training = &config.training;
    let mut rng = StdRng::seed_from_u64(training.seed);

    let dims = config.network.dims();
    info!("building network {dims:?}");
    let model = Pinn::new(&dims, &mut rng)?;

    let optimizer = training.optimizer;
    let mut trainer = Trainer::new(
        model,
        config.black_scholes,
        training.settings(),
        |len| optimizer.build(len),
        rng,
    )?;
    let losses = trainer.train()?;
    let model = trainer.into_model();

    model.save(&config.model_path)?;
    info!("saved checkpoint to {}", config.model_path.display());

    Ok((model, losses))
}

/// Exports the checkpointed model and verifies the artifact on disk against it.
///
/// # Returns
/// The reloaded artifact and the verification report.
pub fn export_and_verify<M: TrainedModel>(
    model: &M,
    config: &Config,
) -> Result<(NetworkArtifact, VerificationReport)> {
    export::export_model(model, &config.export_dir)?;
    info!("exported weights to {}", config.export_dir.display());

    let artifact = export::load_artifact(&config.export_dir)?;
    let report =
        VerificationController::new(model, &artifact, config.tolerance).verify(&config.probes)?;

    Ok((artifact, report))
}

/// Runs a whole `pinn-export` invocation.
///
/// # Arguments
/// * `config` - A validated config.
/// * `skip_training` - Reuse the checkpoint that already sits at `config.model_path`.
///
/// # Returns
/// The verification report, or an error if any stage before the verdict failed.
pub fn run(config: &Config, skip_training: bool) -> Result<VerificationReport> {
    if skip_training {
        info!("skipping training, reusing {}", config.model_path.display());
    } else {
        train(config)?;
    }

    // Exported from the checkpoint, not the in-memory model, so the persisted state is what's
    // verified.
    let model = Pinn::load(&config.model_path)?;
    let (_, report) = export_and_verify(&model, config)?;

    let demo = config.probes.first().and_then(|p| <[f32; 2]>::try_from(p.as_slice()).ok());
    if let Some([s, t]) = demo {
        let price = model.price(s, t)?;
        info!("prediction for S={s}, t={t}: {price:.6}");
    }

    Ok(report)
}
