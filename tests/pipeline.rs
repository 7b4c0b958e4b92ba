use std::{fs, path::Path};

use pinn_export::{
    config::{Config, NetworkConfig},
    export::METADATA_FILE,
    model::TrainedModel,
    pinn::Pinn,
    pipeline,
};

fn tiny(dir: &Path) -> Config {
    let mut config = Config {
        model_path: dir.join("model.safetensors"),
        export_dir: dir.join("weights"),
        network: NetworkConfig {
            hidden_size: 16,
            ..Default::default()
        },
        ..Default::default()
    };
    config.training.epochs = 3;
    config.training.samples = 128;
    config.training.batch_size = 32;
    config.training.log_every = 1;
    config
}

#[test]
fn full_run_passes() {
    let dir = tempfile::tempdir().unwrap();
    let config = tiny(dir.path());

    let report = pipeline::run(&config, false).unwrap();

    assert!(report.passed());
    assert!(config.model_path.exists());
    assert!(config.export_dir.join(METADATA_FILE).exists());
    assert!(report.max_diff() < config.tolerance);
}

#[test]
fn skip_training_reuses_the_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let config = tiny(dir.path());

    pipeline::run(&config, false).unwrap();
    let checkpoint = fs::read(&config.model_path).unwrap();

    let report = pipeline::run(&config, true).unwrap();

    assert!(report.passed());
    assert_eq!(fs::read(&config.model_path).unwrap(), checkpoint);
}

#[test]
fn verified_model_is_the_checkpointed_one() {
    let dir = tempfile::tempdir().unwrap();
    let config = tiny(dir.path());

    let report = pipeline::run(&config, false).unwrap();
    let model = Pinn::load(&config.model_path).unwrap();

    let probe = &config.probes[0];
    assert_eq!(
        report.probes[0].original,
        model.predict(ndarray::array![[probe[0], probe[1]]].view()).unwrap()
    );
}

#[test]
fn config_file_drives_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let json = format!(
        r#"{{
            "model_path": {:?},
            "export_dir": {:?},
            "probes": [[15.0, 0.5], [8.0, 0.25]],
            "network": {{ "hidden_size": 8, "hidden_layers": 1 }},
            "training": {{
                "epochs": 2,
                "samples": 64,
                "batch_size": 16,
                "optimizer": {{ "gradient_descent": {{ "learning_rate": 0.001 }} }}
            }}
        }}"#,
        dir.path().join("m.safetensors"),
        dir.path().join("out"),
    );
    fs::write(&path, json).unwrap();

    let config = Config::load(&path).unwrap();
    let report = pipeline::run(&config, false).unwrap();

    assert!(report.passed());
    assert_eq!(report.probes.len(), 2);
    assert_eq!(Pinn::load(&config.model_path).unwrap().dims(), [2, 8, 1]);
    assert!(dir.path().join("out").join("layer2_weight.npy").exists());
    assert!(!dir.path().join("out").join("layer3_weight.npy").exists());
}
