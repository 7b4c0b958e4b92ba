use std::fs::File;

use ndarray::{Array2, array};
use ndarray_npy::WriteNpyExt;
use rand::{SeedableRng, rngs::StdRng};

use pinn_export::{
    ExportErr,
    export::{self, LayoutTransformer},
    model::TrainedModel,
    pinn::{BlackScholes, Pinn, TrainSettings, Trainer, optimization::Adam},
    verification::{DEFAULT_TOLERANCE, ReferenceEvaluator, VerificationController, Verdict},
};

fn trained_pinn() -> Pinn {
    let mut rng = StdRng::seed_from_u64(42);
    let model = Pinn::new(&[2, 64, 64, 1], &mut rng).unwrap();
    let settings = TrainSettings {
        epochs: 5,
        batch_size: 64,
        samples: 512,
        log_every: 0,
    };
    let mut trainer = Trainer::new(
        model,
        BlackScholes::default(),
        settings,
        |len| Adam::new(len, 1e-3, 0.9, 0.999, 1e-8),
        rng,
    )
    .unwrap();

    trainer.train().unwrap();
    trainer.into_model()
}

#[test]
fn reference_scenario_passes() {
    let dir = tempfile::tempdir().unwrap();
    let net = trained_pinn();

    export::export_model(&net, dir.path()).unwrap();
    let artifact = export::load_artifact(dir.path()).unwrap();
    let report = VerificationController::new(&net, &artifact, DEFAULT_TOLERANCE)
        .verify(&[[15.0f32, 0.5]])
        .unwrap();

    assert!(report.passed());
    assert_eq!(report.probes.len(), 1);
    assert_eq!(report.probes[0].original.dim(), (1, 1));
    assert!(report.probes[0].diff < 1e-6);
}

#[test]
fn both_paths_agree_on_a_batch() {
    let net = trained_pinn();
    let artifact = LayoutTransformer::new().transform_model(&net).unwrap();
    let x = array![
        [0.0f32, 0.0],
        [15.0, 0.5],
        [10.0, 1.0],
        [19.9, 0.01],
        [3.3, 0.75]
    ];

    let original = net.predict(x.view()).unwrap();
    let reconstructed = ReferenceEvaluator::new(&artifact).evaluate(x.view()).unwrap();

    assert_eq!(original.dim(), reconstructed.dim());
    let diff = (&original - &reconstructed)
        .iter()
        .fold(0.0f32, |acc, d| acc.max(d.abs()));
    assert!(diff < 1e-6, "diff {diff}");
}

#[test]
fn split_columns_evaluate_like_the_joined_input() {
    let net = trained_pinn();
    let artifact = LayoutTransformer::new().transform_model(&net).unwrap();
    let eval = ReferenceEvaluator::new(&artifact);

    let s = array![[15.0f32], [4.0]];
    let t = array![[0.5f32], [0.2]];
    let joined = array![[15.0f32, 0.5], [4.0, 0.2]];

    assert_eq!(
        eval.evaluate_columns(&[s.view(), t.view()]).unwrap(),
        eval.evaluate(joined.view()).unwrap()
    );
}

#[test]
fn zeroed_weight_file_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let net = trained_pinn();
    export::export_model(&net, dir.path()).unwrap();

    let file = File::create(dir.path().join("layer1_weight.npy")).unwrap();
    Array2::<f32>::zeros((2, 64)).write_npy(file).unwrap();

    let artifact = export::load_artifact(dir.path()).unwrap();
    let report = VerificationController::new(&net, &artifact, DEFAULT_TOLERANCE)
        .verify(&[[15.0f32, 0.5]])
        .unwrap();

    assert_eq!(report.verdict, Verdict::Fail);
    assert!(report.max_diff() > 0.0);
    assert!(matches!(
        report.into_result(),
        Err(ExportErr::VerificationFailed { .. })
    ));
}

#[test]
fn every_probe_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let net = trained_pinn();
    export::export_model(&net, dir.path()).unwrap();
    let artifact = export::load_artifact(dir.path()).unwrap();

    let probes = [vec![15.0f32, 0.5], vec![5.0, 0.1], vec![20.0, 0.9]];
    let report = VerificationController::new(&net, &artifact, DEFAULT_TOLERANCE)
        .verify(&probes)
        .unwrap();

    assert!(report.passed());
    assert_eq!(report.probes.len(), 3);
    for (p, input) in report.probes.iter().zip(&probes) {
        assert_eq!(&p.input, input);
        assert_eq!(p.original, net.predict(array![[input[0], input[1]]].view()).unwrap());
    }
}

#[test]
fn wrong_probe_width_is_an_error() {
    let net = trained_pinn();
    let artifact = LayoutTransformer::new().transform_model(&net).unwrap();

    assert!(
        VerificationController::new(&net, &artifact, DEFAULT_TOLERANCE)
            .verify(&[[15.0f32, 0.5, 1.0]])
            .is_err()
    );
}
