use bead_mesh::{
    CancelToken, ColorStrategy, Lod, MeshError, MeshOutcome, MeshPipeline, MeshRequest,
    SweepConfig,
};
use bead_model::{
    BeadCrossSection, Calibration, CalibrationStore, FeedstockProfile, SampleSeries,
    ToolpathSample, VolumeConfig,
};
use config::constants::EngineConfig;
use glam::DVec3;
use std::sync::{Arc, Barrier};
use std::thread;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scenario_a(lod: Lod) -> MeshRequest {
    let series = SampleSeries::new(vec![
        ToolpathSample::new(0, DVec3::new(0.0, 0.0, 0.0), 100.0, 200.0).with_color(400.0),
        ToolpathSample::new(1, DVec3::new(10.0, 0.0, 0.0), 100.0, 200.0).with_color(410.0),
        ToolpathSample::new(2, DVec3::new(20.0, 0.0, 0.0), 100.0, 200.0).with_color(420.0),
    ])
    .unwrap();
    MeshRequest::new(
        series,
        FeedstockProfile::square(12.7).unwrap(),
        BeadCrossSection::new(2.0, 1.0).unwrap(),
        "Color",
        lod,
    )
}

fn spiral(n: u64) -> MeshRequest {
    let samples = (0..n)
        .map(|i| {
            let t = i as f64 * 0.1;
            ToolpathSample::new(i, DVec3::new(20.0 * t.cos(), 20.0 * t.sin(), t), 80.0, 150.0)
        })
        .collect();
    let series = SampleSeries::new(samples)
        .unwrap()
        .with_column("Temp", (0..n).map(|i| 400.0 + i as f64).collect())
        .unwrap();
    MeshRequest::new(
        series,
        FeedstockProfile::circular(3.0).unwrap(),
        BeadCrossSection::new(4.0, 0.5).unwrap(),
        "Temp",
        Lod::Medium,
    )
}

#[test]
fn scenario_a_mesh() {
    init();
    let pipeline = MeshPipeline::new(Arc::new(CalibrationStore::new()));
    let outcome = pipeline.generate(&scenario_a(Lod::High));

    let mesh = outcome.mesh().unwrap();
    assert_eq!(mesh.vertex_count(), 72);
    assert_eq!(mesh.face_count(), 96);
    assert!(mesh.validate().is_ok());

    let thickness = (80.645 - std::f64::consts::PI) / 2.0;
    let (min, max) = mesh.bounding_box().unwrap();
    assert!((max.z - min.z - thickness).abs() < 1e-9);
    assert!((thickness - 38.75).abs() < 0.01);

    let colors: Vec<f64> = mesh.vertex_colors().chunks(24).map(|ring| ring[0]).collect();
    assert_eq!(colors, vec![400.0, 410.0, 420.0]);
}

#[test]
fn scenario_a_clamped_by_max_thickness() {
    init();
    let pipeline = MeshPipeline::with_config(
        Arc::new(CalibrationStore::new()),
        &EngineConfig::default(),
        VolumeConfig::new(0.05, Some(10.0)).unwrap(),
        SweepConfig::default(),
    )
    .unwrap();
    let outcome = pipeline.generate(&scenario_a(Lod::High));
    let (min, max) = outcome.mesh().unwrap().bounding_box().unwrap();
    assert!((max.z - min.z - 10.0).abs() < 1e-9);
}

#[test]
fn scenario_c_calibration_bump_recomputes() {
    init();
    let store = Arc::new(CalibrationStore::new());
    let pipeline = MeshPipeline::new(Arc::clone(&store));
    let request = scenario_a(Lod::Medium);

    let before = pipeline.generate(&request);
    let again = pipeline.generate(&request);
    assert_eq!(pipeline.cache().stats().computations, 1);
    assert!(Arc::ptr_eq(before.mesh().unwrap(), again.mesh().unwrap()));

    store.set(Calibration::new(1.654, 1.0, 0.0).unwrap()).unwrap();
    let after = pipeline.generate(&request);

    assert_eq!(pipeline.cache().stats().computations, 2);
    assert_ne!(before, after);
    // Wider bead after calibration
    let width = |outcome: &MeshOutcome| {
        let (min, max) = outcome.mesh().unwrap().bounding_box().unwrap();
        max.y - min.y
    };
    assert!(width(&after) > width(&before));
}

#[test]
fn calibration_reset_is_a_new_version() {
    init();
    let store = Arc::new(CalibrationStore::new());
    let pipeline = MeshPipeline::new(Arc::clone(&store));
    let request = scenario_a(Lod::Low);

    pipeline.generate(&request);
    store.reset();
    pipeline.generate(&request);

    // Same parameters, new version: still a miss
    assert_eq!(pipeline.cache().stats().computations, 2);
}

#[test]
fn lod_and_column_are_part_of_the_key() {
    init();
    let pipeline = MeshPipeline::new(Arc::new(CalibrationStore::new()));
    let request = spiral(200);

    let low = pipeline.generate(&request.with_lod(Lod::Low));
    let medium = pipeline.generate(&request);
    let high = pipeline.generate(&request.with_lod(Lod::High));
    let by_z = pipeline.generate(&MeshRequest {
        color_column: "ZPos".to_string(),
        ..request.clone()
    });

    assert_eq!(pipeline.cache().stats().computations, 4);
    let count = |o: &MeshOutcome| o.mesh().unwrap().vertex_count();
    assert!(count(&high) >= count(&medium) && count(&medium) >= count(&low));
    assert_eq!(count(&medium), count(&by_z));
    assert_ne!(
        medium.mesh().unwrap().vertex_colors(),
        by_z.mesh().unwrap().vertex_colors()
    );
}

#[test]
fn sweep_config_changes_the_key() {
    init();
    let request = spiral(50);
    let store = Arc::new(CalibrationStore::new());
    let per_ring = MeshPipeline::new(Arc::clone(&store));
    let window_mean = MeshPipeline::with_config(
        store,
        &EngineConfig::default(),
        VolumeConfig::default(),
        SweepConfig {
            color_strategy: ColorStrategy::WindowMean,
            ..SweepConfig::default()
        },
    )
    .unwrap();

    let a = per_ring.generate(&request);
    let b = window_mean.generate(&request);
    assert_ne!(
        per_ring.fingerprint(&request, &Calibration::identity()),
        window_mean.fingerprint(&request, &Calibration::identity())
    );
    assert_eq!(a.mesh().unwrap().faces(), b.mesh().unwrap().faces());
    assert_ne!(a, b);
}

#[test]
fn generation_is_idempotent_across_pipelines() {
    init();
    let request = spiral(300);
    let first = MeshPipeline::new(Arc::new(CalibrationStore::new())).generate(&request);
    let second = MeshPipeline::new(Arc::new(CalibrationStore::new())).generate(&request);
    assert_eq!(first, second);
}

#[test]
fn all_inactive_is_empty() {
    init();
    let series = SampleSeries::new(
        (0..10)
            .map(|i| ToolpathSample::new(i, DVec3::new(i as f64, 0.0, 0.0), 50.0, 0.0))
            .collect(),
    )
    .unwrap();
    let request = MeshRequest::new(
        series,
        FeedstockProfile::square(10.0).unwrap(),
        BeadCrossSection::new(2.0, 1.0).unwrap(),
        "XPos",
        Lod::High,
    );
    let pipeline = MeshPipeline::new(Arc::new(CalibrationStore::new()));
    assert_eq!(pipeline.generate(&request), MeshOutcome::Empty);
    // Empty results are cached too
    assert_eq!(pipeline.generate(&request), MeshOutcome::Empty);
    assert_eq!(pipeline.cache().stats().computations, 1);
}

#[test]
fn structural_errors_surface() {
    init();
    let pipeline = MeshPipeline::new(Arc::new(CalibrationStore::new()));

    let unknown = MeshRequest {
        color_column: "Pressure".to_string(),
        ..scenario_a(Lod::Low)
    };
    assert_eq!(
        pipeline.generate(&unknown),
        MeshOutcome::Error(MeshError::UnknownColumn {
            name: "Pressure".to_string()
        })
    );

    let colorless = MeshRequest {
        series: SampleSeries::new(
            (0..3)
                .map(|i| ToolpathSample::new(i, DVec3::new(i as f64, 0.0, 0.0), 100.0, 200.0))
                .collect(),
        )
        .unwrap(),
        ..scenario_a(Lod::Low)
    };
    assert_eq!(
        pipeline.generate(&colorless),
        MeshOutcome::Error(MeshError::UnknownColumn {
            name: "Color".to_string()
        })
    );
    assert_eq!(pipeline.cache().stats().computations, 0);
}

#[test]
fn empty_series_is_empty() {
    init();
    let pipeline = MeshPipeline::new(Arc::new(CalibrationStore::new()));
    let empty = MeshRequest {
        series: SampleSeries::new(Vec::new()).unwrap(),
        ..scenario_a(Lod::Low)
    };
    assert_eq!(pipeline.generate(&empty), MeshOutcome::Empty);
    assert_eq!(pipeline.cache().stats().computations, 1);
}

#[test]
fn invalid_samples_do_not_abort_the_build() {
    init();
    let series = SampleSeries::new(vec![
        ToolpathSample::new(0, DVec3::ZERO, 100.0, 200.0),
        ToolpathSample::new(1, DVec3::new(f64::NAN, 0.0, 0.0), 100.0, 200.0),
        ToolpathSample::new(2, DVec3::new(5.0, 0.0, 0.0), f64::INFINITY, 200.0),
        ToolpathSample::new(3, DVec3::new(10.0, 0.0, 0.0), 100.0, 200.0),
    ])
    .unwrap();
    let request = MeshRequest::new(
        series,
        FeedstockProfile::square(12.7).unwrap(),
        BeadCrossSection::new(2.0, 1.0).unwrap(),
        "FeedVel",
        Lod::High,
    );
    let outcome = MeshPipeline::new(Arc::new(CalibrationStore::new())).generate(&request);
    let mesh = outcome.mesh().unwrap();
    assert_eq!(mesh.vertex_count(), 2 * 24);
    assert!(mesh.validate().is_ok());
}

#[test]
fn concurrent_identical_requests_compute_once() {
    init();
    let pipeline = Arc::new(MeshPipeline::new(Arc::new(CalibrationStore::new())));
    let request = Arc::new(spiral(20_000));
    let barrier = Arc::new(Barrier::new(6));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            let request = Arc::clone(&request);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                pipeline.generate(&request)
            })
        })
        .collect();

    let outcomes: Vec<MeshOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(pipeline.cache().stats().computations, 1);
    let first = outcomes[0].mesh().unwrap();
    assert!(outcomes.iter().all(|o| Arc::ptr_eq(o.mesh().unwrap(), first)));
}

#[test]
fn cancelled_builds_are_not_cached() {
    init();
    let pipeline = MeshPipeline::new(Arc::new(CalibrationStore::new()));
    let request = spiral(100);
    let token = CancelToken::new();
    token.cancel();

    assert_eq!(
        pipeline.generate_cancellable(&request, &token),
        MeshOutcome::Error(MeshError::Cancelled)
    );
    assert!(pipeline.cache().is_empty());
    assert!(pipeline.generate(&request).is_success());
}

#[test]
fn plot_requests_complete_when_uncontested() {
    init();
    let pipeline = MeshPipeline::new(Arc::new(CalibrationStore::new()));
    let outcome = pipeline.generate_for_plot("layer-1", &scenario_a(Lod::Low));
    assert!(outcome.is_success());
    // Stride 4 keeps the first and last samples
    assert_eq!(outcome.into_result().unwrap().unwrap().vertex_count(), 2 * 12);
    assert_eq!(pipeline.cache().stats().computations, 1);
}
