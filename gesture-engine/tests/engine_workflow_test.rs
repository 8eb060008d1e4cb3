//! Integration tests for the recognition workflow
//!
//! Record -> train -> detect, plus the failure paths around training.

use gesture_engine::classifier::{fit, TrainingParams};
use gesture_engine::gestures::{GestureStore, MemoryStore};
use gesture_engine::{
    Classification, Config, EngineEvent, EngineState, PathSample, RecognitionEngine, Timestamp,
};
use glam::Vec3;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

const TRAINING_TIMEOUT: Duration = Duration::from_secs(60);

/// Left-to-right swipe with a small per-example wobble
fn swipe(variant: usize) -> Vec<Vec3> {
    let wobble = variant as f32 * 0.01;
    (0..20)
        .map(|i| {
            let x = i as f32 * 0.05;
            Vec3::new(x, wobble * (x * 6.0).sin(), 0.0)
        })
        .collect()
}

/// Full circle in the XY plane with a per-example radius
fn circle(variant: usize) -> Vec<Vec3> {
    let radius = 0.3 + variant as f32 * 0.02;
    (0..20)
        .map(|i| {
            let a = i as f32 / 19.0 * std::f32::consts::TAU;
            Vec3::new(radius * a.cos(), radius * a.sin(), 0.0)
        })
        .collect()
}

fn samples(points: &[Vec3], start_ms: u64) -> Vec<PathSample> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| PathSample::new(*p, Timestamp::from_millis(start_ms + i as u64 * 11)))
        .collect()
}

fn record(engine: &mut RecognitionEngine, gesture: &str, points: &[Vec3], start_ms: u64) {
    engine.enter_recording_target(gesture).unwrap();
    engine.contact_engaged().unwrap();
    for sample in samples(points, start_ms) {
        engine.push_sample(sample);
    }
    engine.contact_released().unwrap();
    engine.leave_to_main_menu().unwrap();
}

/// Engine with Swipe x5 and Circle x5 recorded
fn trained_bank_engine(config: Config) -> RecognitionEngine {
    let mut engine = RecognitionEngine::new(config).unwrap();
    engine.create_gesture(Some("Swipe")).unwrap();
    engine.create_gesture(Some("Circle")).unwrap();
    for variant in 0..5 {
        let start = variant as u64 * 1_000;
        record(&mut engine, "Swipe", &swipe(variant), start);
        record(&mut engine, "Circle", &circle(variant), start + 500);
    }
    engine
}

fn slow_training_config() -> Config {
    let mut config = Config::default();
    config.training.epochs = 50_000_000;
    config.training.target_loss = 0.0;
    config
}

#[test]
fn test_swipe_and_circle_end_to_end() {
    let mut engine = trained_bank_engine(Config::default());
    let events = engine.subscribe();
    assert_eq!(engine.examples("Swipe").unwrap().len(), 5);
    assert_eq!(engine.examples("Circle").unwrap().len(), 5);

    engine.select_classifier("net1").unwrap();
    engine.begin_training("net1").unwrap();
    assert_eq!(engine.state(), EngineState::Training);

    engine.wait_for_training(TRAINING_TIMEOUT).unwrap();
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(engine.is_trained("net1").unwrap());

    let received = events.drain();
    assert!(received.contains(&EngineEvent::TrainingStarted {
        classifier: "net1".to_string()
    }));
    assert!(received.contains(&EngineEvent::TrainingCompleted {
        classifier: "net1".to_string()
    }));

    let floor = engine.config().detection.confidence_floor;
    match engine.classify(&samples(&swipe(2), 0)).unwrap() {
        Classification::Match { label, confidence } => {
            assert_eq!(label, "Swipe");
            assert!(confidence >= floor, "confidence {} below floor", confidence);
        }
        other => panic!("Expected a Swipe match, got {:?}", other),
    }
    assert_eq!(
        engine.classify(&samples(&circle(1), 0)).unwrap().label(),
        Some("Circle")
    );
}

#[test]
fn test_classification_is_deterministic() {
    let mut engine = trained_bank_engine(Config::default());
    engine.select_classifier("net1").unwrap();
    engine.begin_training("net1").unwrap();
    engine.wait_for_training(TRAINING_TIMEOUT).unwrap();

    let path = samples(&swipe(3), 0);
    assert_eq!(engine.classify(&path).unwrap(), engine.classify(&path).unwrap());
}

#[test]
fn test_detect_mode_classifies_each_press() {
    let mut engine = trained_bank_engine(Config::default());
    engine.select_classifier("net1").unwrap();
    engine.begin_training("net1").unwrap();
    engine.wait_for_training(TRAINING_TIMEOUT).unwrap();

    let events = engine.subscribe();
    engine.begin_detect().unwrap();

    for (pass, points) in [swipe(1), circle(4)].iter().enumerate() {
        engine.contact_engaged().unwrap();
        for sample in samples(points, 10_000 + pass as u64 * 1_000) {
            engine.push_sample(sample);
        }
        assert!(engine.classify_in_progress().is_ok());
        engine.contact_released().unwrap();
        assert_eq!(engine.state(), EngineState::Detecting);
    }

    let detected: Vec<String> = events
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            EngineEvent::Detected { label, .. } => Some(label),
            _ => None,
        })
        .collect();
    assert_eq!(detected, vec!["Swipe".to_string(), "Circle".to_string()]);
    assert!(engine.detection_log().starts_with("Circle"));

    engine.end_detect().unwrap();
    assert_eq!(engine.state(), EngineState::Idle);
}

#[test]
fn test_detect_short_press_is_discarded() {
    let mut engine = trained_bank_engine(Config::default());
    engine.select_classifier("net1").unwrap();
    engine.begin_training("net1").unwrap();
    engine.wait_for_training(TRAINING_TIMEOUT).unwrap();

    let events = engine.subscribe();
    engine.begin_detect().unwrap();
    engine.contact_engaged().unwrap();
    engine.push_pose(Vec3::ZERO, Timestamp::from_millis(1));
    engine.contact_released().unwrap();

    assert!(events
        .drain()
        .contains(&EngineEvent::CaptureDiscarded { samples: 1, min: 10 }));
}

#[test]
fn test_classify_before_training_fails() {
    let mut engine = trained_bank_engine(Config::default());
    engine.select_classifier("net1").unwrap();
    assert!(matches!(
        engine.classify(&samples(&swipe(0), 0)),
        Err(gesture_engine::Error::NotTrained(_))
    ));
}

#[test]
fn test_training_empty_bank_fails() {
    let mut engine = RecognitionEngine::new(Config::default()).unwrap();
    assert!(matches!(
        engine.begin_training("net1"),
        Err(gesture_engine::Error::InsufficientData)
    ));
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(!engine.is_trained("net1").unwrap());
}

#[test]
fn test_single_gesture_trains_one_class_model() {
    let mut engine = RecognitionEngine::new(Config::default()).unwrap();
    engine.create_gesture(Some("Only")).unwrap();
    engine.create_gesture(Some("Empty")).unwrap();
    record(&mut engine, "Only", &swipe(0), 0);

    engine.select_classifier("net1").unwrap();
    engine.begin_training("net1").unwrap();
    engine.wait_for_training(TRAINING_TIMEOUT).unwrap();

    let result = engine.classify(&samples(&circle(0), 0)).unwrap();
    assert_eq!(result.label(), Some("Only"));
    assert!((result.confidence() - 1.0).abs() < 1e-6);
}

#[test]
fn test_begin_training_while_training_is_busy() {
    let mut engine = trained_bank_engine(slow_training_config());
    engine.begin_training("net1").unwrap();

    assert!(matches!(
        engine.begin_training("net1"),
        Err(gesture_engine::Error::Busy(ref name)) if name == "net1"
    ));
    assert_eq!(engine.state(), EngineState::Training);
    assert!(matches!(
        engine.begin_detect(),
        Err(gesture_engine::Error::InvalidTransition { .. })
    ));

    engine.abort_training().unwrap();
    assert_eq!(engine.state(), EngineState::Idle);
}

#[test]
fn test_abort_leaves_untrained_classifier_untrained() {
    let mut engine = trained_bank_engine(slow_training_config());
    let events = engine.subscribe();

    engine.begin_training("net1").unwrap();
    engine.abort_training().unwrap();

    assert_eq!(engine.state(), EngineState::Idle);
    assert!(!engine.is_trained("net1").unwrap());
    assert_eq!(engine.poll(), 0);
    assert!(events.drain().contains(&EngineEvent::TrainingAborted {
        classifier: "net1".to_string()
    }));
}

#[test]
fn test_abort_keeps_previous_model() {
    // Seed a store with a bank and a model trained on it
    let mut store = MemoryStore::new();
    let donor = trained_bank_engine(Config::default());
    store.save_bank(donor.bank()).unwrap();
    let model = fit(
        &donor.bank().snapshot(),
        &TrainingParams::default(),
        &AtomicBool::new(false),
    )
    .unwrap();
    store.save_model("net1", &model).unwrap();

    let mut engine = RecognitionEngine::open(slow_training_config(), store).unwrap();
    let registry = engine.registry();
    let before = registry.read().get("net1").and_then(|c| c.model()).unwrap();

    engine.begin_training("net1").unwrap();
    engine.abort_training().unwrap();

    let after = registry.read().get("net1").and_then(|c| c.model()).unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(*after, model);
}

#[test]
fn test_deleting_gesture_invalidates_trained_classifier() {
    let mut engine = trained_bank_engine(Config::default());
    engine.begin_training("net1").unwrap();
    engine.wait_for_training(TRAINING_TIMEOUT).unwrap();
    assert!(engine.is_trained("net1").unwrap());

    let events = engine.subscribe();
    engine.delete_gesture("Circle").unwrap();

    assert!(!engine.is_trained("net1").unwrap());
    assert_eq!(engine.list_gestures().collect::<Vec<_>>(), vec!["Swipe"]);
    assert!(events.drain().contains(&EngineEvent::ClassifiersInvalidated {
        classifiers: vec!["net1".to_string()]
    }));
}

#[test]
fn test_delete_missing_gesture_leaves_bank_unchanged() {
    let mut engine = trained_bank_engine(Config::default());
    assert!(matches!(
        engine.delete_gesture("Wave"),
        Err(gesture_engine::Error::NotFound(_))
    ));
    assert_eq!(engine.list_gestures().count(), 2);
    assert_eq!(engine.bank().example_count(), 10);
}

#[test]
fn test_delete_example_by_index() {
    let mut engine = trained_bank_engine(Config::default());
    let third = engine.examples("Swipe").unwrap()[2].clone();

    let removed = engine.delete_example("Swipe", 2).unwrap();
    assert_eq!(removed, third);
    assert_eq!(engine.examples("Swipe").unwrap().len(), 4);
    assert!(matches!(
        engine.delete_example("Swipe", 4),
        Err(gesture_engine::Error::IndexOutOfRange { index: 4, len: 4 })
    ));
}

#[test]
fn test_short_recording_never_appends() {
    let mut engine = RecognitionEngine::new(Config::default()).unwrap();
    engine.create_gesture(Some("Swipe")).unwrap();
    let events = engine.subscribe();

    let short: Vec<Vec3> = swipe(0).into_iter().take(9).collect();
    record(&mut engine, "Swipe", &short, 0);
    assert!(engine.examples("Swipe").unwrap().is_empty());

    let exact: Vec<Vec3> = swipe(0).into_iter().take(10).collect();
    record(&mut engine, "Swipe", &exact, 1_000);
    assert_eq!(engine.examples("Swipe").unwrap().len(), 1);

    let received = events.drain();
    assert!(received.contains(&EngineEvent::CaptureDiscarded { samples: 9, min: 10 }));
}

#[test]
fn test_out_of_order_samples_dropped_while_recording() {
    let mut engine = RecognitionEngine::new(Config::default()).unwrap();
    engine.create_gesture(Some("Swipe")).unwrap();
    engine.enter_recording_target("Swipe").unwrap();
    engine.contact_engaged().unwrap();

    for i in 0..12u64 {
        assert!(engine.push_pose(Vec3::new(i as f32, 0.0, 0.0), Timestamp::from_millis(100 + i)));
    }
    assert!(!engine.push_pose(Vec3::ZERO, Timestamp::from_millis(50)));
    assert_eq!(engine.capture_in_progress().map(|s| s.len()), Some(12));

    engine.contact_released().unwrap();
    assert_eq!(engine.examples("Swipe").unwrap()[0].len(), 12);
}
