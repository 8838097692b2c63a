use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use pinch_volume::config::{
    AudioBackendKind, DetectorBackendKind, PinchVolumeConfig, LIVE_PIPELINE,
};
#[cfg(not(all(feature = "ingest-v4l2", feature = "backend-tract")))]
use pinch_volume::{
    ingest::{resolve_device, FrameSource, V4l2Config, V4l2Source},
    open_endpoint, select_detector, HandDetector, VolumeEndpoint, VolumeSink,
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "PINCH_VOLUME_CONFIG",
        "PINCH_VOLUME_CAMERA",
        "PINCH_VOLUME_DETECTOR",
        "PINCH_VOLUME_MODEL",
        "PINCH_VOLUME_AUDIO",
        "PINCH_VOLUME_SMOOTHING_WINDOW",
        "PINCH_VOLUME_HEADLESS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "camera": { "device": "/dev/video2", "width": 1280, "height": 720, "target_fps": 15 },
        "detector": { "backend": "synthetic", "min_confidence": 0.6 },
        "mapping": { "min_hand_distance": 30.0, "max_hand_distance": 180.0 },
        "smoothing": { "window": 7 },
        "audio": { "backend": "simulated", "min_db": -60.0, "max_db": 0.0, "threshold": 1.5 },
        "display": { "show_fps": false }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("PINCH_VOLUME_CONFIG", file.path());
    std::env::set_var("PINCH_VOLUME_CAMERA", "stub://desk?frames=10");
    std::env::set_var("PINCH_VOLUME_SMOOTHING_WINDOW", "3");
    std::env::set_var("PINCH_VOLUME_HEADLESS", "yes");

    let cfg = PinchVolumeConfig::load().expect("load config");

    assert_eq!(cfg.camera.device, "stub://desk?frames=10");
    assert_eq!(cfg.camera.width, 1280);
    assert_eq!(cfg.camera.height, 720);
    assert_eq!(cfg.camera.target_fps, 15);
    assert!(cfg.camera.mirror);
    assert_eq!(cfg.detector.backend, DetectorBackendKind::Synthetic);
    assert_eq!(cfg.detector.min_confidence, 0.6);
    assert_eq!(cfg.mapping.min_hand_distance, 30.0);
    assert_eq!(cfg.mapping.max_hand_distance, 180.0);
    assert_eq!(cfg.mapping.min_audible_percent, 10.0);
    assert_eq!(cfg.smoothing_window, 3);
    assert_eq!(cfg.audio.backend, AudioBackendKind::Simulated);
    assert_eq!(cfg.audio.min_db, -60.0);
    assert_eq!(cfg.audio.threshold, 1.5);
    assert!(!cfg.display.enabled);
    assert!(!cfg.display.show_fps);

    clear_env();
}

#[test]
fn loads_toml_config_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
        [detector]
        backend = "tract"
        model_path = "/opt/models/hand.onnx"

        [audio]
        backend = "pactl"
        sink = "alsa_output.usb"
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    std::env::set_var("PINCH_VOLUME_MODEL", "/tmp/other.onnx");

    let cfg = PinchVolumeConfig::load_from(file.path()).expect("load config");

    assert_eq!(cfg.detector.backend, DetectorBackendKind::Tract);
    assert_eq!(cfg.detector.model_path, PathBuf::from("/tmp/other.onnx"));
    assert_eq!(cfg.audio.backend, AudioBackendKind::Pactl);
    assert_eq!(cfg.audio.sink, "alsa_output.usb");
    assert_eq!(cfg.audio.max_db, 0.0);
    assert_eq!(cfg.smoothing_window, 5);

    clear_env();
}

#[test]
fn defaults_apply_without_a_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = PinchVolumeConfig::load().expect("load config");
    if LIVE_PIPELINE {
        assert_eq!(cfg.camera.device, "/dev/video0");
        assert_eq!(cfg.detector.backend, DetectorBackendKind::Tract);
        assert_eq!(cfg.audio.backend, AudioBackendKind::Pactl);
    } else {
        assert_eq!(cfg.camera.device, "stub://camera");
        assert_eq!(cfg.detector.backend, DetectorBackendKind::Synthetic);
        assert_eq!(cfg.audio.backend, AudioBackendKind::Simulated);
    }
    assert_eq!(cfg.audio.threshold, 0.8);
    assert!(cfg.display.enabled);
}

#[cfg(not(all(feature = "ingest-v4l2", feature = "backend-tract")))]
#[test]
fn default_config_opens_in_a_plain_build() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = PinchVolumeConfig::load().expect("load config");

    let endpoint = open_endpoint(&cfg.audio).expect("open endpoint");
    let sink = VolumeSink::open(endpoint, cfg.audio.threshold).expect("open sink");
    assert_eq!(sink.endpoint().name(), "simulated");

    let mut source = V4l2Source::open(V4l2Config {
        device: resolve_device(&cfg.camera.device),
        target_fps: cfg.camera.target_fps,
        width: cfg.camera.width,
        height: cfg.camera.height,
    })
    .expect("open camera");
    let frame = source.next_frame().expect("first frame");
    assert_eq!((frame.width, frame.height), (640, 480));

    let mut detector = select_detector(&cfg.detector).expect("select detector");
    detector.warm_up().expect("warm up");
    assert_eq!(detector.name(), "synthetic");
    detector
        .detect(frame.pixels(), frame.width, frame.height)
        .expect("detect");
}

#[test]
fn rejects_bad_env_values_and_invalid_files() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PINCH_VOLUME_DETECTOR", "mediapipe");
    assert!(PinchVolumeConfig::load().is_err());
    clear_env();

    std::env::set_var("PINCH_VOLUME_SMOOTHING_WINDOW", "0");
    assert!(PinchVolumeConfig::load().is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"{ \"mapping\": { \"min_hand_distance\": 300.0 } }")
        .expect("write config");
    assert!(PinchVolumeConfig::load_from(file.path()).is_err());

    clear_env();
}
