use std::path::Path;
use std::sync::atomic::AtomicBool;

use tempfile::TempDir;

use frame_sorter::detect::FixedBackend;
use frame_sorter::{
    ingest, run_pipeline, sort_video, DetectorSettings, ErrorKind, FailurePolicy, Frame,
    FrameSource, PipelineSettings, SavedFrame,
};

/// Serves `good_frames` small frames, then fails to decode.
struct CorruptAfter {
    good_frames: u64,
    served: u64,
}

impl FrameSource for CorruptAfter {
    fn frame_rate(&self) -> f64 {
        1.0
    }

    fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
        if self.served >= self.good_frames {
            anyhow::bail!("corrupt packet at frame {}", self.served);
        }
        self.served += 1;
        Frame::new(4, 4, vec![128; 4 * 4 * 3]).map(Some)
    }
}

fn settings(output: &Path, target_fps: f64) -> PipelineSettings {
    PipelineSettings {
        output_dir: output.to_path_buf(),
        target_fps,
        width: 64,
        height: 38,
        ..PipelineSettings::default()
    }
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn expected_names(count: u64) -> Vec<String> {
    (0..count).map(|i| format!("frame_{:05}.jpg", i)).collect()
}

#[test]
fn sorts_sampled_frames_into_confidence_bucket() {
    let out = TempDir::new().expect("temp output");
    let pipeline = PipelineSettings {
        output_dir: out.path().to_path_buf(),
        target_fps: 2.0,
        ..PipelineSettings::default()
    };
    let cancel = AtomicBool::new(false);

    let summary = sort_video(
        "stub://100@10",
        &DetectorSettings::fixed(vec![0.73]),
        &pipeline,
        &cancel,
        |_| {},
    )
    .expect("sort video");

    assert_eq!(summary.sampling_interval, 5);
    assert_eq!(summary.frames_read, 100);
    assert_eq!(summary.frames_sampled, 20);
    assert_eq!(summary.frames_saved, 20);
    assert!(!summary.cancelled);
    assert_eq!(file_names(out.path()), vec!["0.7-0.8".to_string()]);

    let bucket = out.path().join("0.7-0.8");
    assert_eq!(file_names(&bucket), expected_names(20));
    let dims = image::image_dimensions(bucket.join("frame_00007.jpg")).expect("jpeg dims");
    assert_eq!(dims, (640, 380));
}

#[test]
fn thirty_fps_source_sampled_at_three_fps() {
    let out = TempDir::new().expect("temp output");
    let cancel = AtomicBool::new(false);

    let summary = sort_video(
        "stub://100@30",
        &DetectorSettings::fixed(vec![0.42]),
        &settings(out.path(), 3.0),
        &cancel,
        |_| {},
    )
    .expect("sort video");

    assert_eq!(summary.sampling_interval, 10);
    assert_eq!(summary.frames_saved, 10);
    assert_eq!(file_names(&out.path().join("0.4-0.5")), expected_names(10));
}

#[test]
fn frames_without_detections_go_to_no_detections() {
    let out = TempDir::new().expect("temp output");
    let cancel = AtomicBool::new(false);

    let summary = sort_video(
        "stub://6@3",
        &DetectorSettings::fixed(Vec::new()),
        &settings(out.path(), 3.0),
        &cancel,
        |_| {},
    )
    .expect("sort video");

    assert_eq!(summary.frames_saved, 6);
    assert_eq!(file_names(out.path()), vec!["no_detections".to_string()]);
    assert_eq!(summary.bucket_counts.get("no_detections"), Some(&6));
}

#[test]
fn second_run_overwrites_the_same_files() {
    let out = TempDir::new().expect("temp output");
    let cancel = AtomicBool::new(false);
    let detector = DetectorSettings::fixed(vec![0.73]);
    let pipeline = settings(out.path(), 2.0);

    for _ in 0..2 {
        let summary = sort_video("stub://100@10", &detector, &pipeline, &cancel, |_| {})
            .expect("sort video");
        assert_eq!(summary.frames_saved, 20);
    }

    assert_eq!(file_names(out.path()), vec!["0.7-0.8".to_string()]);
    assert_eq!(file_names(&out.path().join("0.7-0.8")), expected_names(20));
}

#[test]
fn frame_numbers_are_shared_across_buckets() {
    let out = TempDir::new().expect("temp output");
    let cancel = AtomicBool::new(false);
    let mut detector = FixedBackend::scripted(vec![vec![0.95], vec![0.1], vec![], vec![0.2, 0.73]]);
    let mut source = ingest::open("stub://8@1").expect("open stub");
    let mut seen: Vec<SavedFrame> = Vec::new();

    let summary = run_pipeline(
        &settings(out.path(), 1.0),
        &mut detector,
        source.as_mut(),
        &cancel,
        |saved| seen.push(saved.clone()),
    )
    .expect("run pipeline");

    assert_eq!(summary.frames_saved, 8);
    assert_eq!(
        file_names(out.path()),
        vec!["0.1-0.2", "0.7-0.8", "0.9-1.0", "no_detections"]
    );
    assert_eq!(
        file_names(&out.path().join("0.9-1.0")),
        vec!["frame_00000.jpg", "frame_00004.jpg"]
    );
    assert_eq!(
        file_names(&out.path().join("0.1-0.2")),
        vec!["frame_00001.jpg", "frame_00005.jpg"]
    );
    assert_eq!(
        file_names(&out.path().join("no_detections")),
        vec!["frame_00002.jpg", "frame_00006.jpg"]
    );
    assert_eq!(
        file_names(&out.path().join("0.7-0.8")),
        vec!["frame_00003.jpg", "frame_00007.jpg"]
    );

    let indices: Vec<u64> = seen.iter().map(|s| s.saved_index).collect();
    assert_eq!(indices, (0..8).collect::<Vec<_>>());
    assert_eq!(seen[2].max_confidence, None);
    assert_eq!(seen[3].max_confidence, Some(0.73));
    assert_eq!(seen[3].path, out.path().join("0.7-0.8").join("frame_00003.jpg"));
}

#[test]
fn missing_video_is_source_unavailable() {
    let out = TempDir::new().expect("temp output");
    let cancel = AtomicBool::new(false);

    let err = sort_video(
        "/nonexistent/dir/clip.mp4",
        &DetectorSettings::fixed(vec![0.9]),
        &settings(out.path(), 3.0),
        &cancel,
        |_| {},
    )
    .unwrap_err();

    assert_eq!(err.kind, ErrorKind::SourceUnavailable);
    assert!(file_names(out.path()).is_empty());
}

#[test]
fn missing_model_is_detector_load_error() {
    let out = TempDir::new().expect("temp output");
    let cancel = AtomicBool::new(false);
    let detector = DetectorSettings {
        model_path: out.path().join("missing.onnx"),
        ..DetectorSettings::default()
    };

    let err = sort_video(
        "stub://10@10",
        &detector,
        &settings(out.path(), 3.0),
        &cancel,
        |_| {},
    )
    .unwrap_err();

    assert_eq!(err.kind, ErrorKind::DetectorLoad);
    assert!(file_names(out.path()).is_empty());
}

#[test]
fn invalid_settings_are_rejected_before_work() {
    let out = TempDir::new().expect("temp output");
    let cancel = AtomicBool::new(false);
    let pipeline = PipelineSettings {
        jpeg_quality: 0,
        ..settings(out.path(), 3.0)
    };

    let err = sort_video(
        "stub://10@10",
        &DetectorSettings::fixed(vec![0.9]),
        &pipeline,
        &cancel,
        |_| {},
    )
    .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Config);
    assert!(file_names(out.path()).is_empty());
}

#[test]
fn skip_policy_keeps_saved_numbering_contiguous() {
    let out = TempDir::new().expect("temp output");
    let cancel = AtomicBool::new(false);
    let mut detector = FixedBackend::new(vec![0.5]).failing_on(1);
    let mut source = ingest::open("stub://5@1").expect("open stub");
    let pipeline = PipelineSettings {
        failure_policy: FailurePolicy::Skip,
        ..settings(out.path(), 1.0)
    };
    let mut seen = Vec::new();

    let summary = run_pipeline(&pipeline, &mut detector, source.as_mut(), &cancel, |saved| {
        seen.push((saved.saved_index, saved.source_index))
    })
    .expect("run pipeline");

    assert_eq!(summary.frames_sampled, 5);
    assert_eq!(summary.frames_failed, 1);
    assert_eq!(summary.frames_saved, 4);
    assert_eq!(seen, vec![(0, 0), (1, 2), (2, 3), (3, 4)]);
    assert_eq!(file_names(&out.path().join("0.5-0.6")), expected_names(4));
}

#[test]
fn abort_policy_stops_at_first_failure() {
    let out = TempDir::new().expect("temp output");
    let cancel = AtomicBool::new(false);
    let mut detector = FixedBackend::new(vec![0.5]).failing_on(1);
    let mut source = ingest::open("stub://5@1").expect("open stub");

    let err = run_pipeline(
        &settings(out.path(), 1.0),
        &mut detector,
        source.as_mut(),
        &cancel,
        |_| {},
    )
    .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Detection);
    assert!(err.message.contains("scripted failure"));
    // The frame written before the failure stays.
    assert_eq!(file_names(&out.path().join("0.5-0.6")), expected_names(1));
}

#[test]
fn cancelled_run_saves_nothing() {
    let out = TempDir::new().expect("temp output");
    let cancel = AtomicBool::new(true);

    let summary = sort_video(
        "stub://50@10",
        &DetectorSettings::fixed(vec![0.9]),
        &settings(out.path(), 3.0),
        &cancel,
        |_| {},
    )
    .expect("sort video");

    assert!(summary.cancelled);
    assert_eq!(summary.frames_read, 0);
    assert_eq!(summary.frames_saved, 0);
    assert!(file_names(out.path()).is_empty());
}

#[test]
fn slow_source_samples_every_frame() {
    let out = TempDir::new().expect("temp output");
    let cancel = AtomicBool::new(false);

    let summary = sort_video(
        "stub://10@2",
        &DetectorSettings::fixed(vec![0.99]),
        &settings(out.path(), 3.0),
        &cancel,
        |_| {},
    )
    .expect("sort video");

    assert_eq!(summary.sampling_interval, 1);
    assert_eq!(summary.frames_saved, 10);
    assert_eq!(file_names(&out.path().join("0.9-1.0")), expected_names(10));
}

#[test]
fn perfect_confidence_lands_in_top_bucket() {
    let out = TempDir::new().expect("temp output");
    let cancel = AtomicBool::new(false);

    sort_video(
        "stub://1@1",
        &DetectorSettings::fixed(vec![1.0]),
        &settings(out.path(), 1.0),
        &cancel,
        |_| {},
    )
    .expect("sort video");

    assert_eq!(file_names(out.path()), vec!["1.0-1.1".to_string()]);
}

#[test]
fn decode_failure_aborts_even_when_skipping() {
    let out = TempDir::new().expect("temp output");
    let cancel = AtomicBool::new(false);
    let mut detector = FixedBackend::new(vec![0.5]);
    let mut source = CorruptAfter {
        good_frames: 3,
        served: 0,
    };
    let pipeline = PipelineSettings {
        failure_policy: FailurePolicy::Skip,
        ..settings(out.path(), 1.0)
    };

    let err = run_pipeline(&pipeline, &mut detector, &mut source, &cancel, |_| {}).unwrap_err();

    assert_eq!(err.kind, ErrorKind::Decode);
    assert!(err.message.contains("corrupt packet"), "{}", err.message);
    assert_eq!(file_names(&out.path().join("0.5-0.6")), expected_names(3));
}

#[test]
fn output_path_that_is_a_file_is_filesystem_error() {
    let dir = TempDir::new().expect("temp output");
    let not_a_dir = dir.path().join("outputFolder");
    std::fs::write(&not_a_dir, b"occupied").expect("write blocker");
    let cancel = AtomicBool::new(false);

    let err = sort_video(
        "stub://3@1",
        &DetectorSettings::fixed(vec![0.5]),
        &settings(&not_a_dir, 1.0),
        &cancel,
        |_| {},
    )
    .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Filesystem);
    assert_eq!(std::fs::read(&not_a_dir).expect("blocker intact"), b"occupied");
}

#[test]
fn blocked_bucket_directory_keeps_earlier_frames() {
    let out = TempDir::new().expect("temp output");
    std::fs::write(out.path().join("0.9-1.0"), b"occupied").expect("write blocker");
    let cancel = AtomicBool::new(false);
    let mut detector = FixedBackend::scripted(vec![vec![0.5], vec![0.5], vec![0.95]]);
    let mut source = ingest::open("stub://3@1").expect("open stub");

    let err = run_pipeline(
        &settings(out.path(), 1.0),
        &mut detector,
        source.as_mut(),
        &cancel,
        |_| {},
    )
    .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Filesystem);
    assert_eq!(file_names(&out.path().join("0.5-0.6")), expected_names(2));
}

#[test]
fn oversized_synthetic_source_is_an_error_not_a_panic() {
    let out = TempDir::new().expect("temp output");
    let cancel = AtomicBool::new(false);

    let err = sort_video(
        "stub://1@1/4000000000x4000000000",
        &DetectorSettings::fixed(vec![0.5]),
        &settings(out.path(), 1.0),
        &cancel,
        |_| {},
    )
    .unwrap_err();

    assert_eq!(err.kind, ErrorKind::SourceUnavailable);
    assert!(file_names(out.path()).is_empty());
}
