//! Error handling integration tests.
//!
//! These tests verify that meaningful errors are returned for various
//! failure conditions, and that the messages name the offending file.

use std::path::PathBuf;

use imgseq::{
    EncoderOptions, FrameDuration, ImageSequenceError, SequenceBuilder, SequenceOptions,
    build_sequence,
};

#[test]
fn empty_sequence_message() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output = directory.path().join("movie.mov");

    let error = build_sequence(&output, Vec::<PathBuf>::new(), FrameDuration::default())
        .unwrap_err();

    assert!(matches!(error, ImageSequenceError::EmptySequence));
    assert!(
        error.to_string().contains("at least one input image"),
        "Error message should explain the empty input: {error}",
    );
    assert!(!output.exists(), "No file should be created for an empty list");
}

#[test]
fn invalid_frame_duration_message() {
    let error = FrameDuration::new(0, 15).unwrap_err();
    let message = error.to_string();
    assert!(message.contains("0/15"), "Message should quote the duration: {message}");

    let error = "1/x".parse::<FrameDuration>().unwrap_err();
    assert!(matches!(error, ImageSequenceError::FrameDurationSyntax(_)));
    assert!(error.to_string().contains("1/x"));
}

#[test]
fn decode_error_names_the_image() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let broken = directory.path().join("broken.png");
    std::fs::write(&broken, b"this is not an image").expect("Failed to write fixture");

    let error = SequenceBuilder::new(SequenceOptions::new().with_preflight(true))
        .build(directory.path().join("movie.mov"), [&broken])
        .unwrap_err();

    match &error {
        ImageSequenceError::Decode { path, .. } => assert_eq!(path, &broken),
        other => panic!("Expected Decode, got: {other}"),
    }
    assert!(error.to_string().contains("broken.png"));
}

#[test]
fn missing_input_is_reported_by_path() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let missing = directory.path().join("nowhere.png");

    let error = SequenceBuilder::new(SequenceOptions::new().with_preflight(true))
        .build(directory.path().join("movie.mov"), [&missing])
        .unwrap_err();

    assert!(
        error.to_string().contains("nowhere.png"),
        "Error message should name the missing file: {error}",
    );
}

#[test]
fn zero_resolution_is_rejected() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let image = directory.path().join("a.png");
    image::RgbImage::new(8, 8).save(&image).expect("Failed to write fixture");

    let error = SequenceBuilder::new(
        SequenceOptions::new().with_encoder(EncoderOptions::default().resolution(0, 10)),
    )
    .build(directory.path().join("movie.mov"), [&image])
    .unwrap_err();

    assert!(
        matches!(error, ImageSequenceError::InvalidResolution { width: 0, height: 10 }),
        "Expected InvalidResolution, got: {error}",
    );
}

#[test]
fn frame_errors_are_classified() {
    let path = PathBuf::from("x.png");
    assert!(
        ImageSequenceError::Decode { path: path.clone(), reason: String::new() }.is_frame_error()
    );
    assert!(
        ImageSequenceError::Append { path: path.clone(), reason: String::new() }.is_frame_error()
    );
    assert!(ImageSequenceError::InputNotFound(path.clone()).is_frame_error());
    assert!(!ImageSequenceError::Creation { path, reason: String::new() }.is_frame_error());
    assert!(!ImageSequenceError::EmptySequence.is_frame_error());
    assert!(!ImageSequenceError::Cancelled.is_frame_error());
    assert!(!ImageSequenceError::EncoderSetup("no codec".to_string()).is_frame_error());
}
