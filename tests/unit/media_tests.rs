/*!
 * Tests for ffprobe metadata parsing, stderr filtering and tool execution
 */

use std::time::Duration;

use dubwai::errors::MediaError;
use dubwai::media::{SourceTiming, filter_ffmpeg_stderr, parse_probe_output, run_tool};

#[test]
fn test_parse_probe_output_withAudioStream_shouldReadRateAndDuration() {
    let json = r#"{
        "streams": [{"codec_type": "audio", "sample_rate": "22050", "channels": 2}],
        "format": {"duration": "95.5", "bit_rate": "128000"}
    }"#;

    let timing = parse_probe_output(json, 44_100);

    assert_eq!(timing, SourceTiming::new(22_050, 95.5));
    assert_eq!(timing.total_ms(), 95_500);
}

#[test]
fn test_parse_probe_output_withoutAudioStream_shouldUsePlausibleBitrate() {
    let json = r#"{
        "streams": [{"codec_type": "video"}],
        "format": {"duration": "3.0", "bit_rate": "48000"}
    }"#;

    let timing = parse_probe_output(json, 44_100);

    assert_eq!(timing.sample_rate, 48_000);
}

#[test]
fn test_parse_probe_output_withImplausibleBitrate_shouldUseDefault() {
    let json = r#"{"streams": [], "format": {"duration": "3.0", "bit_rate": "2500000"}}"#;

    let timing = parse_probe_output(json, 44_100);

    assert_eq!(timing.sample_rate, 44_100);
    assert_eq!(timing.total_ms(), 3_000);
}

#[test]
fn test_parse_probe_output_withNumericFields_shouldAcceptThem() {
    let json = r#"{"streams": [{"codec_type": "audio", "sample_rate": 24000}], "format": {"duration": 1.25}}"#;

    let timing = parse_probe_output(json, 44_100);

    assert_eq!(timing, SourceTiming::new(24_000, 1.25));
}

#[test]
fn test_parse_probe_output_withGarbage_shouldFallBackToDefaults() {
    assert_eq!(parse_probe_output("", 16_000), SourceTiming::new(16_000, 0.0));
    assert_eq!(
        parse_probe_output(r#"{"format": {"duration": "N/A"}}"#, 16_000),
        SourceTiming::new(16_000, 0.0)
    );
}

#[test]
fn test_filter_ffmpeg_stderr_shouldKeepOnlyErrors() {
    let stderr = "ffmpeg version n6.1 Copyright (c) 2000-2023\n\
                  configuration: --enable-gpl\n\
                  libavcodec     60. 31.102\n\
                  Input #0, matroska,webm, from 'in.mkv':\n\
                  Stream #0:0: Video: h264\n\
                  [matroska @ 0x55] Invalid EBML header\n\
                  in.mkv: Invalid data found when processing input\n";

    let filtered = filter_ffmpeg_stderr(stderr);

    assert_eq!(
        filtered,
        "[matroska @ 0x55] Invalid EBML header\nin.mkv: Invalid data found when processing input"
    );
}

#[test]
fn test_filter_ffmpeg_stderr_withEncoderErrors_shouldKeepThem() {
    let stderr = "ffmpeg version n6.1 Copyright (c) 2000-2023\n\
                  libavutil      58. 29.100 / 58. 29.100\n\
                  libmp3lame: invalid bitrate 7\n\
                  Metadata:\n\
                  title           : Episode 1\n\
                  encoder         : Lavf60.16.100\n\
                  encoder settings rejected by muxer\n\
                  title track missing from input\n";

    let filtered = filter_ffmpeg_stderr(stderr);

    assert_eq!(
        filtered,
        "libmp3lame: invalid bitrate 7\nencoder settings rejected by muxer\ntitle track missing from input"
    );
}

#[test]
fn test_filter_ffmpeg_stderr_withOnlyNoise_shouldReturnPlaceholder() {
    let filtered = filter_ffmpeg_stderr("ffmpeg version 6\n  built with clang\n\n");
    assert!(filtered.contains("unknown ffmpeg error"));
}

#[tokio::test]
async fn test_run_tool_withMissingProgram_shouldReturnSpawnError() {
    let result = run_tool(
        "dubwai-no-such-program",
        ["-version"],
        Duration::from_secs(5),
    )
    .await;

    assert!(matches!(result, Err(MediaError::Spawn { .. })));
}
