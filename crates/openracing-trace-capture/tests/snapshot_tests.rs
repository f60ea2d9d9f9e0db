//! Snapshot tests for the capture output formats

use openracing_trace_capture::{
    CaptureConfig, CaptureError, CaptureMetrics, EventKind, LabelEncoding, Sample, TraceEncoder,
};

fn encode(samples: &[Sample], tool: &str, encoding: LabelEncoding) -> String {
    let encoder = TraceEncoder::new(tool, encoding);
    let mut out = vec![0u8; encoder.output_size(samples)];
    let written = encoder.encode_into(samples, &mut out).unwrap_or(0);
    String::from_utf8_lossy(out.get(..written).unwrap_or_default()).into_owned()
}

#[test]
fn test_begin_sample_snapshot() {
    let sample = Sample::with_identity("render", "frame", 100, EventKind::Begin, 1, 2);
    insta::assert_snapshot!(
        encode(&[sample], "snap", LabelEncoding::Escaped),
        @r#"{"pid":1,"tid":2,"ts":100,"ph":"B","cat":"render","name":"frame","args":{"tool":"snap"}},"#
    );
}

#[test]
fn test_span_sequence_snapshot() {
    let samples = [
        Sample::with_identity("physics", "integrate", 10, EventKind::Begin, 300, 4),
        Sample::with_identity("physics", "contact", 15, EventKind::Instant, 300, 4),
        Sample::with_identity("physics", "integrate", 20, EventKind::End, 300, 4),
    ];
    insta::assert_snapshot!(
        encode(&samples, "snap", LabelEncoding::Escaped),
        @r#"{"pid":300,"tid":4,"ts":10,"ph":"B","cat":"physics","name":"integrate","args":{"tool":"snap"}},{"pid":300,"tid":4,"ts":15,"ph":"I","cat":"physics","name":"contact","args":{"tool":"snap"}},{"pid":300,"tid":4,"ts":20,"ph":"E","cat":"physics","name":"integrate","args":{"tool":"snap"}},"#
    );
}

#[test]
fn test_extreme_values_snapshot() {
    let sample = Sample::with_identity("", "", u64::MAX, EventKind::Instant, u16::MAX, 0);
    insta::assert_snapshot!(
        encode(&[sample], "snap", LabelEncoding::Escaped),
        @r#"{"pid":65535,"tid":0,"ts":18446744073709551615,"ph":"I","cat":"","name":"","args":{"tool":"snap"}},"#
    );
}

#[test]
fn test_escaped_labels_snapshot() {
    let sample = Sample::with_identity("a\"b", "x\ny\u{1}\\", 1, EventKind::Instant, 1, 1);
    insta::assert_snapshot!(
        encode(&[sample], "snap", LabelEncoding::Escaped),
        @r#"{"pid":1,"tid":1,"ts":1,"ph":"I","cat":"a\"b","name":"x\ny\u0001\\","args":{"tool":"snap"}},"#
    );
}

#[test]
fn test_empty_output_snapshot() {
    insta::assert_snapshot!(encode(&[], "snap", LabelEncoding::Escaped), @"{}");
}

#[test]
fn test_sample_display_snapshot() {
    let sample = Sample::with_identity("hid", "report_sent", 42, EventKind::End, 3, 9);
    insta::assert_snapshot!(sample.to_string(), @"End(hid/report_sent, pid=3, tid=9, ts=42us)");
}

#[test]
fn test_metrics_display_snapshot() {
    let metrics = CaptureMetrics {
        samples_recorded: 2048,
        samples_dropped: 1,
        buffers_handed_off: 2,
        flushes: 1,
        samples_flushed: 2047,
        bytes_serialized: 180_000,
        unmatched_ends: 0,
    };
    insta::assert_snapshot!(
        metrics.to_string(),
        @"CaptureMetrics(recorded=2048, flushed=2047, dropped=1, handoffs=2, flushes=1, bytes=180000, unmatched=0)"
    );
}

#[test]
fn test_error_messages_snapshot() {
    insta::assert_snapshot!(CaptureError::NotActive.to_string(), @"Trace session is not active");
    insta::assert_snapshot!(
        CaptureError::OutputTooSmall { required: 91, capacity: 64 }.to_string(),
        @"Trace output buffer too small: 91 bytes required, 64 available"
    );
    insta::assert_snapshot!(
        CaptureError::AllocationFailed { bytes: 4096 }.to_string(),
        @"Trace capture allocation of 4096 bytes failed"
    );
}

#[test]
fn test_default_config_snapshot() {
    insta::assert_debug_snapshot!(CaptureConfig::default(), @r#"
    CaptureConfig {
        buffer_capacity: 1024,
        tool_name: "openracing-trace-capture",
        label_encoding: Escaped,
        validate_pairing: false,
    }
    "#);
}
