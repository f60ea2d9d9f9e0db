//! Property-based tests for openracing-trace-capture

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use openracing_trace_capture::prelude::*;
use openracing_trace_capture::{Clock, IdentitySource, TraceEncoder};
use proptest::prelude::*;

prop_compose! {
    fn arb_sample()(
        timestamp_us in any::<u64>(),
        process_id in any::<u16>(),
        thread_id in any::<u16>(),
        kind in prop_oneof![
            Just(EventKind::Begin),
            Just(EventKind::End),
            Just(EventKind::Instant),
        ],
        category in any::<String>(),
        name in any::<String>(),
    ) -> Sample {
        Sample::with_identity(category, name, timestamp_us, kind, process_id, thread_id)
    }
}

fn arb_encoding() -> impl Strategy<Value = LabelEncoding> {
    prop_oneof![Just(LabelEncoding::Escaped), Just(LabelEncoding::Verbatim)]
}

struct ReplayClock(Vec<u64>, AtomicU64);

impl Clock for ReplayClock {
    fn now_us(&self) -> u64 {
        let index = self.1.fetch_add(1, Ordering::Relaxed);
        usize::try_from(index)
            .ok()
            .and_then(|i| self.0.get(i).copied())
            .unwrap_or(u64::MAX)
    }
}

struct FixedIdentity(u16, u16);

impl IdentitySource for FixedIdentity {
    fn process_id(&self) -> u16 {
        self.0
    }

    fn thread_id(&self) -> u16 {
        self.1
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_computed_size_matches_written(
        samples in prop::collection::vec(arb_sample(), 0..32),
        encoding in arb_encoding(),
    ) {
        let encoder = TraceEncoder::new("prop", encoding);
        let required = encoder.output_size(&samples);
        let mut out = vec![0u8; required];
        let written = encoder.encode_into(&samples, &mut out);
        prop_assert_eq!(written.ok(), Some(required - 1));
        prop_assert_eq!(out.last().copied(), Some(0));
    }

    #[test]
    fn prop_short_buffer_never_overruns(
        samples in prop::collection::vec(arb_sample(), 1..8),
        shortfall in 1usize..16,
    ) {
        let encoder = TraceEncoder::new("prop", LabelEncoding::Escaped);
        let required = encoder.output_size(&samples);
        let mut out = vec![0u8; required.saturating_sub(shortfall)];
        prop_assert!(encoder.encode_into(&samples, &mut out).is_err());
    }

    #[test]
    fn prop_escaped_output_is_valid_json(samples in prop::collection::vec(arb_sample(), 1..16)) {
        let encoder = TraceEncoder::new("prop", LabelEncoding::Escaped);
        let mut out = vec![0u8; encoder.output_size(&samples)];
        let written = encoder.encode_into(&samples, &mut out);
        prop_assert!(written.is_ok());
        let text = std::str::from_utf8(out.get(..written.unwrap_or(0)).unwrap_or_default());
        prop_assert!(text.is_ok());

        let document = format!("{TRACE_PREFACE}{}{TRACE_POSTFACE}", text.unwrap_or_default());
        let value: Result<serde_json::Value, _> = serde_json::from_str(&document);
        prop_assert!(value.is_ok(), "invalid document: {document}");

        let events = value
            .ok()
            .and_then(|v| v.get("traceEvents").and_then(|e| e.as_array()).cloned())
            .unwrap_or_default();
        prop_assert_eq!(events.len(), samples.len() + 2);
        for (event, sample) in events.iter().skip(1).zip(&samples) {
            prop_assert_eq!(event["cat"].as_str(), Some(sample.category()));
            prop_assert_eq!(event["name"].as_str(), Some(sample.name()));
            prop_assert_eq!(event["ts"].as_u64(), Some(sample.timestamp_us()));
            prop_assert_eq!(event["pid"].as_u64(), Some(u64::from(sample.process_id())));
            prop_assert_eq!(event["tid"].as_u64(), Some(u64::from(sample.thread_id())));
        }
    }

    #[test]
    fn prop_single_producer_keeps_order(
        capacity in 1usize..16,
        stamps in prop::collection::vec(any::<u64>(), 0..64),
    ) {
        let config = CaptureConfig::builder()
            .buffer_capacity(capacity)
            .tool_name("prop")
            .build();
        prop_assert!(config.is_ok());
        let session = TraceSession::with_sources(
            config.unwrap_or_default(),
            Arc::new(ReplayClock(stamps.clone(), AtomicU64::new(0))),
            Arc::new(FixedIdentity(1, 1)),
        );
        prop_assert!(session.is_ok());
        let Ok(session) = session else { return Ok(()) };

        let mut recorder = session.register_thread()?;
        for _ in &stamps {
            recorder.instant("order", "step")?;
        }
        prop_assert_eq!(session.list_size(), stamps.len() / capacity);
        prop_assert_eq!(recorder.pending(), stamps.len() % capacity);
        recorder.flush_thread_buffer()?;

        let chunk = session.flush_alloc()?;
        prop_assert_eq!(chunk.sample_count(), stamps.len());
        if stamps.is_empty() {
            prop_assert_eq!(chunk.as_bytes(), b"{}");
            return Ok(());
        }

        let document = format!("{TRACE_PREFACE}{}{TRACE_POSTFACE}", chunk.to_str().unwrap_or_default());
        let value: serde_json::Value = serde_json::from_str(&document)
            .map_err(|err| TestCaseError::fail(err.to_string()))?;
        let recorded: Vec<u64> = value["traceEvents"]
            .as_array()
            .map(|events| events.iter().filter_map(|e| e["ts"].as_u64()).collect())
            .unwrap_or_default();
        prop_assert_eq!(recorded, stamps);
    }

    #[test]
    fn prop_compute_size_matches_drain(
        capacity in 1usize..8,
        count in 0usize..40,
        name in "[a-z_]{1,12}",
    ) {
        let config = CaptureConfig::builder().buffer_capacity(capacity).build();
        prop_assert!(config.is_ok());
        let session = TraceSession::new(config.unwrap_or_default())?;
        let mut recorder = session.register_thread()?;
        for _ in 0..count {
            recorder.instant("prop", name.clone())?;
        }
        recorder.flush_thread_buffer()?;

        let required = session.compute_output_size()?;
        let mut out = vec![0u8; required];
        let written = session.drain_into(&mut out)?;
        prop_assert_eq!(written + 1, required);
        prop_assert_eq!(session.metrics().samples_flushed, count as u64);
    }
}
