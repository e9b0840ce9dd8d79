//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - contract smoke tests
//! - simulated rides driving a session over a simulated player
//! - config file to running session

#[cfg(test)]
mod contract_tests {
    use contracts::{SyncDecision, SyncEngineConfig};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_engine_defaults() {
        let config = SyncEngineConfig::default();
        assert_eq!(config.seek_threshold_ms, 3000.0);
        assert!(config.distance_tracking);
        assert!(config.rate.min_rate < 1.0 && config.rate.max_rate > 1.0);
    }

    #[test]
    fn test_observability_labels_cover_decisions() {
        let labels: Vec<_> = [
            SyncDecision::Seek { target_ms: 0.0 },
            SyncDecision::Nudge { rate: 1.1 },
            SyncDecision::Hold,
            SyncDecision::Retry,
            SyncDecision::Buffered,
            SyncDecision::Ignored,
        ]
        .iter()
        .map(observability::metrics::decision_label)
        .collect();
        assert_eq!(labels, ["seek", "nudge", "hold", "retry", "buffered", "ignored"]);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader, FileSyncProvider};
    use contracts::{
        PlaybackState, SampleName, SyncDecision, SyncEngineConfig, SyncMode, TransportAdapter,
    };
    use observability::metrics::SyncMetricsAggregator;
    use sync_engine::{SessionHandle, SyncEngine, SyncError};
    use telemetry::{RideConfig, RideGenerator, SimulatedRide, TelemetryPipeline};
    use tempfile::TempDir;
    use transport::{
        ManualClock, SimulatedConfig, SimulatedControls, SimulatedTransport, TransportFactory,
    };

    const IDENTITY_TIME_TABLE: &str = r#"
axis = "time"

[[points]]
source = 0.0
target_ms = 0.0

[[points]]
source = 600000.0
target_ms = 600000.0
"#;

    /// Video authored at half the session pace
    const HALF_PACE_TIME_TABLE: &str = r#"
axis = "time"

[[points]]
source = 0.0
target_ms = 0.0

[[points]]
source = 60000.0
target_ms = 30000.0
"#;

    /// 1 km of road filmed over 100 s
    const DISTANCE_TABLE: &str = r#"
axis = "distance"

[[points]]
source = 0.0
target_ms = 0.0

[[points]]
source = 1.0
target_ms = 100000.0
"#;

    /// Media file plus optional `<stem>.sync.toml` sidecar
    fn media_with_table(table: Option<&str>) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("ride.mp4");
        fs::write(&media, b"not really a video").unwrap();
        if let Some(table) = table {
            fs::write(dir.path().join("ride.sync.toml"), table).unwrap();
        }
        (dir, media)
    }

    fn session(clock: &ManualClock) -> (SessionHandle, SimulatedControls) {
        let transport = SimulatedTransport::with_clock(SimulatedConfig::default(), clock.clone());
        let controls = transport.controls();
        let engine = SyncEngine::new(
            SyncEngineConfig::default(),
            Box::new(transport),
            Box::new(FileSyncProvider::new(None)),
        );
        (SessionHandle::spawn(engine, 64), controls)
    }

    async fn started(media: &Path, clock: &ManualClock) -> (SessionHandle, SimulatedControls) {
        let (session, controls) = session(clock);
        session.select_media(media).await.unwrap();
        session.start().await.unwrap();
        (session, controls)
    }

    fn ride(interval_ms: u64) -> RideGenerator {
        RideGenerator::new(
            RideConfig {
                interval_ms,
                speed_kmh: 36.0,
                ..RideConfig::default()
            },
            SampleName::new("sim").unwrap(),
        )
    }

    /// Simulated ride -> TelemetryPipeline -> session -> simulated player
    ///
    /// Player and table agree, so every update holds.
    #[tokio::test]
    async fn test_e2e_pipeline_identity_table_holds() {
        let (_dir, media) = media_with_table(Some(IDENTITY_TIME_TABLE));
        let clock = ManualClock::new();
        let (session, _) = started(&media, &clock).await;

        let mut pipeline = TelemetryPipeline::new(64);
        pipeline.register_source(Box::new(SimulatedRide::new(
            "sim",
            RideConfig {
                interval_ms: 1,
                max_samples: Some(20),
                ..RideConfig::default()
            },
        )));
        let rx = pipeline.take_receiver().unwrap();
        pipeline.start_all();

        let mut aggregator = SyncMetricsAggregator::new();
        for _ in 0..20 {
            let sample = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("timed out waiting for telemetry")
                .unwrap();
            clock.set_ms(sample.elapsed_ms);
            let report = session.telemetry(sample).await.unwrap();
            assert_eq!(report.mode, SyncMode::Time);
            aggregator.update(&report);
        }
        pipeline.stop_all();

        let summary = aggregator.summary();
        assert_eq!(summary.total_updates, 20);
        assert_eq!(summary.holds, 20);
        assert_eq!(summary.seeks, 0);

        let status = session.shutdown().await.unwrap();
        assert_eq!(status.state, PlaybackState::Stopped);
        assert_eq!(status.session_elapsed_ms, 19);
        assert_eq!(pipeline.metrics().snapshot().samples_dropped, 0);
    }

    /// Video runs ahead of the table; the engine slows it down without seeking
    #[tokio::test]
    async fn test_e2e_drift_corrected_by_rate() {
        let (_dir, media) = media_with_table(Some(HALF_PACE_TIME_TABLE));
        let clock = ManualClock::new();
        let (session, _) = started(&media, &clock).await;
        let mut generator = ride(1000);

        let mut aggregator = SyncMetricsAggregator::new();
        for _ in 0..30 {
            let sample = generator.next_sample();
            clock.set_ms(sample.elapsed_ms);
            let report = session.telemetry(sample).await.unwrap();
            aggregator.update(&report);
        }

        let summary = aggregator.summary();
        assert_eq!(summary.seeks, 0);
        assert!(summary.nudges >= 2, "nudges: {}", summary.nudges);

        let status = session.status().await.unwrap();
        assert_eq!(status.state, PlaybackState::Playing);
        assert!(status.rate < 0.6, "rate: {}", status.rate);
        assert!(status.rate >= 0.5);
        assert!(status.max_abs_drift_ms < 3000.0);
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_e2e_distance_table_tracks_speed() {
        let (_dir, media) = media_with_table(Some(DISTANCE_TABLE));
        let clock = ManualClock::new();
        let (session, _) = started(&media, &clock).await;
        let mut generator = ride(1000);

        for _ in 0..10 {
            let sample = generator.next_sample();
            clock.set_ms(sample.elapsed_ms);
            let report = session.telemetry(sample).await.unwrap();
            assert_eq!(report.mode, SyncMode::Distance);
            assert_eq!(report.decision, SyncDecision::Hold);
            assert!(report.delta_ms.abs() < 1.0, "delta: {}", report.delta_ms);
        }

        let status = session.shutdown().await.unwrap();
        // 36 km/h for 9 s
        assert!((status.session_distance_km - 0.09).abs() < 1e-9);
        assert!(status.synced);
    }

    #[tokio::test]
    async fn test_e2e_missing_media_stays_stopped() {
        let clock = ManualClock::new();
        let (session, _) = session(&clock);
        session.select_media("/nonexistent/ride.mp4").await.unwrap();

        let err = session.start().await.unwrap_err();
        assert!(matches!(err, SyncError::MediaUnavailable(_)));

        let status = session.status().await.unwrap();
        assert_eq!(status.state, PlaybackState::Stopped);

        let report = session.telemetry(ride(1000).next_sample()).await.unwrap();
        assert_eq!(report.decision, SyncDecision::Ignored);
    }

    #[tokio::test]
    async fn test_e2e_decoder_fault_stops_session() {
        let (_dir, media) = media_with_table(None);
        let clock = ManualClock::new();
        let (session, controls) = started(&media, &clock).await;
        let mut generator = ride(1000);

        let sample = generator.next_sample();
        let report = session.telemetry(sample).await.unwrap();
        assert_eq!(report.mode, SyncMode::Identity);

        controls.kill_decoder();
        clock.advance_ms(1000);
        let err = session.telemetry(generator.next_sample()).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, SyncError::DecoderFault(_)));

        let status = session.status().await.unwrap();
        assert_eq!(status.state, PlaybackState::Stopped);
        let report = session.telemetry(generator.next_sample()).await.unwrap();
        assert_eq!(report.decision, SyncDecision::Ignored);
    }

    /// Stop while the decoder is still landing a seek
    #[tokio::test]
    async fn test_e2e_stop_mid_seek_does_not_wait() {
        let (_dir, media) = media_with_table(Some(IDENTITY_TIME_TABLE));
        let clock = ManualClock::new();
        let transport = SimulatedTransport::with_clock(
            SimulatedConfig {
                seek_latency_ms: 5_000,
                duration_ms: None,
            },
            clock.clone(),
        );
        let controls = transport.controls();
        let engine = SyncEngine::new(
            SyncEngineConfig::default(),
            Box::new(transport),
            Box::new(FileSyncProvider::new(None)),
        );
        let session = SessionHandle::spawn(engine, 16);
        session.select_media(&media).await.unwrap();
        session.start().await.unwrap();

        clock.set_ms(1_000);
        session.seek(120_000.0).await.unwrap();

        // the clock never reaches the seek's landing time
        session.stop();
        let status = session.status().await.unwrap();
        assert_eq!(status.state, PlaybackState::Stopped);
        assert_eq!(controls.close_count(), 1);

        let mut generator = ride(1000);
        for _ in 0..3 {
            let report = session.telemetry(generator.next_sample()).await.unwrap();
            assert_eq!(report.decision, SyncDecision::Ignored);
        }
        let status = session.shutdown().await.unwrap();
        assert_eq!(status.state, PlaybackState::Stopped);
        assert_eq!(controls.close_count(), 1);
    }

    #[tokio::test]
    async fn test_e2e_rejected_command_is_retried() {
        let (_dir, media) = media_with_table(Some(HALF_PACE_TIME_TABLE));
        let clock = ManualClock::new();
        let (session, controls) = started(&media, &clock).await;
        let mut generator = ride(1000);

        session.telemetry(generator.next_sample()).await.unwrap();

        controls.reject_next("set_rate");
        clock.set_ms(1000);
        let report = session.telemetry(generator.next_sample()).await.unwrap();
        assert_eq!(report.decision, SyncDecision::Retry);

        clock.set_ms(2000);
        let report = session.telemetry(generator.next_sample()).await.unwrap();
        assert!(matches!(report.decision, SyncDecision::Nudge { .. }));

        let status = session.shutdown().await.unwrap();
        assert_eq!(status.transient_errors, 1);
    }

    /// Config file -> ConfigLoader -> TransportFactory -> session
    #[tokio::test]
    async fn test_e2e_config_to_session() {
        let (dir, media) = media_with_table(Some(IDENTITY_TIME_TABLE));
        let content = format!(
            r#"
[media]
path = "{}"
sync_dir = "{}"

[transport]
backend = "simulated"

[engine]
seek_threshold_ms = 5000.0

[telemetry]
poll_interval_ms = 250
"#,
            media.display(),
            dir.path().display()
        );
        let blueprint = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();
        let config = blueprint.to_sync_engine_config();
        assert_eq!(config.seek_threshold_ms, 5000.0);

        let transport = TransportFactory::create(&blueprint.transport).unwrap();
        assert_eq!(transport.backend_name(), "simulated");
        let engine = SyncEngine::new(
            config,
            transport,
            Box::new(FileSyncProvider::from_blueprint(&blueprint)),
        );
        let session = SessionHandle::spawn(engine, 16);

        session.update_totals(blueprint.actual_totals()).await.unwrap();
        session.select_media(&media).await.unwrap();
        session.start().await.unwrap();

        let status = session.status().await.unwrap();
        assert_eq!(status.state, PlaybackState::Playing);
        assert!(status.synced);
        assert_eq!(status.mode, SyncMode::Time);

        let report = session.telemetry(ride(250).next_sample()).await.unwrap();
        assert!(report.decision != SyncDecision::Ignored);

        let status = session.shutdown().await.unwrap();
        assert_eq!(status.state, PlaybackState::Stopped);
    }
}
