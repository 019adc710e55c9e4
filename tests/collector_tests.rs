// Collector tests: write -> rollup -> query per domain, tier fallback, entity filters

mod common;

use std::collections::BTreeMap;

use common::{T0, failed_ping, ping_sample};
use tempfile::TempDir;
use tiered_metrics::collector::RollupPolicy;
use tiered_metrics::collectors::{
    CollectorSet, MultiSyncPingCollector, NetworkQualityCollector, NetworkQualityPolicy,
    PingCollector, PingObservation, PingPolicy, PortCollector, QualityObservation,
    VoltageCollector,
};
use tiered_metrics::config::{AppConfig, hours_to_secs};
use tiered_metrics::models::{
    ChannelSummary, NetworkQualitySample, PingSample, PingStatus, TOTAL_PORT,
};
use tiered_metrics::rollup::{QualityConfig, QualityRating, TierOutcome};

fn ping_collector(dir: &TempDir) -> PingCollector {
    let collector = PingCollector::ping(dir.path().join("ping"), hours_to_secs(25));
    collector.init_at(T0).unwrap();
    collector
}

// ---- ping ----

#[test]
fn test_ping_rollup_end_to_end() {
    let dir = TempDir::new().unwrap();
    let collector = ping_collector(&dir);
    let samples: Vec<PingSample> = (0..12)
        .map(|i| ping_sample(T0 + 5 * i, "gw", 100.0 + 10.0 * i as f64))
        .collect();
    assert!(collector.write(&samples));

    let report = collector.process_rollup_at(T0 + 120);
    assert_eq!(report.records(), 1);
    assert!(report.failed.is_empty());
    assert_eq!(
        report.tiers["1min"],
        TierOutcome::Processed { buckets: 1, records: 1 }
    );
    assert_eq!(report.tiers["5min"], TierOutcome::Throttled);

    let response = collector.get_metrics_at(1, None, T0 + 120);
    assert!(response.success);
    assert_eq!(response.count, Some(1));
    assert_eq!(response.tier_info.as_ref().unwrap().tier, "1min");
    let record = &response.data[0];
    assert_eq!(record.timestamp, T0);
    assert_eq!(record.period_start, T0);
    assert_eq!(record.period_end, T0 + 60);
    assert_eq!(record.min_latency, Some(100.0));
    assert_eq!(record.max_latency, Some(210.0));
    assert_eq!(record.avg_latency, Some(155.0));
    assert_eq!(record.sample_count, 12);
    assert_eq!(record.success_count, 12);
    assert_eq!(record.failure_count, 0);
    assert_eq!(record.hosts.get("gw"), Some(&12));

    let period = response.period.unwrap();
    assert_eq!(period.end, T0 + 120);
    assert_eq!(period.start, T0 + 120 - 3600);
}

#[test]
fn test_ping_query_includes_bucket_straddling_window_start() {
    let dir = TempDir::new().unwrap();
    let collector = ping_collector(&dir);
    assert!(collector.write(&[ping_sample(T0 + 10, "gw", 20.0)]));
    assert_eq!(collector.process_rollup_at(T0 + 120).records(), 1);

    // An hour back from here lands 30s into the [T0, T0 + 60) bucket.
    let response = collector.get_metrics_at(1, None, T0 + 3600 + 30);
    assert!(response.success);
    assert_eq!(response.data.len(), 1);
    assert_eq!(response.data[0].timestamp, T0);
    assert_eq!(response.period.unwrap().start, T0);

    // One minute later the bucket is fully outside the window.
    let later = collector.get_metrics_at(1, None, T0 + 3600 + 60);
    assert!(later.data.is_empty());
}

#[test]
fn test_ping_query_falls_back_to_finer_tier() {
    let dir = TempDir::new().unwrap();
    let collector = ping_collector(&dir);
    collector.write_one(ping_sample(T0 + 5, "gw", 20.0));
    collector.process_rollup_at(T0 + 120);

    assert!(!collector.rollup_path(collector.tiers().get("5min").unwrap()).exists());
    let response = collector.get_metrics_at(24, None, T0 + 120);
    assert!(response.success);
    assert_eq!(response.tier_info.unwrap().tier, "1min");
    assert_eq!(response.data.len(), 1);

    assert_eq!(collector.select_tier(1000).name, "1min");
}

#[test]
fn test_ping_query_without_rollup_file_fails() {
    let dir = TempDir::new().unwrap();
    let collector = ping_collector(&dir);
    let response = collector.get_metrics_at(1, None, T0 + 120);
    assert!(!response.success);
    assert!(response.data.is_empty());
    assert_eq!(response.error.as_deref(), Some("Rollup file not found"));
}

#[test]
fn test_ping_failure_counts() {
    let dir = TempDir::new().unwrap();
    let collector = ping_collector(&dir);
    collector.write(&[
        ping_sample(T0 + 1, "gw", 10.0),
        ping_sample(T0 + 2, "gw", 30.0),
        failed_ping(T0 + 3, "gw"),
    ]);
    // Next bucket: no explicit failure, one probe with unknown status.
    collector.write(&[
        ping_sample(T0 + 61, "gw", 10.0),
        PingSample {
            timestamp: T0 + 62,
            host: Some("gw".into()),
            latency: None,
            status: None,
        },
    ]);
    collector.process_rollup_at(T0 + 150);

    let data = collector.get_metrics_at(1, None, T0 + 150).data;
    assert_eq!(data.len(), 2);
    assert_eq!(data[0].sample_count, 3);
    assert_eq!(data[0].success_count, 2);
    assert_eq!(data[0].failure_count, 1);
    assert_eq!(data[0].avg_latency, Some(20.0));
    assert_eq!(data[1].sample_count, 2);
    assert_eq!(data[1].success_count, 1);
    assert_eq!(data[1].failure_count, 1);
}

#[test]
fn test_ping_entity_filters() {
    let dir = TempDir::new().unwrap();
    let collector = ping_collector(&dir);
    collector.write(&[
        ping_sample(T0 + 1, "gw", 10.0),
        ping_sample(T0 + 2, "dns", 30.0),
        ping_sample(T0 + 3, "gw", 12.0),
    ]);
    collector.process_rollup_at(T0 + 120);

    assert_eq!(collector.get_metrics_at(1, Some("dns"), T0 + 120).data.len(), 1);
    let missing = collector.get_metrics_at(1, Some("nowhere"), T0 + 120);
    assert!(missing.success);
    assert!(missing.data.is_empty());

    let raw = collector.get_raw_metrics_at(1, Some("gw"), T0 + 120);
    assert!(raw.success);
    assert_eq!(raw.count, 2);
    assert_eq!(raw.entity.as_deref(), Some("gw"));
    assert!(raw.data.iter().all(|s| s.host.as_deref() == Some("gw")));

    // Raw window is [now - hours, now].
    let raw = collector.get_raw_metrics_at(1, None, T0 + 3600 + 2);
    assert_eq!(raw.count, 2);
}

#[test]
fn test_ping_write_failure_returns_false() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let collector = PingCollector::ping(blocker.join("ping"), hours_to_secs(25));
    assert!(!collector.write_one(ping_sample(T0, "gw", 1.0)));
    assert!(collector.init_at(T0).is_err());
}

#[test]
fn test_ping_raw_log_is_rotated_after_rollup() {
    let dir = TempDir::new().unwrap();
    let collector = PingCollector::ping(dir.path().join("ping"), hours_to_secs(1));
    collector.init_at(T0 - 7200).unwrap();
    collector.write(&[
        ping_sample(T0 - 7000, "gw", 1.0),
        ping_sample(T0 + 5, "gw", 1.0),
    ]);
    let report = collector.process_rollup_at(T0 + 120);
    assert_eq!(report.raw_rotation.purged, 1);
    assert_eq!(report.raw_rotation.kept, 1);
    assert_eq!(collector.read_raw(0).len(), 1);
}

#[test]
fn test_ping_tiers_info() {
    let dir = TempDir::new().unwrap();
    let collector = ping_collector(&dir);
    collector.write_one(ping_sample(T0 + 5, "gw", 20.0));
    collector.process_rollup_at(T0 + 120);

    let info = collector.get_rollup_tiers_info();
    let names: Vec<_> = info.keys().cloned().collect();
    assert_eq!(names, vec!["1min", "2hour", "30min", "5min"]);
    assert!(info["1min"].file_exists);
    assert!(info["1min"].file_size > 0);
    assert!(!info["5min"].file_exists);
    assert_eq!(info["30min"].retention_label, "14 days");
}

#[test]
fn test_ping_policy_aggregates_empty_bucket_to_nothing() {
    assert!(PingPolicy.aggregate_for_rollup(&[], T0, 60).is_empty());
}

// ---- multi-sync ping ----

fn observation(host: &str, latency: Option<f64>, success: bool) -> PingObservation {
    PingObservation {
        hostname: host.to_string(),
        address: format!("10.0.0.{}", host.len()),
        latency,
        success,
    }
}

#[test]
fn test_multisync_rollup_per_host_with_jitter() {
    let dir = TempDir::new().unwrap();
    let mut collector =
        MultiSyncPingCollector::multisync(dir.path().join("multisync-ping"), hours_to_secs(25));
    collector.init_at(T0).unwrap();

    assert!(collector.record_results(
        &[
            observation("alpha", Some(50.0), true),
            observation("b", None, false),
            PingObservation {
                hostname: "ghost".into(),
                address: String::new(),
                latency: Some(1.0),
                success: true,
            },
        ],
        T0 + 5,
    ));
    assert!(collector.record_results(
        &[
            observation("alpha", Some(60.0), true),
            observation("b", Some(25.0), true),
        ],
        T0 + 10,
    ));

    let raw = collector.read_raw(0);
    assert_eq!(raw.len(), 4);
    assert!(raw.iter().all(|s| s.hostname.as_deref() != Some("ghost")));
    let alpha: Vec<_> = raw
        .iter()
        .filter(|s| s.hostname.as_deref() == Some("alpha"))
        .map(|s| s.jitter)
        .collect();
    assert_eq!(alpha, vec![None, Some(0.63)]);
    let failed = raw
        .iter()
        .find(|s| s.hostname.as_deref() == Some("b") && s.timestamp == T0 + 5)
        .unwrap();
    assert_eq!(failed.status, Some(PingStatus::Failure));
    assert_eq!(failed.jitter, None);

    let report = collector.process_rollup_at(T0 + 120);
    assert_eq!(report.records(), 2);

    let data = collector.get_metrics_at(1, None, T0 + 120).data;
    let hosts: Vec<_> = data.iter().map(|r| r.hostname.as_str()).collect();
    assert_eq!(hosts, vec!["alpha", "b"]);

    let alpha = &data[0];
    assert_eq!(alpha.address, "10.0.0.5");
    assert_eq!(alpha.sample_count, 2);
    assert_eq!(alpha.success_count, 2);
    assert_eq!(alpha.failure_count, 0);
    assert_eq!(alpha.min_latency, Some(50.0));
    assert_eq!(alpha.max_latency, Some(60.0));
    assert_eq!(alpha.avg_latency, Some(55.0));
    assert_eq!(alpha.avg_jitter, Some(0.63));
    assert_eq!(alpha.max_jitter, Some(0.63));

    let b = &data[1];
    assert_eq!(b.sample_count, 2);
    assert_eq!(b.success_count, 1);
    assert_eq!(b.failure_count, 1);
    assert_eq!(b.avg_latency, Some(25.0));
    assert_eq!(b.avg_jitter, None);

    let only_b = collector.get_metrics_at(1, Some("b"), T0 + 120).data;
    assert_eq!(only_b.len(), 1);
    assert_eq!(only_b[0].hostname, "b");
}

// ---- network quality ----

fn nq_sample(
    ts: i64,
    host: &str,
    latency: f64,
    received: Option<u64>,
    playing: bool,
    step: Option<i64>,
) -> NetworkQualitySample {
    NetworkQualitySample {
        address: Some("192.168.1.20".into()),
        latency: Some(latency),
        remote_packets_received: received,
        is_playing: Some(playing),
        step_time: step,
        ..NetworkQualitySample::new(ts, host)
    }
}

#[test]
fn test_expected_sync_rate_from_step_time() {
    let policy = NetworkQualityPolicy::default();
    assert_eq!(policy.expected_sync_rate(Some(50)), 2.0);
    assert_eq!(policy.expected_sync_rate(Some(25)), 4.0);
    assert_eq!(policy.expected_sync_rate(None), 2.0);
    assert_eq!(policy.expected_sync_rate(Some(0)), 2.0);
    assert_eq!(policy.expected_sync_rate(Some(100_000)), 0.1);
}

#[test]
fn test_zero_default_sync_rate_is_clamped() {
    let policy = NetworkQualityPolicy::new(QualityConfig::default(), 0.0, 10);
    assert_eq!(policy.expected_sync_rate(None), 0.1);

    // Counter stalls for 10s: one packet expected, none received.
    let samples = vec![
        nq_sample(T0, "fpp1", 10.0, Some(100), true, None),
        nq_sample(T0 + 10, "fpp1", 10.0, Some(100), true, None),
    ];
    let r = &policy.aggregate_for_rollup(&samples, T0, 60).into_records()[0];
    assert_eq!(r.receive_rate, Some(0.0));
    assert_eq!(r.packet_loss_pct, Some(100.0));
}

#[test]
fn test_network_quality_no_loss_when_counter_keeps_pace() {
    let policy = NetworkQualityPolicy::default();
    let samples = vec![
        nq_sample(T0, "fpp1", 10.0, Some(0), true, Some(50)),
        nq_sample(T0 + 5, "fpp1", 20.0, Some(10), true, Some(50)),
        nq_sample(T0 + 10, "fpp1", 30.0, Some(20), true, Some(50)),
    ];
    let records = policy.aggregate_for_rollup(&samples, T0, 60).into_records();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.hostname, "fpp1");
    assert_eq!(r.timestamp, T0);
    assert_eq!(r.period_end, T0 + 60);
    assert_eq!(r.sample_count, 3);
    assert_eq!(r.latency_min, Some(10.0));
    assert_eq!(r.latency_max, Some(30.0));
    assert_eq!(r.latency_avg, Some(20.0));
    assert_eq!(r.latency_p95, Some(30.0));
    assert_eq!(r.latency_quality, Some(QualityRating::Good));
    assert_eq!(r.jitter_avg, Some(0.92));
    assert_eq!(r.jitter_max, Some(1.21));
    assert_eq!(r.receive_rate, Some(2.0));
    assert_eq!(r.packet_loss_pct, Some(0.0));
    assert_eq!(r.packet_loss_quality, Some(QualityRating::Good));
    assert_eq!(r.overall_quality, QualityRating::Good);
}

#[test]
fn test_network_quality_loss_from_counter_shortfall() {
    let policy = NetworkQualityPolicy::default();
    let samples = vec![
        nq_sample(T0, "fpp1", 10.0, Some(100), true, None),
        nq_sample(T0 + 10, "fpp1", 10.0, Some(110), true, None),
    ];
    let r = &policy.aggregate_for_rollup(&samples, T0, 60).into_records()[0];
    assert_eq!(r.receive_rate, Some(1.0));
    assert_eq!(r.packet_loss_pct, Some(50.0));
    assert_eq!(r.packet_loss_quality, Some(QualityRating::Critical));
    assert_eq!(r.overall_quality, QualityRating::Critical);

    // Faster sequence: 4 packets/s expected, 2 received.
    let fast = vec![
        nq_sample(T0, "fpp1", 10.0, Some(0), true, Some(25)),
        nq_sample(T0 + 10, "fpp1", 10.0, Some(20), true, Some(25)),
    ];
    let r = &policy.aggregate_for_rollup(&fast, T0, 60).into_records()[0];
    assert_eq!(r.packet_loss_pct, Some(50.0));
}

#[test]
fn test_network_quality_counter_reset_gives_no_loss_figure() {
    let policy = NetworkQualityPolicy::default();
    let samples = vec![
        nq_sample(T0, "fpp1", 10.0, Some(1000), true, None),
        nq_sample(T0 + 5, "fpp1", 10.0, Some(1010), true, None),
        nq_sample(T0 + 10, "fpp1", 10.0, Some(50), true, None),
    ];
    let r = &policy.aggregate_for_rollup(&samples, T0, 60).into_records()[0];
    assert_eq!(r.packet_loss_pct, None);
    assert_eq!(r.receive_rate, None);
    assert_eq!(r.packet_loss_quality, None);
    assert_eq!(r.overall_quality, QualityRating::Good);
}

#[test]
fn test_network_quality_ignores_idle_samples_for_loss() {
    let policy = NetworkQualityPolicy::default();
    let samples = vec![
        nq_sample(T0, "fpp1", 10.0, Some(0), false, None),
        nq_sample(T0 + 10, "fpp1", 10.0, Some(20), true, None),
    ];
    let r = &policy.aggregate_for_rollup(&samples, T0, 60).into_records()[0];
    assert_eq!(r.sample_count, 2);
    assert_eq!(r.packet_loss_pct, None);

    let single = vec![nq_sample(T0, "fpp1", 10.0, Some(0), true, None)];
    let r = &policy.aggregate_for_rollup(&single, T0, 60).into_records()[0];
    assert_eq!(r.packet_loss_pct, None);
    assert_eq!(r.jitter_avg, None);
}

#[test]
fn test_network_quality_one_record_per_host_sorted() {
    let policy = NetworkQualityPolicy::default();
    let samples = vec![
        nq_sample(T0 + 1, "zeta", 10.0, None, true, None),
        nq_sample(T0 + 2, "alpha", 300.0, None, true, None),
    ];
    let records = policy.aggregate_for_rollup(&samples, T0, 60).into_records();
    let hosts: Vec<_> = records.iter().map(|r| r.hostname.as_str()).collect();
    assert_eq!(hosts, vec!["alpha", "zeta"]);
    assert_eq!(records[0].latency_quality, Some(QualityRating::Critical));
    assert_eq!(records[0].overall_quality, QualityRating::Critical);
}

fn quality_observation(latency: f64, received: u64) -> QualityObservation {
    QualityObservation {
        hostname: "fpp1".into(),
        address: "192.168.1.20".into(),
        latency: Some(latency),
        player_packets_sent: Some(received),
        remote_packets_received: Some(received),
        is_playing: true,
        step_time: Some(50),
    }
}

#[test]
fn test_network_quality_status_and_rollup() {
    let dir = TempDir::new().unwrap();
    let mut collector = NetworkQualityCollector::network_quality(
        dir.path().join("network-quality"),
        NetworkQualityPolicy::default(),
        hours_to_secs(25),
    );
    collector.init_at(T0).unwrap();

    let empty = collector.get_status_at(T0 + 20);
    assert!(empty.success);
    assert!(empty.hosts.is_empty());
    assert_eq!(empty.summary.overall_quality, "unknown");
    assert_eq!(empty.summary.avg_latency, None);

    assert!(collector.record(&[quality_observation(30.0, 0)], T0 + 5));
    assert!(collector.record(&[quality_observation(40.0, 10)], T0 + 10));

    let raw = collector.read_raw(0);
    assert_eq!(raw.len(), 2);
    assert_eq!(raw[0].jitter, None);
    assert_eq!(raw[1].jitter, Some(0.63));
    assert_eq!(raw[1].latency_quality, Some(QualityRating::Good));
    assert_eq!(raw[1].jitter_quality, Some(QualityRating::Good));

    let status = collector.get_status_at(T0 + 20);
    assert_eq!(status.hosts.len(), 1);
    assert_eq!(status.summary.avg_latency, Some(35.0));
    assert_eq!(status.summary.avg_packet_loss, Some(0.0));
    assert_eq!(status.summary.overall_quality, "good");

    collector.process_rollup_at(T0 + 120);
    let response = collector.get_metrics_at(1, Some("fpp1"), T0 + 120);
    assert_eq!(response.data.len(), 1);
    assert_eq!(response.data[0].latency_avg, Some(35.0));
    assert_eq!(response.data[0].packet_loss_pct, Some(0.0));
}

#[test]
fn test_network_quality_raw_lines_use_camel_case() {
    let dir = TempDir::new().unwrap();
    let mut collector = NetworkQualityCollector::network_quality(
        dir.path().join("network-quality"),
        NetworkQualityPolicy::default(),
        hours_to_secs(25),
    );
    collector.record(&[quality_observation(30.0, 0)], T0 + 5);
    let text = std::fs::read_to_string(&collector.paths().raw).unwrap();
    assert!(text.contains("\"remotePacketsReceived\":0"));
    assert!(text.contains("\"isPlaying\":true"));
    assert!(text.contains("\"stepTime\":50"));
}

// ---- voltage ----

#[test]
fn test_voltage_reads_legacy_and_rail_samples() {
    let dir = TempDir::new().unwrap();
    let collector = VoltageCollector::voltage(dir.path().join("voltage"), 1, hours_to_secs(6));
    collector.init_at(T0).unwrap();
    std::fs::write(
        &collector.paths().raw,
        format!("[2023-11-14 22:00:05] {{\"timestamp\":{},\"voltage\":5.1}}\n", T0 + 5),
    )
    .unwrap();
    let rails = BTreeMap::from([("core".to_string(), 5.2), ("io".to_string(), 3.3)]);
    assert!(collector.write_voltages(&rails, T0 + 10));

    let raw = collector.read_raw(0);
    assert_eq!(raw.len(), 2);
    assert!(raw[0].voltages.contains_key("core"));

    let report = collector.process_rollup_at(T0 + 120);
    assert_eq!(report.tiers.len(), 1);
    assert_eq!(report.records(), 1);

    let record = &collector.get_metrics_at(1, None, T0 + 120).data[0];
    assert_eq!(record.interval, 60);
    assert_eq!(
        record.voltages["core"],
        ChannelSummary {
            avg: 5.15,
            min: 5.1,
            max: 5.2,
            peak: None,
            samples: 2,
        }
    );
    assert_eq!(record.voltages["io"].avg, 3.3);
    assert_eq!(record.voltages["io"].samples, 1);

    let io = collector.get_metrics_at(1, Some("io"), T0 + 120).data;
    assert_eq!(io.len(), 1);
    assert_eq!(io[0].voltages.keys().collect::<Vec<_>>(), vec!["io"]);
    assert!(collector.get_metrics_at(1, Some("aux"), T0 + 120).data.is_empty());
}

#[test]
fn test_voltage_tiers_grow_with_retention() {
    let dir = TempDir::new().unwrap();
    let collector = VoltageCollector::voltage(dir.path().join("voltage"), 10, hours_to_secs(6));
    let info = collector.get_rollup_tiers_info();
    assert_eq!(info.len(), 4);
    assert_eq!(info["2hour"].retention_label, "10 days");
    assert_eq!(info["30min"].retention_label, "7 days");
}

// ---- efuse ----

#[test]
fn test_efuse_total_and_peak() {
    let dir = TempDir::new().unwrap();
    let collector = PortCollector::efuse(dir.path().join("efuse"), 7, hours_to_secs(6));
    collector.init_at(T0).unwrap();
    let first = BTreeMap::from([("p1".to_string(), 100.0), ("p2".to_string(), 50.0)]);
    let second = BTreeMap::from([("p1".to_string(), 300.0), ("p2".to_string(), 51.0)]);
    assert!(collector.write_ports(&first, T0 + 5));
    assert!(collector.write_ports(&second, T0 + 10));

    let raw = collector.read_raw(0);
    assert_eq!(raw[0].ports[TOTAL_PORT].as_summary().avg, 150.0);

    collector.process_rollup_at(T0 + 120);
    let record = &collector.get_metrics_at(1, None, T0 + 120).data[0];
    let p1 = record.ports["p1"];
    assert_eq!(p1.avg, 200.0);
    assert_eq!(p1.min, 100.0);
    assert_eq!(p1.max, 300.0);
    assert_eq!(p1.peak, Some(300.0));
    assert_eq!(p1.samples, 2);
    assert_eq!(record.ports["p2"].avg, 51.0);
    let total = record.ports[TOTAL_PORT];
    assert_eq!(total.avg, 251.0);
    assert_eq!(total.peak, Some(351.0));

    let only_total = collector.get_metrics_at(1, Some(TOTAL_PORT), T0 + 120).data;
    assert_eq!(only_total[0].ports.len(), 1);
}

#[test]
fn test_efuse_keeps_supplied_total() {
    let dir = TempDir::new().unwrap();
    let collector = PortCollector::efuse(dir.path().join("efuse"), 7, hours_to_secs(6));
    let readings = BTreeMap::from([("p1".to_string(), 1.0), (TOTAL_PORT.to_string(), 99.0)]);
    assert!(collector.write_ports(&readings, T0));
    let raw = collector.read_raw(0);
    assert_eq!(raw[0].ports[TOTAL_PORT].as_summary().avg, 99.0);
    assert!(collector.write_ports(&BTreeMap::new(), T0));
    assert_eq!(collector.read_raw(0).len(), 1);
}

#[test]
fn test_efuse_tiers_capped_by_retention() {
    let dir = TempDir::new().unwrap();
    let collector = PortCollector::efuse(dir.path().join("efuse"), 7, hours_to_secs(6));
    let info = collector.get_rollup_tiers_info();
    assert_eq!(info["2hour"].retention_label, "7 days");
    assert_eq!(info["1min"].retention_label, "6 hours");
}

// ---- collector set ----

fn config_for(dir: &TempDir, extra: &str) -> AppConfig {
    let toml = format!(
        "[storage]\ndata_dir = \"{}\"\n{}",
        dir.path().join("data").display(),
        extra
    );
    AppConfig::load_from_str(&toml).unwrap()
}

#[test]
fn test_collector_set_from_config() {
    let dir = TempDir::new().unwrap();
    let set = CollectorSet::from_config(&config_for(&dir, ""));
    assert_eq!(
        set.names(),
        vec!["ping", "multisync-ping", "network-quality", "voltage", "efuse"]
    );

    let set = CollectorSet::from_config(&config_for(
        &dir,
        "[voltage]\nenabled = false\n[efuse]\nenabled = false\n",
    ));
    assert_eq!(set.len(), 3);
    assert!(!set.names().contains(&"voltage"));
}

#[test]
fn test_collector_set_init_and_rollup() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, "");
    let set = CollectorSet::from_config(&config);
    set.init_at(T0).unwrap();
    for name in ["ping", "multisync-ping", "network-quality", "voltage", "efuse"] {
        assert!(
            config
                .storage
                .collector_dir(name)
                .join("rollup-state.json")
                .exists(),
            "{name}"
        );
    }

    let ping = PingCollector::ping(config.storage.collector_dir("ping"), hours_to_secs(25));
    ping.write_one(ping_sample(T0 + 5, "gw", 10.0));
    assert_eq!(set.run_rollup_at(T0 + 120), 1);
    assert_eq!(set.run_rollup_at(T0 + 180), 0);
}
