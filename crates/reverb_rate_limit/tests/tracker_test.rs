//! Call ledger windows, persistence and quota lookups.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use reverb_rate_limit::{
    ApiCallTracker, CallKey, Decision, KeyedBy, ManualClock, QuotaLimits, QuotaTable,
    RESPONSE_EXCERPT_CHARS, ServiceQuota,
};
use std::sync::Arc;
use tempfile::TempDir;

fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, day)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

fn quotas() -> QuotaTable {
    QuotaTable::empty()
        .with_service(
            "gemini",
            ServiceQuota::new(KeyedBy::Model)
                .with_limit("small", QuotaLimits::new(2, None, Some(3))),
        )
        .with_service(
            "sheets",
            ServiceQuota::new(KeyedBy::Method).with_limit("write", QuotaLimits::new(1, None, None)),
        )
}

fn generate() -> CallKey {
    CallKey::new("gemini", "generate").with_model("small")
}

fn tracker(dir: &TempDir, clock: Arc<ManualClock>) -> ApiCallTracker {
    ApiCallTracker::with_clock(dir.path().join("logs/api_calls_log.json"), quotas(), clock)
        .expect("tracker opens")
}

#[tokio::test]
async fn test_rpm_ceiling_denies_then_recovers() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(at(10, 12, 0, 0)));
    let tracker = tracker(&dir, Arc::clone(&clock));

    assert!(tracker.can_make_call(&generate()).is_allowed());
    tracker.record_call(&generate(), true, Some("ok")).await.unwrap();
    clock.advance(TimeDelta::seconds(20));
    tracker.record_call(&generate(), false, Some("429")).await.unwrap();

    let decision = tracker.can_make_call(&generate());
    assert_eq!(
        decision,
        Decision::Denied("Rate limit (RPM) exceeded for gemini/generate (model: small).".into())
    );

    // The first call leaves the window 60s after it was made.
    clock.advance(TimeDelta::seconds(41));
    assert!(tracker.can_make_call(&generate()).is_allowed());
}

#[tokio::test]
async fn test_rpd_ceiling_resets_at_local_midnight() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(at(10, 23, 50, 0)));
    let tracker = tracker(&dir, Arc::clone(&clock));

    for _ in 0..3 {
        tracker.record_call(&generate(), true, None).await.unwrap();
        clock.advance(TimeDelta::minutes(2));
    }
    let decision = tracker.can_make_call(&generate());
    assert!(decision.to_string().starts_with("Rate limit (RPD) exceeded"));

    clock.set(at(11, 0, 0, 1));
    assert!(tracker.can_make_call(&generate()).is_allowed());
    let info = tracker.get_quota_info(&generate()).unwrap();
    assert_eq!(*info.rpd_current(), 0);
    assert_eq!(*info.rpd_remaining(), Some(3));
}

#[tokio::test]
async fn test_counts_respect_model_and_key_suffix() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(at(10, 9, 0, 0)));
    let tracker = tracker(&dir, clock);

    tracker
        .record_call(&generate().with_key_suffix("aaaa"), true, None)
        .await
        .unwrap();
    tracker
        .record_call(&generate().with_key_suffix("aaaa"), true, None)
        .await
        .unwrap();

    assert!(!tracker.can_make_call(&generate()).is_allowed());
    assert!(!tracker
        .can_make_call(&generate().with_key_suffix("aaaa"))
        .is_allowed());
    assert!(tracker
        .can_make_call(&generate().with_key_suffix("bbbb"))
        .is_allowed());
}

#[tokio::test]
async fn test_method_keyed_service_ignores_model() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(at(10, 9, 0, 0)));
    let tracker = tracker(&dir, clock);
    let write = CallKey::new("sheets", "write");

    tracker
        .record_call(&write.clone().with_model("irrelevant"), true, None)
        .await
        .unwrap();
    assert!(!tracker.can_make_call(&write).is_allowed());

    let info = tracker.get_quota_info(&write).unwrap();
    assert_eq!(*info.rpd_limit(), None);
    assert_eq!(*info.rpd_remaining(), None);
    assert!(info.to_string().contains("unlimited"));
}

#[test]
fn test_unknown_tuples_are_reported_as_unknown() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(at(10, 9, 0, 0)));
    let tracker = tracker(&dir, clock);

    let decision = tracker.can_make_call(&CallKey::new("gemini", "generate").with_model("huge"));
    assert_eq!(decision, Decision::Unknown("Unknown Gemini model: huge".into()));

    let decision = tracker.can_make_call(&CallKey::new("smtp", "send"));
    assert_eq!(decision, Decision::Unknown("Unknown service: smtp".into()));
    assert!(!decision.is_allowed());

    assert!(tracker.get_quota_info(&CallKey::new("smtp", "send")).is_err());
}

#[tokio::test]
async fn test_reload_preserves_decisions() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(at(10, 9, 0, 0)));

    let before = {
        let tracker = tracker(&dir, Arc::clone(&clock));
        tracker.record_call(&generate(), true, Some("first")).await.unwrap();
        tracker.record_call(&generate(), true, Some("second")).await.unwrap();
        (
            tracker.can_make_call(&generate()),
            tracker.get_quota_info(&generate()).unwrap(),
        )
    };

    let reloaded = tracker(&dir, Arc::clone(&clock));
    assert_eq!(reloaded.records().len(), 2);
    assert_eq!(reloaded.can_make_call(&generate()), before.0);
    assert_eq!(reloaded.get_quota_info(&generate()).unwrap(), before.1);
}

#[tokio::test]
async fn test_save_prunes_records_older_than_two_days() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(at(10, 9, 0, 0)));
    let tracker = tracker(&dir, Arc::clone(&clock));

    tracker.record_call(&generate(), true, Some("old")).await.unwrap();
    clock.advance(TimeDelta::hours(49));
    tracker.record_call(&generate(), true, Some("new")).await.unwrap();

    let raw = std::fs::read_to_string(tracker.log_file()).unwrap();
    let saved: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0]["response"], "new");
    assert_eq!(saved[0]["model"], "small");
}

#[test]
fn test_corrupt_log_starts_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("api_calls_log.json");
    std::fs::write(&path, "{ not json").unwrap();

    let clock = Arc::new(ManualClock::new(at(10, 9, 0, 0)));
    let tracker = ApiCallTracker::with_clock(&path, quotas(), clock).unwrap();
    assert!(tracker.records().is_empty());
    assert!(tracker.can_make_call(&generate()).is_allowed());
}

#[test]
fn test_legacy_records_with_extra_fields_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("api_calls_log.json");
    std::fs::write(
        &path,
        r#"[{"timestamp": "2025-06-10T08:59:30.123456", "timestamp_dt": "2025-06-10 08:59:30.123456",
            "service": "gemini", "method": "generate", "model": "small",
            "api_key_suffix": "aaaa", "success": true, "response": null}]"#,
    )
    .unwrap();

    let clock = Arc::new(ManualClock::new(at(10, 9, 0, 0)));
    let tracker = ApiCallTracker::with_clock(&path, quotas(), clock).unwrap();
    let info = tracker.get_quota_info(&generate()).unwrap();
    assert_eq!(*info.rpm_current(), 1);
}

#[tokio::test]
async fn test_response_excerpt_is_truncated() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(at(10, 9, 0, 0)));
    let tracker = tracker(&dir, clock);

    let long = "x".repeat(RESPONSE_EXCERPT_CHARS * 3);
    tracker.record_call(&generate(), true, Some(&long)).await.unwrap();
    let records = tracker.records();
    assert_eq!(
        records[0].response().as_ref().map(|r| r.chars().count()),
        Some(RESPONSE_EXCERPT_CHARS)
    );
}

#[tokio::test]
async fn test_concurrent_records_all_reach_the_file() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(at(10, 9, 0, 0)));
    let tracker = Arc::new(tracker(&dir, clock));

    let mut tasks = tokio::task::JoinSet::new();
    for n in 0..16 {
        let tracker = Arc::clone(&tracker);
        tasks.spawn(async move {
            let key = generate().with_key_suffix(format!("{n:04}"));
            tracker.record_call(&key, true, None).await
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    let raw = std::fs::read_to_string(tracker.log_file()).unwrap();
    let saved: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
    assert_eq!(saved.len(), 16);
    assert!(!tracker.log_file().with_extension("json.tmp").exists());
}
