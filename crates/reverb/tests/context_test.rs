use clap::Parser;
use reverb::cli::Cli;
use reverb::{EngageContext, PathsConfig, ReverbConfig};
use reverb_core::{ReviewEntry, ReviewStatus};
use reverb_error::ConfigErrorKind;
use tempfile::TempDir;

fn config(dir: &TempDir) -> ReverbConfig {
    ReverbConfig::default().with_paths(PathsConfig::default().with_base_dir(dir.path()))
}

#[tokio::test]
async fn test_keys_come_from_explicit_list() {
    let dir = TempDir::new().unwrap();
    let context = EngageContext::new(config(&dir), Some("first-1111, second-2222")).unwrap();

    assert_eq!(context.pool().size().await, 2);
    assert_eq!(context.pool().suffixes().await, vec!["1111", "2222"]);
    assert_eq!(
        context.tracker().log_file(),
        dir.path().join("logs").join("api_calls_log.json")
    );
}

#[tokio::test]
async fn test_review_queues_are_per_profile_and_shared() {
    let dir = TempDir::new().unwrap();
    let context = EngageContext::new(config(&dir), Some("key-0001")).unwrap();

    let entry = ReviewEntry::new(
        "42",
        "https://x.com/a/status/42",
        "post",
        "reply",
        ReviewStatus::ReadyForApproval,
        "alice",
    );
    context.review_queue("alice").append(&[entry]).await.unwrap();

    assert_eq!(context.review_queue("alice").list(None).await.unwrap().len(), 1);
    assert!(context.review_queue("bob").list(None).await.unwrap().is_empty());
    assert!(
        dir.path()
            .join("replies-x")
            .join("alice")
            .join("schedule.json")
            .is_file()
    );
}

#[test]
fn test_unusable_base_dir_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "x").unwrap();

    let config =
        ReverbConfig::default().with_paths(PathsConfig::default().with_base_dir(&blocker));
    let err = EngageContext::new(config, None).unwrap_err();
    match err.kind() {
        ConfigErrorKind::Path { path, .. } => assert!(path.ends_with("api_calls_log.json")),
        other => panic!("unexpected kind: {other}"),
    }
}

#[tokio::test]
async fn test_path_unsafe_profile_is_refused_before_any_file_is_touched() {
    let dir = TempDir::new().unwrap();
    let cli =
        Cli::try_parse_from(["reverb", "--profile", "../elsewhere", "review", "list"]).unwrap();

    let err = reverb::cli::run(cli, config(&dir)).await.unwrap_err();
    let config_err = err.downcast_ref::<reverb_error::ConfigError>().unwrap();
    assert!(matches!(config_err.kind(), ConfigErrorKind::Profile { .. }));
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_profile_queue_can_live_in_a_sheet() {
    use reverb_review::{MemorySheet, SheetBackend, SheetReviewStore};
    use std::sync::Arc;

    let dir = TempDir::new().unwrap();
    let context = EngageContext::new(config(&dir), Some("key-0001")).unwrap();
    let sheet = Arc::new(MemorySheet::new());
    context.use_review_store("alice", Arc::new(SheetReviewStore::new(sheet.clone(), "Replies")));

    let entry = ReviewEntry::new(
        "42",
        "https://x.com/a/status/42",
        "post",
        "reply",
        ReviewStatus::ReadyForApproval,
        "alice",
    );
    context.review_queue("alice").append(&[entry]).await.unwrap();
    context.review_queue("alice").approve("42").await.unwrap();

    let rows = sheet.read_rows("Replies").await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[1].iter().any(|cell| cell == "approved"));
    assert!(!dir.path().join("replies-x").join("alice").exists());
}
