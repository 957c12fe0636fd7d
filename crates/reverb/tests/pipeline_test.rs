//! Reply pipeline: statuses, ordering and deduplication.

use async_trait::async_trait;
use reverb::{EngageContext, PathsConfig, ReplyPipeline, ReverbConfig};
use reverb_core::{
    ChannelSink, CollectedItem, Credential, MediaRefs, NullSink, ProgressEvent, ReviewStatus,
};
use reverb_error::{GenerationError, GenerationErrorKind};
use reverb_models::{ContentGenerator, GenerationRequest};
use reverb_rate_limit::{ApiCallTracker, ApiKeyPool};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Replies with the last prompt line; posts mentioning `boom` fail and posts
/// mentioning `slow` take a while.
struct EchoGenerator;

#[async_trait]
impl ContentGenerator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(
        &self,
        _credential: &Credential,
        _model: &str,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError> {
        let post = request.prompt().lines().last().unwrap_or_default().to_string();
        if post.contains("slow") {
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        if post.contains("boom") {
            return Err(GenerationError::new(GenerationErrorKind::ResponseParsing(
                "unexpected body".into(),
            )));
        }
        Ok(format!("Re: {post}"))
    }
}

fn context(dir: &TempDir, keys: &str) -> EngageContext {
    let config =
        ReverbConfig::default().with_paths(PathsConfig::default().with_base_dir(dir.path()));
    let tracker =
        ApiCallTracker::open(config.paths().call_log(), config.quotas().clone()).unwrap();
    let pool = ApiKeyPool::new(Credential::parse_list(keys), config.pool());
    EngageContext::from_parts(config, pool, tracker, Arc::new(NullSink))
}

fn pipeline(context: &EngageContext) -> ReplyPipeline {
    let generator = Arc::new(context.guarded(Arc::new(EchoGenerator)));
    ReplyPipeline::new(generator, "Reply kindly.")
}

fn item(id: &str, text: &str) -> CollectedItem {
    CollectedItem::builder()
        .id(id)
        .url(format!("https://x.com/someone/status/{id}"))
        .text(text)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_entries_carry_status_and_metadata() {
    let dir = TempDir::new().unwrap();
    let context = context(&dir, "key-aaaa");
    let queue = context.review_queue("alice");

    let items = vec![item("1", "nice weather"), item("2", "boom")];
    let summary = pipeline(&context)
        .run(&queue, "alice", &items, Some(3))
        .await
        .unwrap();

    assert_eq!(*summary.generated(), 1);
    assert_eq!(*summary.failed(), 1);
    assert_eq!(*summary.no_api_key(), 0);

    let ok = queue.get("1").await.unwrap();
    assert_eq!(*ok.status(), ReviewStatus::ReadyForApproval);
    assert_eq!(ok.generated_reply(), "Re: nice weather");
    assert_eq!(ok.tweet_url(), "https://x.com/someone/status/1");
    assert_eq!(ok.profile(), "alice");
    assert_eq!(*ok.run_number(), Some(3));
    assert!(ok.scraped_date().is_some());

    let failed = queue.get("2").await.unwrap();
    assert_eq!(*failed.status(), ReviewStatus::AnalysisFailed);
    assert!(failed.generated_reply().starts_with("Error: "));

    let records = context.tracker().records();
    assert_eq!(records.len(), 2);
    assert_eq!(records.iter().filter(|r| *r.success()).count(), 1);
}

#[tokio::test]
async fn test_empty_pool_marks_no_api_key() {
    let dir = TempDir::new().unwrap();
    let context = context(&dir, "");
    let queue = context.review_queue("alice");

    let summary = pipeline(&context)
        .run(&queue, "alice", &[item("1", "hello")], None)
        .await
        .unwrap();

    assert_eq!(*summary.no_api_key(), 1);
    let entry = queue.get("1").await.unwrap();
    assert_eq!(*entry.status(), ReviewStatus::NoApiKey);
    assert!(entry.generated_reply().starts_with("Error: "));
    assert!(context.tracker().records().is_empty());
}

#[tokio::test]
async fn test_entries_are_appended_in_completion_order() {
    let dir = TempDir::new().unwrap();
    let context = context(&dir, "key-aaaa");
    let queue = context.review_queue("alice");

    let items = vec![item("1", "slow thoughts"), item("2", "quick take")];
    pipeline(&context)
        .with_workers(2)
        .run(&queue, "alice", &items, None)
        .await
        .unwrap();

    let ids: Vec<String> = queue
        .list(None)
        .await
        .unwrap()
        .iter()
        .map(|entry| entry.tweet_id().clone())
        .collect();
    assert_eq!(ids, vec!["2", "1"]);
}

#[tokio::test]
async fn test_queued_and_repeated_items_are_skipped() {
    let dir = TempDir::new().unwrap();
    let context = context(&dir, "key-aaaa");
    let queue = context.review_queue("alice");
    let pipeline = pipeline(&context);

    let items = vec![item("1", "first"), item("1", "first again"), item("2", "second")];
    let first = pipeline.run(&queue, "alice", &items, None).await.unwrap();
    assert_eq!(*first.generated(), 2);
    assert_eq!(*first.skipped(), 1);

    let second = pipeline.run(&queue, "alice", &items, None).await.unwrap();
    assert_eq!(*second.generated(), 0);
    assert_eq!(*second.skipped(), 3);
    assert_eq!(queue.list(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_progress_events_bracket_each_item() {
    let dir = TempDir::new().unwrap();
    let context = context(&dir, "key-aaaa");
    let queue = context.review_queue("alice");
    let (sink, mut events) = ChannelSink::new();

    pipeline(&context)
        .with_sink(Arc::new(sink))
        .run(&queue, "alice", &[item("7", "hello")], None)
        .await
        .unwrap();

    assert_eq!(
        events.try_recv().unwrap(),
        ProgressEvent::GenerationStarted {
            item_id: "7".into()
        }
    );
    assert_eq!(
        events.try_recv().unwrap(),
        ProgressEvent::GenerationFinished {
            item_id: "7".into(),
            status: "ready_for_approval".into()
        }
    );
}

#[test]
fn test_request_attaches_local_images_only() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("photo.png");
    std::fs::write(&image, b"\x89PNG").unwrap();

    let context = context(&dir, "key-aaaa");
    let item = CollectedItem::builder()
        .id("9")
        .url("https://x.com/someone/status/9")
        .text("look at this")
        .media(MediaRefs::Images(vec![
            image.display().to_string(),
            "https://pbs.twimg.com/media/abc.jpg".to_string(),
        ]))
        .build()
        .unwrap();

    let request = pipeline(&context).request_for(&item);
    assert!(request.prompt().starts_with("Reply kindly."));
    assert!(request.prompt().ends_with("look at this"));
    assert_eq!(request.media().len(), 1);
    assert_eq!(request.media()[0].path(), &image);
}

#[tokio::test]
async fn test_media_is_kept_in_legacy_form() {
    let dir = TempDir::new().unwrap();
    let context = context(&dir, "key-aaaa");
    let queue = context.review_queue("alice");

    let with_video = CollectedItem::builder()
        .id("5")
        .url("https://x.com/someone/status/5")
        .text("watch")
        .media(MediaRefs::Video)
        .build()
        .unwrap();
    pipeline(&context)
        .run(&queue, "alice", &[with_video], None)
        .await
        .unwrap();

    let entry = queue.get("5").await.unwrap();
    assert_eq!(entry.extra().get("media"), Some(&serde_json::json!("video")));
}
