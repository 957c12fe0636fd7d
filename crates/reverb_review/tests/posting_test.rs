//! The posting flow over a review queue.

use async_trait::async_trait;
use reverb_core::{Platform, ReviewEntry, ReviewStatus};
use reverb_error::{PostError, PostErrorKind};
use reverb_review::{
    JsonFileStore, PostSummary, ReplyPoster, ReviewErrorKind, ReviewQueue, ReviewStore,
    post_approved,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Replies with a scripted outcome per target and records what it was asked.
struct ScriptedPoster {
    outcomes: HashMap<String, PostErrorKind>,
    posted: Mutex<Vec<String>>,
    texts: Mutex<Vec<String>>,
    queue_file: Option<std::path::PathBuf>,
    statuses_seen: Mutex<Vec<Vec<ReviewStatus>>>,
    pending_edit: Mutex<Option<(ReviewQueue, String, String)>>,
}

impl ScriptedPoster {
    fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
            posted: Mutex::new(Vec::new()),
            texts: Mutex::new(Vec::new()),
            queue_file: None,
            statuses_seen: Mutex::new(Vec::new()),
            pending_edit: Mutex::new(None),
        }
    }

    /// Edits entry `id` in `queue` while the first reply is being posted.
    fn editing(self, queue: &ReviewQueue, id: &str, reply: &str) -> Self {
        *self.pending_edit.lock().unwrap() = Some((queue.clone(), id.into(), reply.into()));
        self
    }

    fn failing(mut self, id: &str, kind: PostErrorKind) -> Self {
        self.outcomes.insert(id.to_string(), kind);
        self
    }

    fn watching(mut self, path: std::path::PathBuf) -> Self {
        self.queue_file = Some(path);
        self
    }
}

#[async_trait]
impl ReplyPoster for ScriptedPoster {
    fn platform(&self) -> Platform {
        Platform::X
    }

    async fn post_reply(&self, target_id: &str, text: &str) -> Result<(), PostError> {
        self.texts.lock().unwrap().push(text.to_string());
        let edit = self.pending_edit.lock().unwrap().take();
        if let Some((queue, id, reply)) = edit {
            queue.edit(&id, &reply).await.unwrap();
        }
        if let Some(path) = &self.queue_file {
            let entries = JsonFileStore::new(path).load_all().await.unwrap();
            self.statuses_seen
                .lock()
                .unwrap()
                .push(entries.iter().map(|e| *e.status()).collect());
        }
        if let Some(kind) = self.outcomes.get(target_id) {
            return Err(PostError::new(kind.clone()));
        }
        self.posted.lock().unwrap().push(target_id.to_string());
        Ok(())
    }
}

fn approved(id: &str) -> ReviewEntry {
    ReviewEntry::new(id, "", "text", format!("reply {id}"), ReviewStatus::Approved, "alice")
}

async fn queue(dir: &TempDir, entries: &[ReviewEntry]) -> (ReviewQueue, std::path::PathBuf) {
    let path = dir.path().join("schedule.json");
    let store = Arc::new(JsonFileStore::new(&path));
    store.append(entries).await.unwrap();
    (ReviewQueue::new(store), path)
}

#[tokio::test]
async fn test_outcomes_map_to_statuses() {
    let dir = TempDir::new().unwrap();
    let (queue, _) = queue(
        &dir,
        &[
            approved("1"),
            approved("2"),
            approved("3"),
            approved("4"),
            ReviewEntry::new("5", "", "text", "", ReviewStatus::Approved, "alice"),
            ReviewEntry::new("6", "", "text", "r", ReviewStatus::ReadyForApproval, "alice"),
        ],
    )
    .await;
    let poster = ScriptedPoster::new()
        .failing("2", PostErrorKind::TargetNotFound("deleted".into()))
        .failing(
            "3",
            PostErrorKind::Api {
                status: 403,
                message: "duplicate content".into(),
            },
        )
        .failing("4", PostErrorKind::DialogTimeout("reply box".into()));

    let summary = post_approved(&queue, &poster, None).await.unwrap();
    assert_eq!(*summary.processed(), 5);
    assert_eq!(*summary.posted(), 1);
    assert_eq!(*summary.failed(), 4);

    let statuses: Vec<ReviewStatus> = queue
        .list(None)
        .await
        .unwrap()
        .iter()
        .map(|e| *e.status())
        .collect();
    assert_eq!(
        statuses,
        vec![
            ReviewStatus::Posted,
            ReviewStatus::TweetNotFound,
            ReviewStatus::ApiPostFailed,
            ReviewStatus::DialogTimeout,
            ReviewStatus::InvalidEntry,
            ReviewStatus::ReadyForApproval,
        ]
    );
    assert!(queue.get("1").await.unwrap().posted_date().is_some());
}

#[tokio::test]
async fn test_second_run_never_reposts() {
    let dir = TempDir::new().unwrap();
    let (queue, _) = queue(&dir, &[approved("1"), approved("2")]).await;
    let poster = ScriptedPoster::new();

    post_approved(&queue, &poster, None).await.unwrap();
    let again = post_approved(&queue, &poster, None).await.unwrap();

    assert_eq!(again, PostSummary::default());
    assert_eq!(*poster.posted.lock().unwrap(), vec!["1", "2"]);
}

#[tokio::test]
async fn test_each_outcome_is_persisted_before_the_next_post() {
    let dir = TempDir::new().unwrap();
    let (queue, path) = queue(&dir, &[approved("1"), approved("2"), approved("3")]).await;
    let poster = ScriptedPoster::new().watching(path);

    post_approved(&queue, &poster, None).await.unwrap();

    let seen = poster.statuses_seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[1][0], ReviewStatus::Posted);
    assert_eq!(seen[2][1], ReviewStatus::Posted);
}

#[tokio::test]
async fn test_limit_caps_processed_entries() {
    let dir = TempDir::new().unwrap();
    let (queue, _) = queue(&dir, &[approved("1"), approved("2"), approved("3")]).await;
    let poster = ScriptedPoster::new();

    let summary = post_approved(&queue, &poster, Some(2)).await.unwrap();
    assert_eq!(*summary.processed(), 2);
    assert_eq!(*queue.get("3").await.unwrap().status(), ReviewStatus::Approved);
}

#[tokio::test]
async fn test_missing_credentials_stop_the_run() {
    let dir = TempDir::new().unwrap();
    let (queue, _) = queue(&dir, &[approved("1"), approved("2")]).await;
    let poster = ScriptedPoster::new()
        .failing("1", PostErrorKind::MissingCredentials("ALICE_X_ACCESS_TOKEN".into()));

    let err = post_approved(&queue, &poster, None).await.unwrap_err();
    assert!(matches!(err.kind(), ReviewErrorKind::Post(_)));
    assert_eq!(*queue.get("1").await.unwrap().status(), ReviewStatus::Approved);
    assert!(poster.posted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_edit_made_during_the_run_is_posted() {
    let dir = TempDir::new().unwrap();
    let (queue, _) = queue(&dir, &[approved("1"), approved("2")]).await;
    let poster = ScriptedPoster::new().editing(&queue, "2", "reply 2, reworded");

    post_approved(&queue, &poster, None).await.unwrap();

    assert_eq!(
        *poster.texts.lock().unwrap(),
        vec!["reply 1", "reply 2, reworded"]
    );
    let second = queue.get("2").await.unwrap();
    assert_eq!(*second.status(), ReviewStatus::Posted);
    assert_eq!(second.generated_reply(), "reply 2, reworded");
}

#[tokio::test]
async fn test_server_errors_can_be_re_approved() {
    let dir = TempDir::new().unwrap();
    let (queue, _) = queue(&dir, &[approved("1")]).await;
    let poster = ScriptedPoster::new().failing(
        "1",
        PostErrorKind::Api {
            status: 502,
            message: "Bad Gateway".into(),
        },
    );

    post_approved(&queue, &poster, None).await.unwrap();
    assert_eq!(*queue.get("1").await.unwrap().status(), ReviewStatus::PostFailed);

    let entry = queue.approve("1").await.unwrap();
    assert_eq!(*entry.status(), ReviewStatus::Approved);
}
