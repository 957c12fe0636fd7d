//! Durable ledger of API calls checked against quota tables.
//!
//! Asking "may I call" and recording "I called" are separate steps. Callers
//! pre-check cheaply and still record failed attempts (a 429 included), so the
//! next pre-check reflects real usage and an exhausted quota is not hammered.

use crate::{Clock, KeyedBy, QuotaTable, RateLimitError, RateLimitErrorKind, SystemClock};
use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use derive_getters::Getters;
use derive_new::new;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, instrument, warn};

/// Longest response excerpt kept in a record.
pub const RESPONSE_EXCERPT_CHARS: usize = 500;

/// Records older than this are dropped when the log is saved.
const RETENTION_HOURS: i64 = 48;

/// One attempted call. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct CallRecord {
    /// Local time of the attempt
    timestamp: NaiveDateTime,
    /// Service name, such as `gemini`
    service: String,
    /// Method name, such as `generate`
    method: String,
    /// Model, for model-keyed services
    #[serde(default)]
    model: Option<String>,
    /// Last four characters of the credential used
    #[serde(default)]
    api_key_suffix: Option<String>,
    /// Whether the call succeeded
    success: bool,
    /// Start of the response or error text
    #[serde(default)]
    response: Option<String>,
}

/// The (service, method, model, key) tuple a call is counted under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, new, Getters, Setters)]
#[setters(prefix = "with_", strip_option, into)]
pub struct CallKey {
    /// Service name
    #[new(into)]
    service: String,
    /// Method name
    #[new(into)]
    method: String,
    /// Model for model-keyed services
    #[new(default)]
    model: Option<String>,
    /// Credential suffix; counts every key when absent
    #[new(default)]
    key_suffix: Option<String>,
}

/// Outcome of a pre-flight check.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum Decision {
    /// The call fits in every window
    #[display("Call allowed.")]
    Allowed,
    /// The call would exceed a quota
    #[display("{_0}")]
    Denied(String),
    /// The service, method or model has no quota entry
    #[display("{_0}")]
    Unknown(String),
}

impl Decision {
    /// True when the call may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Usage against quota for one tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct QuotaInfo {
    /// Service name
    service: String,
    /// Method name
    method: String,
    /// Model, if any
    model: Option<String>,
    /// Calls in the trailing minute
    rpm_current: u32,
    /// Per-minute ceiling
    rpm_limit: u32,
    /// Calls left this minute
    rpm_remaining: u32,
    /// Calls since local midnight
    rpd_current: u32,
    /// Per-day ceiling; `None` is unlimited
    rpd_limit: Option<u32>,
    /// Calls left today; `None` is unlimited
    rpd_remaining: Option<u32>,
}

impl std::fmt::Display for QuotaInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.service, self.method)?;
        if let Some(model) = &self.model {
            write!(f, " ({model})")?;
        }
        write!(
            f,
            ": RPM {}/{} ({} left), RPD ",
            self.rpm_current, self.rpm_limit, self.rpm_remaining
        )?;
        match (self.rpd_limit, self.rpd_remaining) {
            (Some(limit), Some(left)) => write!(f, "{}/{} ({} left)", self.rpd_current, limit, left),
            _ => write!(f, "{}/unlimited", self.rpd_current),
        }
    }
}

/// Ledger of calls persisted as a JSON array.
///
/// The whole log is rewritten on every [`record_call`](Self::record_call);
/// one process owns the file at a time. Writes are serialized and always
/// persist the newest snapshot.
#[derive(Debug)]
pub struct ApiCallTracker {
    log_file: PathBuf,
    quotas: QuotaTable,
    clock: Arc<dyn Clock>,
    records: Mutex<VecDeque<CallRecord>>,
    writer: tokio::sync::Mutex<()>,
}

impl ApiCallTracker {
    /// Opens the ledger at `log_file` using the system clock.
    ///
    /// # Errors
    ///
    /// Fails if the log's directory cannot be created.
    pub fn open(log_file: impl AsRef<Path>, quotas: QuotaTable) -> Result<Self, RateLimitError> {
        Self::with_clock(log_file, quotas, Arc::new(SystemClock))
    }

    /// Opens the ledger with an explicit clock.
    ///
    /// A missing file starts an empty ledger. A file that is not a valid
    /// record array is logged and ignored.
    #[instrument(skip(log_file, quotas, clock), fields(path = %log_file.as_ref().display()))]
    pub fn with_clock(
        log_file: impl AsRef<Path>,
        quotas: QuotaTable,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RateLimitError> {
        let log_file = std::path::absolute(log_file.as_ref())
            .unwrap_or_else(|_| log_file.as_ref().to_path_buf());
        if let Some(parent) = log_file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RateLimitErrorKind::Persistence(format!("{}: {}", parent.display(), e))
            })?;
        }

        let records = load_records(&log_file);
        debug!(records = records.len(), "Call log loaded");

        Ok(Self {
            log_file,
            quotas,
            clock,
            records: Mutex::new(records),
            writer: tokio::sync::Mutex::new(()),
        })
    }

    /// Location of the log file.
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Quota table in use.
    pub fn quotas(&self) -> &QuotaTable {
        &self.quotas
    }

    /// Checks whether one more call under `key` fits in both windows.
    #[instrument(skip(self), fields(service = %key.service, method = %key.method))]
    pub fn can_make_call(&self, key: &CallKey) -> Decision {
        let (service, limits) =
            match self
                .quotas
                .lookup(&key.service, &key.method, key.model.as_deref())
            {
                Ok(found) => found,
                Err(e) => return Decision::Unknown(e.kind().to_string()),
            };
        let (rpm_count, rpd_count) = self.current_counts(key, *service.keyed_by());
        let model = key.model.as_deref().unwrap_or("None");

        if rpm_count >= *limits.rpm() {
            debug!(rpm_count, limit = limits.rpm(), "RPM ceiling reached");
            return Decision::Denied(format!(
                "Rate limit (RPM) exceeded for {}/{} (model: {}).",
                key.service, key.method, model
            ));
        }
        if let Some(rpd) = limits.rpd()
            && rpd_count >= *rpd
        {
            debug!(rpd_count, limit = rpd, "RPD ceiling reached");
            return Decision::Denied(format!(
                "Rate limit (RPD) exceeded for {}/{} (model: {}).",
                key.service, key.method, model
            ));
        }
        Decision::Allowed
    }

    /// Appends a record for an attempted call and saves the log.
    ///
    /// Call this after every real attempt, successful or not. The record is
    /// visible to [`can_make_call`](Self::can_make_call) before the file is
    /// written.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be written. The record is kept in
    /// memory regardless.
    #[instrument(skip(self, response), fields(service = %key.service, method = %key.method))]
    pub async fn record_call(
        &self,
        key: &CallKey,
        success: bool,
        response: Option<&str>,
    ) -> Result<(), RateLimitError> {
        let record = CallRecord {
            timestamp: self.clock.now(),
            service: key.service.clone(),
            method: key.method.clone(),
            model: key.model.clone(),
            api_key_suffix: key.key_suffix.clone(),
            success,
            response: response
                .filter(|text| !text.is_empty())
                .map(|text| text.chars().take(RESPONSE_EXCERPT_CHARS).collect()),
        };

        self.lock().push_back(record);
        self.save().await
    }

    /// Current usage and limits for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown services, models or methods.
    pub fn get_quota_info(&self, key: &CallKey) -> Result<QuotaInfo, RateLimitError> {
        let (service, limits) = self
            .quotas
            .lookup(&key.service, &key.method, key.model.as_deref())?;
        let (rpm_current, rpd_current) = self.current_counts(key, *service.keyed_by());

        Ok(QuotaInfo {
            service: key.service.clone(),
            method: key.method.clone(),
            model: key.model.clone(),
            rpm_current,
            rpm_limit: *limits.rpm(),
            rpm_remaining: limits.rpm().saturating_sub(rpm_current),
            rpd_current,
            rpd_limit: *limits.rpd(),
            rpd_remaining: limits.rpd().map(|rpd| rpd.saturating_sub(rpd_current)),
        })
    }

    /// Snapshot of the in-memory records, oldest first.
    pub fn records(&self) -> Vec<CallRecord> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<CallRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts matching calls in the trailing minute and since local midnight.
    fn current_counts(&self, key: &CallKey, keyed_by: KeyedBy) -> (u32, u32) {
        let now = self.clock.now();
        let minute_ago = now - TimeDelta::minutes(1);
        let today_start = now.date().and_time(NaiveTime::MIN);
        let horizon = today_start - TimeDelta::days(1);

        let mut records = self.lock();
        records.retain(|record| record.timestamp >= horizon);

        let mut rpm_count = 0;
        let mut rpd_count = 0;
        for record in records.iter() {
            if record.service != key.service || record.method != key.method {
                continue;
            }
            if keyed_by == KeyedBy::Model && record.model != key.model {
                continue;
            }
            if let Some(suffix) = &key.key_suffix
                && record.api_key_suffix.as_ref() != Some(suffix)
            {
                continue;
            }
            if record.timestamp > minute_ago {
                rpm_count += 1;
            }
            if record.timestamp > today_start {
                rpd_count += 1;
            }
        }
        (rpm_count, rpd_count)
    }

    /// Drops records past retention and rewrites the file.
    ///
    /// The snapshot is taken once the writer slot is held, so a slow write
    /// never overwrites a newer one.
    async fn save(&self) -> Result<(), RateLimitError> {
        let _writing = self.writer.lock().await;
        let body = {
            let cutoff = self.clock.now() - TimeDelta::hours(RETENTION_HOURS);
            let mut records = self.lock();
            records.retain(|record| record.timestamp > cutoff);
            serde_json::to_string_pretty(&*records)
                .map_err(|e| RateLimitErrorKind::Persistence(e.to_string()))?
        };

        let staging = self.log_file.with_extension("json.tmp");
        let written = match tokio::fs::write(&staging, body).await {
            Ok(()) => tokio::fs::rename(&staging, &self.log_file).await,
            Err(e) => Err(e),
        };
        written.map_err(|e| {
            RateLimitErrorKind::Persistence(format!("{}: {}", self.log_file.display(), e))
        })?;
        Ok(())
    }
}

fn load_records(path: &Path) -> VecDeque<CallRecord> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return VecDeque::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read call log, starting empty");
            return VecDeque::new();
        }
    };
    match serde_json::from_str::<Vec<CallRecord>>(&raw) {
        Ok(records) => records.into(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Call log is not a record array, starting empty");
            VecDeque::new()
        }
    }
}
