//! Quota tables.
//!
//! Quotas are business data that change with a provider's pricing tiers, so
//! they are loaded from configuration. [`QuotaTable::default`] carries the
//! free-tier numbers in use when this crate was written.

use crate::{RateLimitError, RateLimitErrorKind};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which call attribute selects a service's limits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum KeyedBy {
    /// Limits are per model (generation APIs)
    #[default]
    Model,
    /// Limits are per method (spreadsheet reads and writes)
    Method,
}

/// Ceilings for one model or method. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct QuotaLimits {
    /// Requests per trailing minute
    rpm: u32,
    /// Tokens per minute (informational, not enforced)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tpm: Option<u64>,
    /// Requests per local calendar day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rpd: Option<u32>,
}

impl QuotaLimits {
    /// Creates a limit set.
    pub fn new(rpm: u32, tpm: Option<u64>, rpd: Option<u32>) -> Self {
        Self { rpm, tpm, rpd }
    }
}

/// Quotas for one service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Getters)]
pub struct ServiceQuota {
    /// Attribute that selects the limit entry
    #[serde(default)]
    keyed_by: KeyedBy,
    /// Limits by model or method name
    #[serde(default)]
    limits: HashMap<String, QuotaLimits>,
}

impl ServiceQuota {
    /// Creates an empty service table.
    pub fn new(keyed_by: KeyedBy) -> Self {
        Self {
            keyed_by,
            limits: HashMap::new(),
        }
    }

    /// Adds or replaces the limits for `name`.
    pub fn with_limit(mut self, name: impl Into<String>, limits: QuotaLimits) -> Self {
        self.limits.insert(name.into(), limits);
        self
    }
}

/// Quotas for every known service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuotaTable(HashMap<String, ServiceQuota>);

impl QuotaTable {
    /// A table with no services.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Adds or replaces a service.
    pub fn with_service(mut self, name: impl Into<String>, quota: ServiceQuota) -> Self {
        self.0.insert(name.into(), quota);
        self
    }

    /// Service table by name.
    pub fn service(&self, name: &str) -> Option<&ServiceQuota> {
        self.0.get(name)
    }

    /// Checks that every service has limits and every limit admits calls.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error naming the first unusable entry, in service
    /// name order.
    pub fn validate(&self) -> Result<(), RateLimitError> {
        let mut services: Vec<_> = self.0.iter().collect();
        services.sort_by(|a, b| a.0.cmp(b.0));
        for (service, quota) in services {
            if quota.limits.is_empty() {
                return Err(RateLimitErrorKind::Config(format!("{service} has no limits")).into());
            }
            let mut limits: Vec<_> = quota.limits.iter().collect();
            limits.sort_by(|a, b| a.0.cmp(b.0));
            for (name, limit) in limits {
                if limit.rpm == 0 {
                    return Err(RateLimitErrorKind::Config(format!(
                        "{service}/{name} allows 0 requests per minute"
                    ))
                    .into());
                }
                if limit.rpd == Some(0) {
                    return Err(RateLimitErrorKind::Config(format!(
                        "{service}/{name} allows 0 requests per day"
                    ))
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Resolves the limits governing a call.
    ///
    /// # Errors
    ///
    /// Unknown services, models or methods are errors; callers treat them as
    /// a hard deny.
    pub fn lookup(
        &self,
        service: &str,
        method: &str,
        model: Option<&str>,
    ) -> Result<(&ServiceQuota, &QuotaLimits), RateLimitError> {
        let table = self
            .0
            .get(service)
            .ok_or_else(|| RateLimitErrorKind::UnknownService(service.to_string()))?;

        let limits = match table.keyed_by {
            KeyedBy::Model => {
                let model = model.unwrap_or_default();
                table
                    .limits
                    .get(model)
                    .ok_or_else(|| RateLimitErrorKind::UnknownModel {
                        service: capitalize(service),
                        model: model.to_string(),
                    })?
            }
            KeyedBy::Method => {
                table
                    .limits
                    .get(method)
                    .ok_or_else(|| RateLimitErrorKind::UnknownMethod {
                        service: capitalize(service),
                        method: method.to_string(),
                    })?
            }
        };
        Ok((table, limits))
    }
}

impl Default for QuotaTable {
    fn default() -> Self {
        let gemini = [
            ("gemini-2.5-pro", 5, 125_000, 100),
            ("gemini-2.5-flash", 10, 250_000, 250),
            ("gemini-2.5-flash-preview", 10, 250_000, 250),
            ("gemini-2.5-flash-lite", 15, 250_000, 1000),
            ("gemini-2.5-flash-lite-preview", 15, 250_000, 1000),
            ("gemini-2.0-flash", 15, 1_000_000, 200),
            ("gemini-2.0-flash-lite", 30, 1_000_000, 200),
            ("gemini-flash-latest", 15, 1_000_000, 200),
            ("gemini-flash-latest-lite", 30, 1_000_000, 200),
        ]
        .into_iter()
        .fold(ServiceQuota::new(KeyedBy::Model), |table, (model, rpm, tpm, rpd)| {
            table.with_limit(model, QuotaLimits::new(rpm, Some(tpm), Some(rpd)))
        });

        let sheets = ServiceQuota::new(KeyedBy::Method)
            .with_limit("read", QuotaLimits::new(60, None, None))
            .with_limit("write", QuotaLimits::new(60, None, None));

        Self::empty()
            .with_service("gemini", gemini)
            .with_service("sheets", sheets)
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
