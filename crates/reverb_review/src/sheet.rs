//! Review entries stored as spreadsheet rows.
//!
//! Row 0 is a header naming each column. Entries map to rows through that
//! header, so reviewers may reorder columns or add their own.

use crate::{ReviewError, ReviewErrorKind, ReviewStore};
use async_trait::async_trait;
use reverb_core::ReviewEntry;
use reverb_error::{StorageError, StorageErrorKind};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// Columns written when a sheet has no header yet.
pub const DEFAULT_COLUMNS: &[&str] = &[
    "tweet_id",
    "tweet_url",
    "tweet_text",
    "generated_reply",
    "status",
    "profile",
    "scraped_date",
    "posted_date",
    "run_number",
];

/// Spreadsheet-like row storage.
#[async_trait]
pub trait SheetBackend: Send + Sync {
    /// All rows of `sheet`, header included. A missing sheet has no rows.
    async fn read_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>, StorageError>;

    /// Appends rows to the end of `sheet`, creating it if needed.
    async fn append_rows(&self, sheet: &str, rows: Vec<Vec<String>>) -> Result<(), StorageError>;

    /// Overwrites rows by zero-based index (the header is row 0).
    async fn batch_update(
        &self,
        sheet: &str,
        updates: Vec<(usize, Vec<String>)>,
    ) -> Result<(), StorageError>;

    /// Removes one row by zero-based index.
    async fn delete_row(&self, sheet: &str, index: usize) -> Result<(), StorageError>;
}

/// In-process [`SheetBackend`].
#[derive(Debug, Clone, Default)]
pub struct MemorySheet {
    sheets: Arc<RwLock<HashMap<String, Vec<Vec<String>>>>>,
}

impl MemorySheet {
    /// Creates an empty workbook.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SheetBackend for MemorySheet {
    async fn read_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>, StorageError> {
        Ok(self
            .sheets
            .read()
            .await
            .get(sheet)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_rows(&self, sheet: &str, rows: Vec<Vec<String>>) -> Result<(), StorageError> {
        self.sheets
            .write()
            .await
            .entry(sheet.to_string())
            .or_default()
            .extend(rows);
        Ok(())
    }

    async fn batch_update(
        &self,
        sheet: &str,
        updates: Vec<(usize, Vec<String>)>,
    ) -> Result<(), StorageError> {
        let mut sheets = self.sheets.write().await;
        let rows = sheets
            .get_mut(sheet)
            .ok_or_else(|| StorageError::new(StorageErrorKind::NotFound(sheet.to_string())))?;
        for (index, row) in updates {
            let slot = rows.get_mut(index).ok_or_else(|| {
                StorageError::new(StorageErrorKind::NotFound(format!("{sheet} row {index}")))
            })?;
            *slot = row;
        }
        Ok(())
    }

    async fn delete_row(&self, sheet: &str, index: usize) -> Result<(), StorageError> {
        let mut sheets = self.sheets.write().await;
        let rows = sheets
            .get_mut(sheet)
            .ok_or_else(|| StorageError::new(StorageErrorKind::NotFound(sheet.to_string())))?;
        if index >= rows.len() {
            return Err(StorageError::new(StorageErrorKind::NotFound(format!(
                "{sheet} row {index}"
            ))));
        }
        rows.remove(index);
        Ok(())
    }
}

/// [`ReviewStore`] over one sheet of a [`SheetBackend`].
pub struct SheetReviewStore {
    backend: Arc<dyn SheetBackend>,
    sheet: String,
}

impl std::fmt::Debug for SheetReviewStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetReviewStore")
            .field("sheet", &self.sheet)
            .finish_non_exhaustive()
    }
}

impl SheetReviewStore {
    /// Stores entries in `sheet`, such as `<profile>_online_replies`.
    pub fn new(backend: Arc<dyn SheetBackend>, sheet: impl Into<String>) -> Self {
        Self {
            backend,
            sheet: sheet.into(),
        }
    }

    /// Header plus the data rows, each paired with its row index.
    async fn rows(&self) -> Result<(Vec<String>, Vec<(usize, Vec<String>)>), ReviewError> {
        let mut rows = self.backend.read_rows(&self.sheet).await?.into_iter();
        let header = rows.next().unwrap_or_default();
        let body = rows.enumerate().map(|(i, row)| (i + 1, row)).collect();
        Ok((header, body))
    }

    async fn row_index(&self, id: &str) -> Result<Option<(Vec<String>, usize)>, ReviewError> {
        let (header, rows) = self.rows().await?;
        let Some(id_column) = header.iter().position(|c| c == "tweet_id" || c == "id") else {
            return Ok(None);
        };
        let index = rows
            .into_iter()
            .find(|(_, row)| row.get(id_column).is_some_and(|cell| cell == id))
            .map(|(index, _)| index);
        Ok(index.map(|index| (header, index)))
    }
}

#[async_trait]
impl ReviewStore for SheetReviewStore {
    async fn load_all(&self) -> Result<Vec<ReviewEntry>, ReviewError> {
        let (header, rows) = self.rows().await?;
        let mut entries = Vec::with_capacity(rows.len());
        for (index, row) in rows {
            match row_to_entry(&header, &row) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(sheet = %self.sheet, row = index, error = %e, "Skipping unreadable row"),
            }
        }
        Ok(entries)
    }

    #[instrument(skip(self, entries), fields(sheet = %self.sheet, count = entries.len()))]
    async fn append(&self, entries: &[ReviewEntry]) -> Result<(), ReviewError> {
        let (mut header, _) = self.rows().await?;
        let mut rows = Vec::with_capacity(entries.len() + 1);
        if header.is_empty() {
            header = DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect();
            rows.push(header.clone());
        }
        for entry in entries {
            rows.push(entry_to_row(&header, entry)?);
        }
        self.backend.append_rows(&self.sheet, rows).await?;
        Ok(())
    }

    #[instrument(skip(self, entry), fields(sheet = %self.sheet, id = %entry.tweet_id()))]
    async fn update(&self, entry: &ReviewEntry) -> Result<(), ReviewError> {
        let (header, index) = self
            .row_index(entry.tweet_id())
            .await?
            .ok_or_else(|| ReviewErrorKind::NotFound(entry.tweet_id().clone()))?;
        let row = entry_to_row(&header, entry)?;
        self.backend
            .batch_update(&self.sheet, vec![(index, row)])
            .await?;
        debug!(row = index, "Row updated");
        Ok(())
    }

    #[instrument(skip(self), fields(sheet = %self.sheet))]
    async fn delete(&self, id: &str) -> Result<bool, ReviewError> {
        let Some((_, index)) = self.row_index(id).await? else {
            return Ok(false);
        };
        self.backend.delete_row(&self.sheet, index).await?;
        Ok(true)
    }
}

fn entry_to_row(header: &[String], entry: &ReviewEntry) -> Result<Vec<String>, ReviewError> {
    let value = serde_json::to_value(entry)
        .map_err(|e| StorageError::new(StorageErrorKind::Encode(e.to_string())))?;
    let fields = value.as_object().cloned().unwrap_or_default();
    Ok(header
        .iter()
        .map(|column| {
            let key = if column == "id" { "tweet_id" } else { column.as_str() };
            match fields.get(key) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(text)) => text.clone(),
                Some(other) => other.to_string(),
            }
        })
        .collect())
}

fn row_to_entry(header: &[String], row: &[String]) -> Result<ReviewEntry, ReviewError> {
    let mut fields = Map::new();
    for (column, cell) in header.iter().zip(row) {
        let value = match column.as_str() {
            "scraped_date" | "posted_date" if cell.trim().is_empty() => Value::Null,
            "run_number" => cell
                .trim()
                .parse::<u32>()
                .map(Value::from)
                .unwrap_or(Value::Null),
            _ => Value::String(cell.clone()),
        };
        fields.insert(column.clone(), value);
    }
    serde_json::from_value(Value::Object(fields)).map_err(|e| {
        StorageError::new(StorageErrorKind::Corrupt {
            path: "sheet row".to_string(),
            reason: e.to_string(),
        })
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reverb_core::ReviewStatus;

    #[test]
    fn test_rows_follow_header_order() {
        let header: Vec<String> = ["status", "id", "generated_reply", "notes"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let entry = ReviewEntry::new("77", "", "", "nice", ReviewStatus::Approved, "p")
            .with_extra("notes", Value::String("check tone".into()));

        let row = entry_to_row(&header, &entry).unwrap();
        assert_eq!(row, vec!["approved", "77", "nice", "check tone"]);

        let back = row_to_entry(&header, &row).unwrap();
        assert_eq!(back.tweet_id(), "77");
        assert_eq!(back.extra()["notes"], "check tone");
    }

    #[test]
    fn test_row_without_status_is_rejected() {
        let header = vec!["tweet_id".to_string()];
        assert!(row_to_entry(&header, &["1".to_string()]).is_err());
    }
}
