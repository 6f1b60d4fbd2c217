//! Persistence for the generated batch (`generated.yaml`) and the accepted
//! ledger (`brag-list.md`).
//!
//! Every operation is a single read-modify-write of one document, written
//! atomically. There is no lock and no transaction spanning both documents:
//! the last writer wins, and a crash between a ledger append and the batch
//! update leaves them out of step. Callers report each half separately.

use crate::entry::{AchievementEntry, EntryPatch, GenerationBatch};
use crate::error::{BragError, Result};
use crate::io::{atomic_write, read_optional};
use crate::ledger::{render_block, LedgerBlock, LedgerDocument, LEDGER_HEADER};
use crate::paths;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Everything a UI needs to render, in one read.
#[derive(Debug, Clone, Serialize)]
pub struct BragView {
    pub ledger_text: String,
    pub ledger: Vec<LedgerBlock>,
    pub batch: Option<GenerationBatch>,
    /// Set when `generated.yaml` exists but could not be parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EntryStore {
    generated: PathBuf,
    ledger: PathBuf,
}

impl EntryStore {
    pub fn new(root: &Path) -> Self {
        Self {
            generated: paths::generated_path(root),
            ledger: paths::ledger_path(root),
        }
    }

    // -----------------------------------------------------------------------
    // Generated batch
    // -----------------------------------------------------------------------

    pub fn load_batch(&self) -> Result<Option<GenerationBatch>> {
        match read_optional(&self.generated)? {
            Some(data) if !data.trim().is_empty() => Ok(Some(serde_yaml::from_str(&data)?)),
            _ => Ok(None),
        }
    }

    /// Like [`load_batch`](Self::load_batch), but a document that cannot be
    /// parsed reads as no batch, with the parse error returned beside it.
    /// I/O errors still fail.
    pub fn load_batch_lenient(&self) -> Result<(Option<GenerationBatch>, Option<String>)> {
        match self.load_batch() {
            Ok(batch) => Ok((batch, None)),
            Err(BragError::Yaml(e)) => {
                warn!(
                    path = %self.generated.display(),
                    error = %e,
                    "generated batch is unreadable; treating as empty"
                );
                Ok((None, Some(e.to_string())))
            }
            Err(e) => Err(e),
        }
    }

    fn require_batch(&self) -> Result<GenerationBatch> {
        self.load_batch()?.ok_or(BragError::NoBatch)
    }

    /// Replace any prior batch wholesale.
    pub fn save_generation_batch(&self, batch: &GenerationBatch) -> Result<()> {
        let data = serde_yaml::to_string(batch)?;
        atomic_write(&self.generated, data.as_bytes())?;
        info!(entries = batch.entries.len(), source = %batch.source, "saved generated batch");
        Ok(())
    }

    /// Merge `patch` over entry `index`; other entries are written back as-is.
    pub fn update_generated_entry(&self, index: usize, patch: &EntryPatch) -> Result<AchievementEntry> {
        let mut batch = self.require_batch()?;
        let len = batch.entries.len();
        let entry = batch
            .entries
            .get_mut(index)
            .ok_or(BragError::EntryNotFound { index, len })?;
        patch.apply(entry);
        let updated = entry.clone();
        self.save_generation_batch(&batch)?;
        Ok(updated)
    }

    /// Remove entry `index`; later entries shift down by one.
    pub fn delete_generated_entry(&self, index: usize) -> Result<AchievementEntry> {
        let mut batch = self.require_batch()?;
        let len = batch.entries.len();
        if index >= len {
            return Err(BragError::EntryNotFound { index, len });
        }
        let removed = batch.entries.remove(index);
        self.save_generation_batch(&batch)?;
        info!(index, title = %removed.title, "deleted generated entry");
        Ok(removed)
    }

    /// Flag entry `index` as accepted. Returns false if it already was.
    pub fn mark_accepted(&self, index: usize) -> Result<bool> {
        let mut batch = self.require_batch()?;
        let len = batch.entries.len();
        let entry = batch
            .entries
            .get_mut(index)
            .ok_or(BragError::EntryNotFound { index, len })?;
        if entry.accepted {
            return Ok(false);
        }
        entry.accepted = true;
        self.save_generation_batch(&batch)?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Ledger
    // -----------------------------------------------------------------------

    /// Ledger text, or the empty string when nothing has been accepted yet.
    pub fn read_ledger(&self) -> Result<String> {
        Ok(read_optional(&self.ledger)?.unwrap_or_default())
    }

    fn require_ledger(&self) -> Result<LedgerDocument> {
        match read_optional(&self.ledger)? {
            Some(text) => Ok(LedgerDocument::parse(&text)),
            None => Err(BragError::LedgerNotFound),
        }
    }

    /// Append `entry` dated today. Returns the id written into its marker.
    pub fn append_ledger_entry(&self, entry: &AchievementEntry) -> Result<String> {
        self.append_ledger_entry_on(entry, Utc::now().date_naive())
    }

    pub fn append_ledger_entry_on(&self, entry: &AchievementEntry, date: NaiveDate) -> Result<String> {
        let mut text = read_optional(&self.ledger)?.unwrap_or_default();
        if text.trim().is_empty() {
            text = format!("{LEDGER_HEADER}\n");
        } else if !text.ends_with('\n') {
            text.push('\n');
        }
        let id = uuid::Uuid::new_v4().to_string();
        text.push_str(&render_block(entry, &id, date));
        atomic_write(&self.ledger, text.as_bytes())?;
        info!(id = %id, title = %entry.title, "appended brag list entry");
        Ok(id)
    }

    pub fn ledger_entries(&self) -> Result<Vec<LedgerBlock>> {
        match read_optional(&self.ledger)? {
            Some(text) => Ok(LedgerDocument::parse(&text).summaries()),
            None => Ok(Vec::new()),
        }
    }

    /// Delete by position. Positions shift after every delete, so prefer
    /// [`EntryStore::delete_ledger_entry`] when the id is known.
    pub fn delete_ledger_entry_at(&self, index: usize) -> Result<LedgerBlock> {
        let mut doc = self.require_ledger()?;
        if index >= doc.blocks.len() {
            return Err(BragError::LedgerEntryNotFound(format!(
                "#{index} (brag list has {} entries)",
                doc.blocks.len()
            )));
        }
        self.remove_block(&mut doc, index)
    }

    /// Delete by the id in the block's hidden marker.
    pub fn delete_ledger_entry(&self, id: &str) -> Result<LedgerBlock> {
        let mut doc = self.require_ledger()?;
        let index = doc
            .position_of(id)
            .ok_or_else(|| BragError::LedgerEntryNotFound(id.to_string()))?;
        self.remove_block(&mut doc, index)
    }

    fn remove_block(&self, doc: &mut LedgerDocument, index: usize) -> Result<LedgerBlock> {
        let summary = doc.summaries().swap_remove(index);
        doc.blocks.remove(index);
        atomic_write(&self.ledger, doc.render().as_bytes())?;
        info!(index, title = %summary.title, "deleted brag list entry");
        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Combined view
    // -----------------------------------------------------------------------

    /// Missing documents read as empty and an unparseable batch is reported
    /// in `batch_error`; only real I/O failures error.
    pub fn read_all(&self) -> Result<BragView> {
        let ledger_text = self.read_ledger()?;
        let ledger = LedgerDocument::parse(&ledger_text).summaries();
        let (batch, batch_error) = self.load_batch_lenient()?;
        Ok(BragView {
            ledger_text,
            ledger,
            batch,
            batch_error,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::BatchSummary;
    use crate::types::{Confidence, GenerationSource, Seniority, Wording};
    use tempfile::TempDir;

    fn entry(title: &str) -> AchievementEntry {
        AchievementEntry {
            title: title.to_string(),
            bullet: format!("Completed {title}."),
            metrics: "30m invested across 1 task(s), 2 steps completed".into(),
            category: "Delivery".into(),
            tags: vec!["DELIVERY".into()],
            overall_impact: Some("Kept work moving.".into()),
            task_ids: vec![0],
            count: 1,
            frequency: "One-time".into(),
            confidence: Confidence::Medium,
            accepted: false,
        }
    }

    fn batch(titles: &[&str]) -> GenerationBatch {
        GenerationBatch {
            entries: titles.iter().map(|t| entry(t)).collect(),
            summary: BatchSummary::default(),
            source: GenerationSource::Fallback,
            generated_at: Utc::now(),
            seniority: Seniority::Ic,
            wording: Wording::Safe,
            task_refs: vec!["T1".into()],
        }
    }

    #[test]
    fn read_all_on_empty_root() {
        let dir = TempDir::new().unwrap();
        let view = EntryStore::new(dir.path()).read_all().unwrap();
        assert_eq!(view.ledger_text, "");
        assert!(view.ledger.is_empty());
        assert!(view.batch.is_none());
    }

    #[test]
    fn unreadable_batch_still_renders_the_ledger() {
        let dir = TempDir::new().unwrap();
        let store = EntryStore::new(dir.path());
        store.append_ledger_entry(&entry("Billing release")).unwrap();
        std::fs::write(paths::generated_path(dir.path()), "entries: [ {title: x} ]\n").unwrap();

        assert!(matches!(store.load_batch(), Err(BragError::Yaml(_))));
        let view = store.read_all().unwrap();
        assert!(view.batch.is_none());
        assert!(view.batch_error.unwrap().contains("bullet"));
        assert_eq!(view.ledger.len(), 1);
    }

    #[test]
    fn batch_io_errors_still_fail_the_view() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(paths::generated_path(dir.path())).unwrap();
        let err = EntryStore::new(dir.path()).read_all().unwrap_err();
        assert!(err.is_persistence_failure());
        assert!(matches!(err, BragError::Io(_)));
    }

    #[test]
    fn save_replaces_prior_batch() {
        let dir = TempDir::new().unwrap();
        let store = EntryStore::new(dir.path());
        store.save_generation_batch(&batch(&["a", "b", "c"])).unwrap();
        store.save_generation_batch(&batch(&["z"])).unwrap();
        let b = store.load_batch().unwrap().unwrap();
        assert_eq!(b.entries.len(), 1);
        assert_eq!(b.entries[0].title, "z");
    }

    #[test]
    fn update_merges_only_the_target_entry() {
        let dir = TempDir::new().unwrap();
        let store = EntryStore::new(dir.path());
        store.save_generation_batch(&batch(&["a", "b", "c"])).unwrap();
        let before = store.load_batch().unwrap().unwrap();

        let patch = EntryPatch {
            bullet: Some("Prepared b carefully.".into()),
            overall_impact: Some(None),
            ..Default::default()
        };
        let updated = store.update_generated_entry(1, &patch).unwrap();
        assert_eq!(updated.bullet, "Prepared b carefully.");

        let after = store.read_all().unwrap().batch.unwrap();
        assert_eq!(after.entries[0], before.entries[0]);
        assert_eq!(after.entries[2], before.entries[2]);
        let mut expected = before.entries[1].clone();
        expected.bullet = "Prepared b carefully.".into();
        expected.overall_impact = None;
        assert_eq!(after.entries[1], expected);
        assert_eq!(after.summary, before.summary);
    }

    #[test]
    fn update_without_batch_or_bad_index_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = EntryStore::new(dir.path());
        let err = store.update_generated_entry(0, &EntryPatch::default()).unwrap_err();
        assert!(matches!(err, BragError::NoBatch));
        assert!(err.is_not_found());

        store.save_generation_batch(&batch(&["a"])).unwrap();
        let err = store.update_generated_entry(3, &EntryPatch::default()).unwrap_err();
        assert!(matches!(err, BragError::EntryNotFound { index: 3, len: 1 }));
    }

    #[test]
    fn stale_delete_is_not_found_the_second_time() {
        let dir = TempDir::new().unwrap();
        let store = EntryStore::new(dir.path());
        store.save_generation_batch(&batch(&["a", "b"])).unwrap();
        let removed = store.delete_generated_entry(1).unwrap();
        assert_eq!(removed.title, "b");
        let err = store.delete_generated_entry(1).unwrap_err();
        assert!(matches!(err, BragError::EntryNotFound { index: 1, len: 1 }));
        let left = store.load_batch().unwrap().unwrap();
        assert_eq!(left.entries.len(), 1);
        assert_eq!(left.entries[0].title, "a");
    }

    #[test]
    fn mark_accepted_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = EntryStore::new(dir.path());
        store.save_generation_batch(&batch(&["a"])).unwrap();
        assert!(store.mark_accepted(0).unwrap());
        assert!(!store.mark_accepted(0).unwrap());
        assert!(store.load_batch().unwrap().unwrap().entries[0].accepted);
    }

    #[test]
    fn accepted_entry_shows_in_ledger() {
        let dir = TempDir::new().unwrap();
        let store = EntryStore::new(dir.path());
        let e = entry("Billing release");
        store.append_ledger_entry(&e).unwrap();
        let view = store.read_all().unwrap();
        assert!(view.ledger_text.starts_with(LEDGER_HEADER));
        assert!(view.ledger_text.lines().any(|l| l == format!("## {}", e.title)));
        assert!(view.ledger_text.lines().any(|l| l == format!("> {}", e.bullet)));
        assert_eq!(view.ledger.len(), 1);
    }

    #[test]
    fn delete_ledger_by_position_keeps_the_rest() {
        let dir = TempDir::new().unwrap();
        let store = EntryStore::new(dir.path());
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        for t in ["one", "two", "three"] {
            store.append_ledger_entry_on(&entry(t), date).unwrap();
        }
        let removed = store.delete_ledger_entry_at(1).unwrap();
        assert_eq!(removed.title, "two");
        let titles: Vec<_> = store.ledger_entries().unwrap().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, vec!["one", "three"]);
        assert!(matches!(
            store.delete_ledger_entry_at(2),
            Err(BragError::LedgerEntryNotFound(_))
        ));
    }

    #[test]
    fn delete_ledger_by_id() {
        let dir = TempDir::new().unwrap();
        let store = EntryStore::new(dir.path());
        store.append_ledger_entry(&entry("one")).unwrap();
        let id = store.append_ledger_entry(&entry("two")).unwrap();
        store.append_ledger_entry(&entry("three")).unwrap();
        let removed = store.delete_ledger_entry(&id).unwrap();
        assert_eq!(removed.title, "two");
        assert_eq!(removed.id.as_deref(), Some(id.as_str()));
        assert!(matches!(
            store.delete_ledger_entry(&id),
            Err(BragError::LedgerEntryNotFound(_))
        ));
    }

    #[test]
    fn ledger_delete_without_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = EntryStore::new(dir.path());
        let err = store.delete_ledger_entry_at(0).unwrap_err();
        assert!(matches!(err, BragError::LedgerNotFound));
        assert!(err.is_not_found());
    }

    #[test]
    fn hand_edits_survive_append_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = EntryStore::new(dir.path());
        std::fs::create_dir_all(dir.path().join(".brag")).unwrap();
        std::fs::write(
            dir.path().join(".brag/brag-list.md"),
            "# Brag List\n\nMy notes.\n\n## Old win\n\n> Did it by hand.",
        )
        .unwrap();
        store.append_ledger_entry(&entry("new")).unwrap();
        let blocks = store.ledger_entries().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].title, "Old win");
        store.delete_ledger_entry_at(0).unwrap();
        let text = store.read_ledger().unwrap();
        assert!(text.contains("My notes."));
        assert!(!text.contains("Old win"));
        assert!(text.contains("## new"));
    }
}
