//! JSONL journal writer - append-only, one file per UTC day

use crate::chain::{JournalRecord, GENESIS_HASH};
use crate::error::EventError;
use crate::reader::EventReader;
use chrono::{DateTime, Utc};
use peerlend_market::EmittedEvent;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct EventStore {
    base_path: PathBuf,
    current_file: Option<BufWriter<File>>,
    current_date: Option<String>,
    last_sequence: u64,
    last_hash: String,
}

impl EventStore {
    /// Open (or create) a journal directory and resume from its tip
    pub fn open(base_path: impl AsRef<Path>) -> Result<Self, EventError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        let tip = EventReader::from_directory(&base_path)?.last_record()?;
        let (last_sequence, last_hash) = match tip {
            Some(record) => (record.sequence, record.hash),
            None => (0, GENESIS_HASH.to_string()),
        };
        debug!(path = %base_path.display(), last_sequence, "Opened journal");

        Ok(Self {
            base_path,
            current_file: None,
            current_date: None,
            last_sequence,
            last_hash,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn last_hash(&self) -> &str {
        &self.last_hash
    }

    /// Chain and append one event, stamped with the current time
    pub fn append(&mut self, emitted: EmittedEvent) -> Result<JournalRecord, EventError> {
        self.append_at(emitted, Utc::now())
    }

    pub fn append_at(
        &mut self,
        emitted: EmittedEvent,
        recorded_at: DateTime<Utc>,
    ) -> Result<JournalRecord, EventError> {
        let record = JournalRecord::seal(
            self.last_sequence + 1,
            self.last_hash.clone(),
            recorded_at,
            emitted,
        );

        let date = recorded_at.format("%Y-%m-%d").to_string();
        if self.current_date.as_ref() != Some(&date) {
            self.rotate_file(&date)?;
        }
        if let Some(writer) = self.current_file.as_mut() {
            let json = serde_json::to_string(&record)?;
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }

        self.last_sequence = record.sequence;
        self.last_hash = record.hash.clone();
        debug!(sequence = record.sequence, event = record.event.name(), "Journaled event");
        Ok(record)
    }

    pub fn append_all(
        &mut self,
        events: impl IntoIterator<Item = EmittedEvent>,
    ) -> Result<Vec<JournalRecord>, EventError> {
        events.into_iter().map(|e| self.append(e)).collect()
    }

    fn rotate_file(&mut self, date: &str) -> Result<(), EventError> {
        if let Some(writer) = self.current_file.as_mut() {
            writer.flush()?;
        }
        let file_path = self.base_path.join(format!("{}.jsonl", date));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;

        self.current_file = Some(BufWriter::new(file));
        self.current_date = Some(date.to_string());
        Ok(())
    }

    pub fn list_files(&self) -> Result<Vec<PathBuf>, EventError> {
        Ok(EventReader::from_directory(&self.base_path)?.files().to_vec())
    }

    pub fn close(&mut self) -> Result<(), EventError> {
        if let Some(writer) = self.current_file.as_mut() {
            writer.flush()?;
        }
        self.current_file = None;
        self.current_date = None;
        Ok(())
    }
}

impl Drop for EventStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
