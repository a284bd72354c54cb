//! JSONL journal reader - sequential replay across daily files

use crate::chain::{verify_chain, JournalRecord};
use crate::error::EventError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

pub struct EventReader {
    files: Vec<PathBuf>,
}

impl EventReader {
    /// Collect the `.jsonl` files of a journal directory, oldest first
    pub fn from_directory(path: impl AsRef<Path>) -> Result<Self, EventError> {
        let path = path.as_ref();
        let mut files = Vec::new();

        if path.exists() {
            for entry in std::fs::read_dir(path)? {
                let file_path = entry?.path();
                if file_path.extension().is_some_and(|ext| ext == "jsonl") {
                    files.push(file_path);
                }
            }
        }
        files.sort();

        Ok(Self { files })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    fn read_file(path: &Path, out: &mut Vec<JournalRecord>) -> Result<(), EventError> {
        let reader = BufReader::new(File::open(path)?);
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|source| EventError::CorruptLine {
                file: path.display().to_string(),
                line: index + 1,
                source,
            })?;
            out.push(record);
        }
        Ok(())
    }

    /// Read every record in journal order
    pub fn read_all(&self) -> Result<Vec<JournalRecord>, EventError> {
        let mut records = Vec::new();
        for path in &self.files {
            Self::read_file(path, &mut records)?;
        }
        Ok(records)
    }

    /// Last record of the newest file (the chain tip)
    pub fn last_record(&self) -> Result<Option<JournalRecord>, EventError> {
        let Some(last_file) = self.files.last() else {
            return Ok(None);
        };
        let mut records = Vec::new();
        Self::read_file(last_file, &mut records)?;
        Ok(records.pop())
    }

    pub fn count(&self) -> Result<usize, EventError> {
        let mut count = 0;
        for path in &self.files {
            let reader = BufReader::new(File::open(path)?);
            for line in reader.lines() {
                if !line?.trim().is_empty() {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    /// Read everything and check the hash chain
    pub fn verify(&self) -> Result<usize, EventError> {
        let records = self.read_all()?;
        verify_chain(&records)?;
        Ok(records.len())
    }
}
