//! Hash chain over journal records
//!
//! Each record commits to its predecessor's hash; the first record links to
//! [`GENESIS_HASH`]. Editing, dropping or reordering any line breaks the chain.

use chrono::{DateTime, Utc};
use peerlend_core::BlockNumber;
use peerlend_market::{EmittedEvent, MarketEvent};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const GENESIS_HASH: &str = "GENESIS";

/// One line of the journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub sequence: u64,
    pub prev_hash: String,
    pub hash: String,
    /// Wall-clock time of the append; protocol time is `block`
    pub recorded_at: DateTime<Utc>,
    pub block: BlockNumber,
    pub event: MarketEvent,
}

impl JournalRecord {
    /// Build a record and compute its hash
    pub fn seal(
        sequence: u64,
        prev_hash: impl Into<String>,
        recorded_at: DateTime<Utc>,
        emitted: EmittedEvent,
    ) -> Self {
        let mut record = Self {
            sequence,
            prev_hash: prev_hash.into(),
            hash: String::new(),
            recorded_at,
            block: emitted.block,
            event: emitted.event,
        };
        record.hash = calculate_record_hash(&record);
        record
    }
}

/// SHA-256 over every field except `hash`
pub fn calculate_record_hash(record: &JournalRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.sequence.to_le_bytes());
    hasher.update(record.prev_hash.as_bytes());
    hasher.update(record.recorded_at.to_rfc3339().as_bytes());
    hasher.update(record.block.to_le_bytes());
    hasher.update(record.event.name().as_bytes());
    // Struct field order is fixed, so this encoding is deterministic
    match serde_json::to_vec(&record.event) {
        Ok(bytes) => hasher.update(bytes),
        Err(_) => hasher.update(format!("{:?}", record.event).as_bytes()),
    }
    hex::encode(hasher.finalize())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Broken link at seq {sequence}: expected prev_hash '{expected}', got '{actual}'")]
    BrokenLink {
        sequence: u64,
        expected: String,
        actual: String,
    },

    #[error("Invalid hash at seq {sequence}: expected '{expected}', got '{actual}'")]
    InvalidHash {
        sequence: u64,
        expected: String,
        actual: String,
    },

    #[error("Invalid sequence: expected {expected}, got {actual}")]
    InvalidSequence { expected: u64, actual: u64 },
}

/// Verify a complete journal, starting from sequence 1
pub fn verify_chain(records: &[JournalRecord]) -> Result<(), ChainError> {
    let mut prev_hash = GENESIS_HASH.to_string();

    for (i, record) in records.iter().enumerate() {
        let expected_sequence = i as u64 + 1;
        if record.sequence != expected_sequence {
            return Err(ChainError::InvalidSequence {
                expected: expected_sequence,
                actual: record.sequence,
            });
        }
        if record.prev_hash != prev_hash {
            return Err(ChainError::BrokenLink {
                sequence: record.sequence,
                expected: prev_hash,
                actual: record.prev_hash.clone(),
            });
        }
        let calculated = calculate_record_hash(record);
        if record.hash != calculated {
            return Err(ChainError::InvalidHash {
                sequence: record.sequence,
                expected: calculated,
                actual: record.hash.clone(),
            });
        }
        prev_hash = record.hash.clone();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerlend_core::Address;

    fn emitted(block: BlockNumber, offer_id: u64) -> EmittedEvent {
        EmittedEvent {
            block,
            event: MarketEvent::OfferCancelled { offer_id },
        }
    }

    fn chain(len: u64) -> Vec<JournalRecord> {
        let now = Utc::now();
        let mut prev = GENESIS_HASH.to_string();
        (1..=len)
            .map(|seq| {
                let record = JournalRecord::seal(seq, prev.clone(), now, emitted(seq * 10, seq));
                prev = record.hash.clone();
                record
            })
            .collect()
    }

    #[test]
    fn test_hash_deterministic() {
        let record = chain(1).remove(0);
        assert_eq!(calculate_record_hash(&record), record.hash);
        assert_eq!(record.hash.len(), 64);
    }

    #[test]
    fn test_hash_covers_event_payload() {
        let now = Utc::now();
        let a = JournalRecord::seal(1, GENESIS_HASH, now, emitted(1, 1));
        let b = JournalRecord::seal(1, GENESIS_HASH, now, emitted(1, 2));
        assert_ne!(a.hash, b.hash);

        let paused = JournalRecord::seal(
            1,
            GENESIS_HASH,
            now,
            EmittedEvent {
                block: 1,
                event: MarketEvent::Paused {
                    by: Address::new("ADMIN").unwrap(),
                },
            },
        );
        assert_ne!(a.hash, paused.hash);
    }

    #[test]
    fn test_verify_valid_chain() {
        assert!(verify_chain(&chain(3)).is_ok());
        assert!(verify_chain(&[]).is_ok());
    }

    #[test]
    fn test_verify_broken_link() {
        let mut records = chain(3);
        records[1] = JournalRecord::seal(2, "wrong_hash", Utc::now(), emitted(20, 2));
        assert!(matches!(
            verify_chain(&records),
            Err(ChainError::BrokenLink { sequence: 2, .. })
        ));
    }

    #[test]
    fn test_verify_tampered_payload() {
        let mut records = chain(2);
        records[1].block = 999;
        assert!(matches!(
            verify_chain(&records),
            Err(ChainError::InvalidHash { sequence: 2, .. })
        ));
    }

    #[test]
    fn test_verify_dropped_record() {
        let mut records = chain(3);
        records.remove(1);
        assert_eq!(
            verify_chain(&records),
            Err(ChainError::InvalidSequence {
                expected: 2,
                actual: 3
            })
        );
    }
}
