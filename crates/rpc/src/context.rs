//! Application context - wires the marketplace to its snapshot and journal
//!
//! Layout of the data directory:
//! - `config.json`  optional `MarketConfig`, read once at `init`
//! - `state.json`   snapshot of the whole marketplace
//! - `journal/`     hash-chained JSONL event journal

use peerlend_core::Address;
use peerlend_events::{EventError, EventStore, JournalRecord};
use peerlend_market::{ConfigError, MarketConfig, MarketError, Marketplace};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct AppContext {
    market: Option<Marketplace>,
    journal: EventStore,
    data_path: PathBuf,
    state_path: PathBuf,
    journal_path: PathBuf,
}

impl AppContext {
    pub fn open(data_path: impl AsRef<Path>) -> Result<Self, ContextError> {
        let data_path = data_path.as_ref().to_path_buf();
        let state_path = data_path.join("state.json");
        let journal_path = data_path.join("journal");
        fs::create_dir_all(&data_path)?;

        let market = if state_path.exists() {
            let content = fs::read_to_string(&state_path)?;
            Some(serde_json::from_str::<Marketplace>(&content).map_err(ContextError::Snapshot)?)
        } else {
            None
        };
        let journal = EventStore::open(&journal_path)?;
        debug!(path = %data_path.display(), initialized = market.is_some(), "Opened context");

        Ok(Self {
            market,
            journal,
            data_path,
            state_path,
            journal_path,
        })
    }

    /// Configuration used by `init`: `config.json` if present, then env overrides
    pub fn load_config(&self) -> Result<MarketConfig, ContextError> {
        let path = self.data_path.join("config.json");
        let mut config = if path.exists() {
            MarketConfig::from_file(&path)?
        } else {
            MarketConfig::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn is_initialized(&self) -> bool {
        self.market.is_some()
    }

    /// Create the marketplace with `owner` as administrator
    pub fn init(&mut self, owner: Address) -> Result<(), ContextError> {
        if self.market.is_some() {
            return Err(ContextError::AlreadyInitialized);
        }
        let config = self.load_config()?;
        let market = Marketplace::new(owner.clone(), config);
        self.save_snapshot(&market)?;
        self.market = Some(market);
        info!(owner = %owner, "Marketplace initialized");
        Ok(())
    }

    pub fn market(&self) -> Result<&Marketplace, ContextError> {
        self.market.as_ref().ok_or(ContextError::NotInitialized)
    }

    /// Run one write against the marketplace
    ///
    /// On success the emitted events are journaled and then the snapshot is
    /// rewritten. A rejected operation touches neither file. The snapshot
    /// never holds state whose events are missing from the journal.
    pub fn commit<T, F>(&mut self, operation: F) -> Result<(T, Vec<JournalRecord>), ContextError>
    where
        F: FnOnce(&mut Marketplace) -> Result<T, MarketError>,
    {
        let market = self.market.as_mut().ok_or(ContextError::NotInitialized)?;
        let output = operation(market)?;
        let events = market.drain_events();
        let snapshot = serde_json::to_string_pretty(&*market).map_err(ContextError::Snapshot)?;

        let records = self.journal.append_all(events)?;
        write_atomic(&self.state_path, &snapshot)?;
        Ok((output, records))
    }

    fn save_snapshot(&self, market: &Marketplace) -> Result<(), ContextError> {
        let snapshot = serde_json::to_string_pretty(market).map_err(ContextError::Snapshot)?;
        write_atomic(&self.state_path, &snapshot)
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    pub fn last_sequence(&self) -> u64 {
        self.journal.last_sequence()
    }
}

fn write_atomic(path: &Path, content: &str) -> Result<(), ContextError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("Marketplace not initialized (run `peerlend init`)")]
    NotInitialized,

    #[error("Marketplace already initialized")]
    AlreadyInitialized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Market(#[from] MarketError),

    #[error("Journal error: {0}")]
    Journal(#[from] EventError),
}
