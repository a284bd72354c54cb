//! Privileged price feed with bounded updates and per-block history

use peerlend_core::units::{change_bps, exceeds_bps};
use peerlend_core::{Address, BlockNumber};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::config::OracleConfig;
use crate::error::OracleError;
use crate::valuation::{self, check_price};

/// Result of an accepted price update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub previous: Option<u128>,
    pub price: u128,
    pub block: BlockNumber,
}

/// Collateral price oracle
///
/// Only `admin` may write. The first write is unbounded; every later write
/// must stay within `max_price_change_bps` of the current price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceOracle {
    config: OracleConfig,
    admin: Address,
    price: Option<u128>,
    last_update_block: Option<BlockNumber>,
    history: BTreeMap<BlockNumber, u128>,
}

impl PriceOracle {
    pub fn new(admin: Address, config: OracleConfig) -> Self {
        Self {
            config,
            admin,
            price: None,
            last_update_block: None,
            history: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    pub fn admin(&self) -> &Address {
        &self.admin
    }

    /// Record a new price at block `now`
    pub fn set_price(
        &mut self,
        caller: &Address,
        new_price: u128,
        now: BlockNumber,
    ) -> Result<PriceUpdate, OracleError> {
        if caller != &self.admin {
            return Err(OracleError::Unauthorized {
                caller: caller.clone(),
            });
        }
        check_price(new_price)?;

        if let Some(last_update) = self.last_update_block {
            if now < last_update {
                return Err(OracleError::BlockRegression { last_update, now });
            }
        }

        if let Some(current) = self.price {
            let max_bps = self.config.max_price_change_bps;
            if exceeds_bps(current, new_price, max_bps).ok_or(OracleError::Overflow)? {
                let change = change_bps(current, new_price).ok_or(OracleError::Overflow)?;
                warn!(current = %current, proposed = %new_price, change_bps = %change, "Rejected oracle update");
                return Err(OracleError::PriceChangeTooLarge {
                    current,
                    proposed: new_price,
                    change_bps: change,
                    max_bps,
                });
            }
        }

        let previous = self.price.replace(new_price);
        self.last_update_block = Some(now);
        self.history.insert(now, new_price);
        while self.history.len() > self.config.history_capacity.max(1) {
            self.history.pop_first();
        }

        info!(price = %new_price, block = now, "Oracle price updated");
        Ok(PriceUpdate {
            previous,
            price: new_price,
            block: now,
        })
    }

    /// Current price, or `Unavailable` if never written
    pub fn get_price(&self) -> Result<u128, OracleError> {
        self.price.ok_or(OracleError::Unavailable)
    }

    /// Snapshot recorded at exactly block `block`, `None` when there is no data
    pub fn get_price_at_block(&self, block: BlockNumber) -> Option<u128> {
        self.history.get(&block).copied()
    }

    pub fn last_update_block(&self) -> Option<BlockNumber> {
        self.last_update_block
    }

    /// Retained history, oldest first
    pub fn history(&self) -> impl Iterator<Item = (BlockNumber, u128)> + '_ {
        self.history.iter().map(|(b, p)| (*b, *p))
    }

    /// True iff the last update lies within the freshness window
    pub fn is_fresh(&self, now: BlockNumber) -> bool {
        match self.last_update_block {
            Some(last) => now.saturating_sub(last) <= self.config.staleness_blocks,
            None => false,
        }
    }

    /// Current price, provided it is fresh
    pub fn fresh_price(&self, now: BlockNumber) -> Result<u128, OracleError> {
        let (price, last_update) = match (self.price, self.last_update_block) {
            (Some(price), Some(last)) => (price, last),
            _ => return Err(OracleError::Unavailable),
        };
        if !self.is_fresh(now) {
            warn!(last_update, now, "Oracle price is stale");
            return Err(OracleError::StalePrice {
                last_update,
                now,
                window: self.config.staleness_blocks,
            });
        }
        Ok(price)
    }

    /// USD value of `collateral` at the current price
    pub fn value_of(&self, collateral: u128) -> Result<u128, OracleError> {
        valuation::value_at(collateral, self.get_price()?)
    }

    /// Collateral amount worth `usd_value` at the current price
    pub fn amount_for(&self, usd_value: u128) -> Result<u128, OracleError> {
        valuation::amount_at(usd_value, self.get_price()?)
    }
}
