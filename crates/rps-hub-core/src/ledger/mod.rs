//! Injected serializer dependencies: the ledger clock and the settlement
//! seam for outbound fund transfers.
//!
//! Both are trait objects so tests can substitute deterministic fakes.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

use crate::types::{Amount, PlayerId};

/// The serializer's notion of elapsed time.
///
/// Timeout logic must never use a single caller's wall clock; every
/// operation reads time through this trait.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time, for production use
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for deterministic tests and demos
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at the given instant
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Create a clock frozen at the current wall-clock time
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap();
        *current = *current + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap()
    }
}

/// Errors from the settlement layer
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Outbound fund transfers.
///
/// The core escrows incoming stakes itself; every payout leaves through
/// this seam. A failed payout aborts the whole operation.
pub trait Settlement: Send + Sync {
    fn payout(&self, to: PlayerId, amount: Amount) -> Result<(), SettlementError>;
}

/// In-memory settlement for testing: records every credit per player and
/// can be armed to reject transfers.
pub struct MockSettlement {
    credits: Mutex<HashMap<PlayerId, Amount>>,
    failing: Mutex<bool>,
}

impl MockSettlement {
    pub fn new() -> Self {
        Self {
            credits: Mutex::new(HashMap::new()),
            failing: Mutex::new(false),
        }
    }

    /// Total amount credited to the given player so far
    pub fn credited(&self, player: PlayerId) -> Amount {
        self.credits
            .lock()
            .unwrap()
            .get(&player)
            .copied()
            .unwrap_or(0)
    }

    /// Total amount credited across all players
    pub fn total_credited(&self) -> Amount {
        self.credits.lock().unwrap().values().sum()
    }

    /// Arm or disarm transfer failure
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

impl Default for MockSettlement {
    fn default() -> Self {
        Self::new()
    }
}

impl Settlement for MockSettlement {
    fn payout(&self, to: PlayerId, amount: Amount) -> Result<(), SettlementError> {
        if *self.failing.lock().unwrap() {
            return Err(SettlementError::Rejected("mock transfer failure".into()));
        }
        let mut credits = self.credits.lock().unwrap();
        let entry = credits.entry(to).or_insert(0);
        *entry = entry.saturating_add(amount);
        Ok(())
    }
}
