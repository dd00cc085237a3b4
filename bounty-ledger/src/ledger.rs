//! Main ledger orchestration layer
//!
//! This module ties together the durable store, the in-memory cache, the
//! clock and metrics into the engine the intent layer drives.
//!
//! # Write-through contract
//!
//! Every mutation persists to the [`Storage`] first and mirrors into the
//! [`LedgerCache`] only on success, so a failed write leaves the in-process
//! view untouched and the next intent still sees consistent state.
//!
//! # Example
//!
//! ```no_run
//! use bounty_ledger::{Config, Ledger};
//!
//! fn main() -> bounty_ledger::Result<()> {
//!     let config = Config::default();
//!     let mut ledger = Ledger::open(config)?;
//!
//!     let bounty = ledger.create_bounty("Clean Alley", 2, 10)?;
//!     println!("bounty {} open until {}", bounty.id, bounty.end_time);
//!     Ok(())
//! }
//! ```

use crate::{
    cache::LedgerCache,
    clock::{Clock, SystemClock},
    config::{SettingsDefaults, SETTING_ALLOCATION},
    intent::Mention,
    metrics::Metrics,
    types::{BountyId, BountyListing, Leaderboard, LeaderboardRow, User, UserId},
    Config, Error, Result, Storage,
};
use std::collections::BTreeMap;

/// Main ledger interface
///
/// Owns every piece of mutable state; handed to the single-writer actor so
/// no intent ever observes another intent mid-flight.
pub struct Ledger {
    /// Durable store
    pub(crate) storage: Storage,

    /// In-memory mirror, rebuilt from the store at open
    pub(crate) cache: LedgerCache,

    /// Injected time source
    pub(crate) clock: Box<dyn Clock>,

    /// Compile-time fallbacks for the settings table
    pub(crate) defaults: SettingsDefaults,

    /// Metrics collector
    pub(crate) metrics: Metrics,
}

impl Ledger {
    /// Open ledger with configuration, on wall-clock time
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with_clock(config, Box::new(SystemClock))
    }

    /// Open ledger with an injected time source
    pub fn open_with_clock(config: Config, clock: Box<dyn Clock>) -> Result<Self> {
        let storage = Storage::open(&config)?;
        let cache = LedgerCache::rebuild(&storage)?;

        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to create metrics: {}", e)))?;
        metrics
            .active_bounties
            .set(cache.active_bounties().count() as i64);

        Ok(Self {
            storage,
            cache,
            clock,
            defaults: config.defaults,
            metrics,
        })
    }

    /// Current unix time from the injected clock
    pub(crate) fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Metrics collector handle
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    // Settings

    /// Setting value: stored override, else compile-time fallback
    pub fn setting(&self, key: &str) -> Option<String> {
        match self.cache.setting(key) {
            Some(value) => Some(value.to_string()),
            None => self.defaults.get(key),
        }
    }

    /// Numeric setting value with fallback on missing or unparsable override
    pub fn setting_amount(&self, key: &str) -> i64 {
        if let Some(value) = self.cache.setting(key) {
            match value.parse() {
                Ok(amount) => return amount,
                Err(_) => {
                    tracing::warn!(key, value, "Non-numeric setting override, using fallback");
                }
            }
        }

        self.defaults.amount(key).unwrap_or(0)
    }

    /// Upsert a setting override (persist, then cache)
    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<()> {
        self.storage.put_setting(key, value)?;
        self.cache.set_setting(key, value);

        tracing::info!(key, value, "Setting updated");
        Ok(())
    }

    /// Fallbacks overlaid with stored overrides, ordered by key
    pub fn settings_snapshot(&self) -> Vec<(String, String)> {
        let mut merged: BTreeMap<String, String> = self.defaults.pairs().into_iter().collect();
        for (key, value) in self.cache.settings() {
            merged.insert(key.to_string(), value.to_string());
        }

        merged.into_iter().collect()
    }

    // Queries

    /// User by id
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.cache.user(id)
    }

    /// All users ordered by shares descending (name breaks ties)
    pub fn leaderboard(&self) -> Leaderboard {
        let mut rows: Vec<LeaderboardRow> = self
            .cache
            .users()
            .map(|u| LeaderboardRow {
                display_name: u.display_name.clone(),
                shares: u.shares,
                joined_at: u.created_at,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.shares
                .cmp(&a.shares)
                .then_with(|| a.display_name.cmp(&b.display_name))
        });

        let total_shares = rows.iter().map(|r| r.shares).sum();
        let allocation = self.setting(SETTING_ALLOCATION).unwrap_or_default();

        Leaderboard {
            rows,
            total_shares,
            allocation,
        }
    }

    /// Active, unexpired bounties with seats and time left
    ///
    /// Read-only: expired bounties drop out of the view but stay untouched
    /// in the store until the next targeted mutation sweeps them.
    pub fn active_bounties(&self) -> Vec<BountyListing> {
        let now = self.now();

        self.cache
            .active_bounties()
            .filter(|b| !b.is_expired(now))
            .map(|b| BountyListing {
                id: b.id,
                name: b.name.clone(),
                seats_left: b.seats_left(self.cache.participants(b.id).len()),
                capacity: b.capacity,
                ends_in: b.end_time - now,
            })
            .collect()
    }

    // Resolution

    /// Resolve a bounty reference: numeric text tries the id first, then
    /// falls back to active-name lookup
    pub(crate) fn resolve_bounty(&self, reference: &str, require_active: bool) -> Result<BountyId> {
        if let Ok(raw) = reference.parse::<u64>() {
            if let Some(bounty) = self.cache.bounty(BountyId::new(raw)) {
                if !require_active || bounty.is_active {
                    return Ok(bounty.id);
                }
            }
        }

        self.cache
            .find_active_bounty_by_name(reference)
            .map(|b| b.id)
            .ok_or_else(|| Error::BountyNotFound(reference.to_string()))
    }

    /// Resolve a mention to a registered user
    pub(crate) fn resolve_target(&self, mention: &Mention) -> Result<&User> {
        let user = match mention {
            Mention::Id(raw) => self.cache.user(UserId::new(*raw)),
            Mention::Name(name) => self.cache.find_user_by_name(name),
        };

        user.ok_or(Error::UnknownTarget)
    }
}
