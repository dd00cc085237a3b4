//! In-memory mirror of the durable store
//!
//! The cache is the authoritative in-process view: every intent resolves
//! names and ids against it, and every mutation is mirrored into it only
//! after the durable write succeeded. It is an owned struct handed to the
//! [`crate::Ledger`], never process-global, so tests can build fixture
//! states directly.

use crate::{
    storage::Storage,
    types::{Bounty, BountyId, User, UserId},
    Result,
};
use std::collections::{BTreeMap, HashMap};

/// In-memory tables mirroring the durable store
#[derive(Debug, Default)]
pub struct LedgerCache {
    users: HashMap<UserId, User>,
    bounties: BTreeMap<BountyId, Bounty>,
    participation: HashMap<BountyId, Vec<UserId>>,
    settings: BTreeMap<String, String>,
}

impl LedgerCache {
    /// Build an empty cache (fixture states in tests)
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the full cache from the durable store
    pub fn rebuild(storage: &Storage) -> Result<Self> {
        let mut cache = Self::new();

        for user in storage.load_users()? {
            cache.users.insert(user.id, user);
        }
        for bounty in storage.load_bounties()? {
            cache.bounties.insert(bounty.id, bounty);
        }
        for (bounty_id, user_id) in storage.load_participation()? {
            cache.participation.entry(bounty_id).or_default().push(user_id);
        }
        for (key, value) in storage.load_settings()? {
            cache.settings.insert(key, value);
        }

        tracing::info!(
            users = cache.users.len(),
            bounties = cache.bounties.len(),
            settings = cache.settings.len(),
            "Ledger cache rebuilt"
        );

        Ok(cache)
    }

    // Users

    /// User by id
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    /// First user whose display name matches exactly
    pub fn find_user_by_name(&self, name: &str) -> Option<&User> {
        self.users.values().find(|u| u.display_name == name)
    }

    /// Insert or replace a user row
    pub fn upsert_user(&mut self, user: User) {
        self.users.insert(user.id, user);
    }

    /// All users, unordered
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    // Bounties

    /// Bounty by id
    pub fn bounty(&self, id: BountyId) -> Option<&Bounty> {
        self.bounties.get(&id)
    }

    /// First **active** bounty carrying this exact name
    pub fn find_active_bounty_by_name(&self, name: &str) -> Option<&Bounty> {
        self.bounties
            .values()
            .find(|b| b.is_active && b.name == name)
    }

    /// Insert or replace a bounty row
    pub fn upsert_bounty(&mut self, bounty: Bounty) {
        self.bounties.insert(bounty.id, bounty);
    }

    /// Active bounties in id order
    pub fn active_bounties(&self) -> impl Iterator<Item = &Bounty> {
        self.bounties.values().filter(|b| b.is_active)
    }

    // Participation

    /// Current participants of a bounty, in join order
    pub fn participants(&self, id: BountyId) -> &[UserId] {
        self.participation.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the user holds a participation slot in the bounty
    pub fn is_participant(&self, id: BountyId, user: UserId) -> bool {
        self.participants(id).contains(&user)
    }

    /// Record a membership link
    pub fn add_participant(&mut self, id: BountyId, user: UserId) {
        self.participation.entry(id).or_default().push(user);
    }

    /// Remove a membership link
    pub fn remove_participant(&mut self, id: BountyId, user: UserId) {
        if let Some(members) = self.participation.get_mut(&id) {
            members.retain(|m| *m != user);
        }
    }

    // Settings

    /// Setting override, if one was stored
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// Record a setting override
    pub fn set_setting(&mut self, key: &str, value: &str) {
        self.settings.insert(key.to_string(), value.to_string());
    }

    /// All stored overrides in key order
    pub fn settings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.settings.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
