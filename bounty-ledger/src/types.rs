//! Core types for the bounty ledger
//!
//! All persisted types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (integer share counts)

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable external user identity (the chat network's numeric account id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(i64);

impl UserId {
    /// Create new user ID
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw numeric id
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bounty identifier, assigned monotonically by the durable store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BountyId(u64);

impl BountyId {
    /// Create new bounty ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw numeric id
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BountyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered participant of the share ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// External identity
    pub id: UserId,

    /// Human-readable name shown in replies and tables
    pub display_name: String,

    /// Integer share balance
    pub shares: i64,

    /// Administrator flag, captured at registration
    pub is_admin: bool,

    /// Registration timestamp (unix seconds)
    pub created_at: i64,
}

/// A time-boxed, capacity-limited reward opportunity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounty {
    /// Store-assigned monotonic id
    pub id: BountyId,

    /// Human label, unique among active bounties only
    pub name: String,

    /// Maximum number of participants
    pub capacity: u32,

    /// Absolute close timestamp (unix seconds)
    pub end_time: i64,

    /// Active flag; transitions to false exactly once
    pub is_active: bool,

    /// Creation timestamp (unix seconds)
    pub created_at: i64,
}

impl Bounty {
    /// Whether the bounty's window has elapsed at `now`
    pub fn is_expired(&self, now: i64) -> bool {
        self.end_time < now
    }

    /// Seats still open given the current participant count
    pub fn seats_left(&self, taken: usize) -> u32 {
        self.capacity.saturating_sub(taken as u32)
    }
}

/// Action recorded by an audit log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogAction {
    /// Initial registration grant
    Register,
    /// Admin share grant
    Grant,
    /// Admin share redemption
    Cashout,
    /// Peer-to-peer share gift
    Bump,
    /// Bounty participation award
    Join,
    /// Bounty participation refund
    Abandon,
    /// Best-effort note that a prior operation failed to persist
    Failure,
}

impl LogAction {
    /// Short label used in rendered log tables
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::Register => "register",
            LogAction::Grant => "grant",
            LogAction::Cashout => "cashout",
            LogAction::Bump => "bump",
            LogAction::Join => "join",
            LogAction::Abandon => "abandon",
            LogAction::Failure => "failure",
        }
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable audit record of one balance- or membership-affecting operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique entry ID (UUIDv7 for time-ordering)
    pub entry_id: Uuid,

    /// Acting user
    pub from: UserId,

    /// Affected user
    pub to: UserId,

    /// What happened
    pub action: LogAction,

    /// Bounty the action concerned, if any
    pub subject: Option<BountyId>,

    /// Signed share delta applied to `to`
    pub amount: i64,

    /// Timestamp (unix seconds)
    pub at: i64,
}

impl LogEntry {
    /// Create a new entry stamped with a time-ordered id
    pub fn new(
        from: UserId,
        to: UserId,
        action: LogAction,
        subject: Option<BountyId>,
        amount: i64,
        at: i64,
    ) -> Self {
        Self {
            entry_id: Uuid::now_v7(),
            from,
            to,
            action,
            subject,
            amount,
            at,
        }
    }
}

/// Outcome of a registration request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// A new user was created and granted the initial share allotment
    Created {
        /// Shares granted to the new user
        shares: i64,
    },
    /// The identity was already registered; nothing changed
    AlreadyRegistered,
}

/// Read-only bounty summary produced by the audit operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BountyAudit {
    /// Bounty id
    pub id: BountyId,
    /// Bounty name
    pub name: String,
    /// Participant capacity
    pub capacity: u32,
    /// Creation timestamp
    pub created_at: i64,
    /// Close timestamp (natural or explicit)
    pub end_time: i64,
    /// Whether the bounty is still active
    pub is_active: bool,
    /// Display names of current participants, in join order
    pub participants: Vec<String>,
}

/// One row of the active-bounty listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BountyListing {
    /// Bounty id
    pub id: BountyId,
    /// Bounty name
    pub name: String,
    /// Seats still open
    pub seats_left: u32,
    /// Participant capacity
    pub capacity: u32,
    /// Seconds until the window closes
    pub ends_in: i64,
}

/// One row of the leaderboard, ordered by shares descending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRow {
    /// Display name
    pub display_name: String,
    /// Share balance
    pub shares: i64,
    /// Registration timestamp
    pub joined_at: i64,
}

/// Leaderboard snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaderboard {
    /// Rows ordered by shares descending
    pub rows: Vec<LeaderboardRow>,
    /// Sum of all balances
    pub total_shares: i64,
    /// Configured reward allocation label
    pub allocation: String,
}

/// One row of a user's recent activity, joined with the actor's name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRow {
    /// Acting user's display name; `<Self>` for self-transfers
    pub from_name: String,
    /// What happened
    pub action: LogAction,
    /// Bounty the action concerned, if any
    pub subject: Option<BountyId>,
    /// Signed share delta
    pub amount: i64,
    /// Timestamp (unix seconds)
    pub at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounty(end_time: i64) -> Bounty {
        Bounty {
            id: BountyId::new(1),
            name: "Clean Alley".to_string(),
            capacity: 2,
            end_time,
            is_active: true,
            created_at: 1_000,
        }
    }

    #[test]
    fn test_bounty_expiry() {
        let b = bounty(2_000);
        assert!(!b.is_expired(1_500));
        assert!(!b.is_expired(2_000));
        assert!(b.is_expired(2_001));
    }

    #[test]
    fn test_seats_left_saturates() {
        let b = bounty(2_000);
        assert_eq!(b.seats_left(0), 2);
        assert_eq!(b.seats_left(1), 1);
        assert_eq!(b.seats_left(5), 0);
    }

    #[test]
    fn test_log_action_labels() {
        assert_eq!(LogAction::Join.as_str(), "join");
        assert_eq!(LogAction::Cashout.to_string(), "cashout");
    }

    #[test]
    fn test_log_entry_ids_are_unique_v7() {
        let a = LogEntry::new(UserId::new(1), UserId::new(1), LogAction::Register, None, 10, 0);
        let b = LogEntry::new(UserId::new(1), UserId::new(2), LogAction::Bump, None, 1, 0);
        assert_ne!(a.entry_id, b.entry_id);
        assert_eq!(a.entry_id.get_version_num(), 7);
    }
}
