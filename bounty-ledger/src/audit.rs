//! Audit log accessors
//!
//! Every balance- and membership-affecting operation already appends its
//! entry atomically inside the engines; this module covers the read side
//! (recent activity joined with actor names) and the best-effort failure
//! note written when a persist fails mid-intent.

use crate::{
    types::{ActivityRow, LogAction, LogEntry, UserId},
    Ledger, Result,
};

/// Default number of entries shown by the activity query
pub const DEFAULT_ACTIVITY_LIMIT: usize = 15;

impl Ledger {
    /// Most-recent-first activity affecting `target`, joined with the
    /// acting user's display name
    ///
    /// Self-transfers (registration, bounty awards) show `<Self>` instead
    /// of the name.
    pub fn recent_activity(&self, target: UserId, limit: usize) -> Result<Vec<ActivityRow>> {
        let entries = self.storage.recent_log_for(target, limit)?;

        let rows = entries
            .into_iter()
            .map(|entry| {
                let from_name = if entry.from == entry.to {
                    "<Self>".to_string()
                } else {
                    self.cache
                        .user(entry.from)
                        .map(|u| u.display_name.clone())
                        .unwrap_or_else(|| entry.from.to_string())
                };

                ActivityRow {
                    from_name,
                    action: entry.action,
                    subject: entry.subject,
                    amount: entry.amount,
                    at: entry.at,
                }
            })
            .collect();

        Ok(rows)
    }

    /// Best-effort note that an operation failed to persist
    ///
    /// Never fails the calling intent: if this write fails too, the outcome
    /// is only logged.
    pub(crate) fn note_failure(&self, actor: UserId, command: &str) {
        let entry = LogEntry::new(actor, actor, LogAction::Failure, None, 0, self.now());

        if let Err(e) = self.storage.append_log(&entry) {
            tracing::warn!(command, error = %e, "Failure note could not be written");
        } else {
            tracing::debug!(command, "Failure note recorded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::Config;
    use tempfile::TempDir;

    fn test_ledger() -> (Ledger, ManualClock, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        let clock = ManualClock::new(1_700_000_000);
        let ledger = Ledger::open_with_clock(config, Box::new(clock.clone())).unwrap();
        (ledger, clock, temp_dir)
    }

    #[test]
    fn test_activity_joins_actor_names() {
        let (mut ledger, _clock, _temp) = test_ledger();
        ledger.register(UserId::new(1), "alice", true).unwrap();
        ledger.register(UserId::new(2), "bob", false).unwrap();
        ledger.grant(UserId::new(1), UserId::new(2), 5).unwrap();
        ledger.bump(UserId::new(1), UserId::new(2)).unwrap();

        let rows = ledger
            .recent_activity(UserId::new(2), DEFAULT_ACTIVITY_LIMIT)
            .unwrap();
        assert_eq!(rows.len(), 3);

        // Most recent first: bump, grant, then the registration self-entry
        assert_eq!(rows[0].action, LogAction::Bump);
        assert_eq!(rows[0].from_name, "alice");
        assert_eq!(rows[1].action, LogAction::Grant);
        assert_eq!(rows[1].amount, 5);
        assert_eq!(rows[2].action, LogAction::Register);
        assert_eq!(rows[2].from_name, "<Self>");
    }

    #[test]
    fn test_activity_respects_limit() {
        let (mut ledger, _clock, _temp) = test_ledger();
        ledger.register(UserId::new(1), "alice", true).unwrap();
        ledger.register(UserId::new(2), "bob", false).unwrap();

        for _ in 0..20 {
            ledger.bump(UserId::new(1), UserId::new(2)).unwrap();
        }

        let rows = ledger
            .recent_activity(UserId::new(2), DEFAULT_ACTIVITY_LIMIT)
            .unwrap();
        assert_eq!(rows.len(), DEFAULT_ACTIVITY_LIMIT);
    }

    #[test]
    fn test_failure_note_is_best_effort() {
        let (ledger, _clock, _temp) = test_ledger();
        // No panic, no error surfaced
        ledger.note_failure(UserId::new(1), "grant");
    }
}
