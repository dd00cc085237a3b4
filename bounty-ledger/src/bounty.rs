//! Bounty lifecycle engine
//!
//! State machine per bounty: `Active -> Inactive`, exactly once, via an
//! explicit end or lazy expiry. Expiry is swept at the top of every
//! bounty-touching mutation rather than by a background timer, which keeps
//! intent processing deterministic.
//!
//! Policy decisions (held invariant across all code paths):
//! - an explicit end overwrites `end_time` with now; lazy expiry preserves
//!   the natural window
//! - abandoning refunds the currently configured `otj_shares`, not the
//!   historical award
//! - ending a bounty retains its participation rows as history

use crate::{
    config::SETTING_OTJ_SHARES,
    types::{Bounty, BountyAudit, BountyId, LogAction, LogEntry, UserId},
    Error, Ledger, Result,
};

impl Ledger {
    /// Create an active bounty with `end_time = now + duration_minutes * 60`
    pub fn create_bounty(
        &mut self,
        name: &str,
        capacity: i64,
        duration_minutes: i64,
    ) -> Result<Bounty> {
        if capacity < 1 {
            return Err(Error::InvalidCapacity);
        }
        if duration_minutes < 1 {
            return Err(Error::InvalidDuration);
        }
        if self.cache.find_active_bounty_by_name(name).is_some() {
            return Err(Error::DuplicateBounty(name.to_string()));
        }

        let now = self.now();
        let end_time = now + duration_minutes * 60;

        let bounty = self
            .storage
            .create_bounty(name, capacity as u32, end_time, now)?;
        self.cache.upsert_bounty(bounty.clone());
        self.metrics.active_bounties.inc();

        tracing::info!(
            bounty = %bounty.id,
            name = %bounty.name,
            capacity = bounty.capacity,
            end_time,
            "Bounty opened"
        );

        Ok(bounty)
    }

    /// End a bounty now; a second call reports not-found
    ///
    /// Resolution requires the bounty to still be active on both the id and
    /// the name path.
    pub fn end_bounty(&mut self, reference: &str) -> Result<Bounty> {
        let id = self.resolve_bounty(reference, true)?;

        let mut bounty = self
            .cache
            .bounty(id)
            .ok_or_else(|| Error::BountyNotFound(reference.to_string()))?
            .clone();
        bounty.is_active = false;
        bounty.end_time = self.now();

        self.storage.put_bounty(&bounty)?;
        self.cache.upsert_bounty(bounty.clone());
        self.metrics.active_bounties.dec();

        tracing::info!(bounty = %bounty.id, name = %bounty.name, "Bounty ended");

        Ok(bounty)
    }

    /// Join an active bounty, awarding the configured `otj_shares`
    pub fn join_bounty(&mut self, reference: &str, user_id: UserId) -> Result<i64> {
        let user = self.cache.user(user_id).ok_or(Error::UnknownUser)?.clone();
        let id = self.resolve_bounty(reference, false)?;

        self.sweep_if_expired(id)?;
        let bounty = self
            .cache
            .bounty(id)
            .ok_or_else(|| Error::BountyNotFound(reference.to_string()))?;
        if !bounty.is_active {
            return Err(Error::BountyEnded(id));
        }
        if self.cache.is_participant(id, user_id) {
            return Err(Error::AlreadyJoined(id));
        }
        if self.cache.participants(id).len() >= bounty.capacity as usize {
            return Err(Error::BountyFull(id));
        }

        let amount = self.setting_amount(SETTING_OTJ_SHARES);
        let mut updated = user;
        updated.shares += amount;
        let entry = LogEntry::new(
            user_id,
            user_id,
            LogAction::Join,
            Some(id),
            amount,
            self.now(),
        );

        self.storage.record_join(&updated, id, &entry)?;
        self.cache.upsert_user(updated);
        self.cache.add_participant(id, user_id);
        self.metrics.record_log_entry();

        tracing::info!(user = %user_id, bounty = %id, amount, "Bounty joined");

        Ok(amount)
    }

    /// Leave an active bounty, refunding the currently configured
    /// `otj_shares`
    ///
    /// If the setting changed since the join, the refund differs from the
    /// award; the balance may transiently go negative. Accepted behavior.
    pub fn abandon_bounty(&mut self, reference: &str, user_id: UserId) -> Result<i64> {
        let user = self.cache.user(user_id).ok_or(Error::UnknownUser)?.clone();
        let id = self.resolve_bounty(reference, false)?;

        self.sweep_if_expired(id)?;
        let bounty = self
            .cache
            .bounty(id)
            .ok_or_else(|| Error::BountyNotFound(reference.to_string()))?;
        if !bounty.is_active {
            return Err(Error::BountyEnded(id));
        }
        if !self.cache.is_participant(id, user_id) {
            return Err(Error::NotParticipating(id));
        }

        let amount = self.setting_amount(SETTING_OTJ_SHARES);
        let mut updated = user;
        updated.shares -= amount;
        let entry = LogEntry::new(
            user_id,
            user_id,
            LogAction::Abandon,
            Some(id),
            -amount,
            self.now(),
        );

        self.storage.record_leave(&updated, id, &entry)?;
        self.cache.upsert_user(updated);
        self.cache.remove_participant(id, user_id);
        self.metrics.record_log_entry();

        tracing::info!(user = %user_id, bounty = %id, amount, "Bounty abandoned");

        Ok(amount)
    }

    /// Read-only bounty summary with timing and the current crew
    ///
    /// Works on ended bounties too; participation rows are kept as history.
    pub fn audit_bounty(&self, id: BountyId) -> Result<BountyAudit> {
        let bounty = self
            .cache
            .bounty(id)
            .ok_or_else(|| Error::BountyNotFound(id.to_string()))?;

        let participants = self
            .cache
            .participants(id)
            .iter()
            .filter_map(|uid| self.cache.user(*uid))
            .map(|u| u.display_name.clone())
            .collect();

        Ok(BountyAudit {
            id: bounty.id,
            name: bounty.name.clone(),
            capacity: bounty.capacity,
            created_at: bounty.created_at,
            end_time: bounty.end_time,
            is_active: bounty.is_active,
            participants,
        })
    }

    /// Lazily close a bounty whose window elapsed, preserving its natural
    /// `end_time`
    ///
    /// Called at the top of every bounty-touching mutation; a no-op for
    /// bounties that are inactive or still inside their window.
    pub(crate) fn sweep_if_expired(&mut self, id: BountyId) -> Result<()> {
        let Some(bounty) = self.cache.bounty(id) else {
            return Ok(());
        };
        if !bounty.is_active || !bounty.is_expired(self.now()) {
            return Ok(());
        }

        let mut expired = bounty.clone();
        expired.is_active = false;

        self.storage.put_bounty(&expired)?;
        self.cache.upsert_bounty(expired);
        self.metrics.active_bounties.dec();

        tracing::info!(bounty = %id, "Bounty expired");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
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

    fn registered(ledger: &mut Ledger, id: i64, name: &str) -> UserId {
        ledger.register(UserId::new(id), name, false).unwrap();
        UserId::new(id)
    }

    #[test]
    fn test_create_bounty_validation() {
        let (mut ledger, _clock, _temp) = test_ledger();

        assert!(matches!(
            ledger.create_bounty("alley", 0, 10),
            Err(Error::InvalidCapacity)
        ));
        assert!(matches!(
            ledger.create_bounty("alley", 2, 0),
            Err(Error::InvalidDuration)
        ));

        ledger.create_bounty("alley", 2, 10).unwrap();
        assert!(matches!(
            ledger.create_bounty("alley", 3, 10),
            Err(Error::DuplicateBounty(_))
        ));
    }

    #[test]
    fn test_name_reuse_after_end() {
        let (mut ledger, _clock, _temp) = test_ledger();

        let first = ledger.create_bounty("alley", 2, 10).unwrap();
        ledger.end_bounty("alley").unwrap();

        // The ended bounty frees its name
        let second = ledger.create_bounty("alley", 2, 10).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn test_end_bounty_overwrites_end_time() {
        let (mut ledger, clock, _temp) = test_ledger();

        let bounty = ledger.create_bounty("alley", 2, 60).unwrap();
        clock.advance(120);

        let ended = ledger.end_bounty(&bounty.id.to_string()).unwrap();
        assert!(!ended.is_active);
        assert_eq!(ended.end_time, clock.now());
    }

    #[test]
    fn test_end_bounty_twice_is_not_found() {
        let (mut ledger, _clock, _temp) = test_ledger();

        let bounty = ledger.create_bounty("alley", 2, 10).unwrap();
        ledger.end_bounty(&bounty.id.to_string()).unwrap();

        assert!(matches!(
            ledger.end_bounty(&bounty.id.to_string()),
            Err(Error::BountyNotFound(_))
        ));
    }

    #[test]
    fn test_join_checks_run_in_order() {
        let (mut ledger, _clock, _temp) = test_ledger();
        let alice = registered(&mut ledger, 1, "alice");
        let bob = registered(&mut ledger, 2, "bob");
        let carol = registered(&mut ledger, 3, "carol");

        assert!(matches!(
            ledger.join_bounty("alley", UserId::new(99)),
            Err(Error::UnknownUser)
        ));

        let bounty = ledger.create_bounty("alley", 2, 10).unwrap();
        let reference = bounty.id.to_string();

        assert!(matches!(
            ledger.join_bounty("nothing", alice),
            Err(Error::BountyNotFound(_))
        ));

        assert_eq!(ledger.join_bounty(&reference, alice).unwrap(), 1);
        assert!(matches!(
            ledger.join_bounty(&reference, alice),
            Err(Error::AlreadyJoined(_))
        ));

        ledger.join_bounty(&reference, bob).unwrap();
        assert!(matches!(
            ledger.join_bounty(&reference, carol),
            Err(Error::BountyFull(_))
        ));
    }

    #[test]
    fn test_lazy_expiry_preserves_end_time() {
        let (mut ledger, clock, _temp) = test_ledger();
        let alice = registered(&mut ledger, 1, "alice");

        let bounty = ledger.create_bounty("alley", 2, 1).unwrap();
        let natural_end = bounty.end_time;
        clock.advance(120);

        let err = ledger.join_bounty(&bounty.id.to_string(), alice).unwrap_err();
        assert!(matches!(err, Error::BountyEnded(_)));

        let swept = ledger.audit_bounty(bounty.id).unwrap();
        assert!(!swept.is_active);
        assert_eq!(swept.end_time, natural_end);
    }

    #[test]
    fn test_abandon_requires_participation() {
        let (mut ledger, _clock, _temp) = test_ledger();
        let alice = registered(&mut ledger, 1, "alice");

        let bounty = ledger.create_bounty("alley", 2, 10).unwrap();
        assert!(matches!(
            ledger.abandon_bounty(&bounty.id.to_string(), alice),
            Err(Error::NotParticipating(_))
        ));
    }

    #[test]
    fn test_audit_lists_crew_in_join_order() {
        let (mut ledger, _clock, _temp) = test_ledger();
        let alice = registered(&mut ledger, 1, "alice");
        let bob = registered(&mut ledger, 2, "bob");

        let bounty = ledger.create_bounty("alley", 3, 10).unwrap();
        ledger.join_bounty(&bounty.id.to_string(), bob).unwrap();
        ledger.join_bounty(&bounty.id.to_string(), alice).unwrap();

        let audit = ledger.audit_bounty(bounty.id).unwrap();
        assert_eq!(audit.participants, vec!["bob", "alice"]);
        assert!(matches!(
            ledger.audit_bounty(BountyId::new(77)),
            Err(Error::BountyNotFound(_))
        ));
    }
}
