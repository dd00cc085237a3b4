//! Share transfer engine
//!
//! Point-to-point share movement: registration grants, admin grants and
//! cashouts, peer bumps. Every operation validates fully before touching
//! the store, persists balance and audit entry in one batch, then mirrors
//! the result into the cache.

use crate::{
    config::{SETTING_BUMP_SHARES, SETTING_INITIAL_SHARES},
    types::{LogAction, LogEntry, Registration, User, UserId},
    Error, Ledger, Result,
};

impl Ledger {
    /// Register a user, granting the configured initial shares
    ///
    /// Idempotent: a second registration for the same identity changes
    /// nothing and reports [`Registration::AlreadyRegistered`].
    pub fn register(
        &mut self,
        user_id: UserId,
        display_name: &str,
        is_admin: bool,
    ) -> Result<Registration> {
        if self.cache.user(user_id).is_some() {
            return Ok(Registration::AlreadyRegistered);
        }

        let shares = self.setting_amount(SETTING_INITIAL_SHARES);
        let now = self.now();
        let user = User {
            id: user_id,
            display_name: display_name.to_string(),
            shares,
            is_admin,
            created_at: now,
        };
        let entry = LogEntry::new(user_id, user_id, LogAction::Register, None, shares, now);

        self.storage.put_user_logged(&user, &entry)?;
        self.cache.upsert_user(user);
        self.metrics.record_log_entry();

        tracing::info!(user = %user_id, name = display_name, shares, "User registered");

        Ok(Registration::Created { shares })
    }

    /// Credit shares to a target (admin operation, enforced at dispatch)
    pub fn grant(&mut self, actor: UserId, target: UserId, amount: i64) -> Result<()> {
        let user = self.cache.user(target).ok_or(Error::UnknownTarget)?.clone();
        if actor == target {
            return Err(Error::SelfTransfer);
        }
        if amount < 1 {
            return Err(Error::InvalidAmount);
        }

        let mut updated = user;
        updated.shares += amount;
        let entry = LogEntry::new(actor, target, LogAction::Grant, None, amount, self.now());

        self.storage.put_user_logged(&updated, &entry)?;
        self.cache.upsert_user(updated);
        self.metrics.record_log_entry();

        tracing::info!(actor = %actor, target = %target, amount, "Shares granted");

        Ok(())
    }

    /// Redeem shares from a target, returning the remaining balance
    ///
    /// Rejected outright when the balance is short; a cashout can never
    /// drive a balance negative.
    pub fn cashout(&mut self, actor: UserId, target: UserId, amount: i64) -> Result<i64> {
        let user = self.cache.user(target).ok_or(Error::UnknownTarget)?.clone();
        if actor == target {
            return Err(Error::SelfTransfer);
        }
        if amount < 1 {
            return Err(Error::InvalidAmount);
        }
        if user.shares < amount {
            return Err(Error::InsufficientShares {
                balance: user.shares,
                requested: amount,
            });
        }

        let mut updated = user;
        updated.shares -= amount;
        let remaining = updated.shares;
        let entry = LogEntry::new(actor, target, LogAction::Cashout, None, -amount, self.now());

        self.storage.put_user_logged(&updated, &entry)?;
        self.cache.upsert_user(updated);
        self.metrics.record_log_entry();

        tracing::info!(actor = %actor, target = %target, amount, remaining, "Shares cashed out");

        Ok(remaining)
    }

    /// Peer-to-peer gift of the configured `bump_shares`
    pub fn bump(&mut self, actor: UserId, target: UserId) -> Result<i64> {
        if self.cache.user(actor).is_none() {
            return Err(Error::UnknownUser);
        }
        let user = self.cache.user(target).ok_or(Error::UnknownTarget)?.clone();
        if actor == target {
            return Err(Error::SelfTransfer);
        }

        let amount = self.setting_amount(SETTING_BUMP_SHARES);
        let mut updated = user;
        updated.shares += amount;
        let entry = LogEntry::new(actor, target, LogAction::Bump, None, amount, self.now());

        self.storage.put_user_logged(&updated, &entry)?;
        self.cache.upsert_user(updated);
        self.metrics.record_log_entry();

        tracing::info!(actor = %actor, target = %target, amount, "Bump");

        Ok(amount)
    }
}
