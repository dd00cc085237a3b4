//! External interface: intents in, replies out
//!
//! The chat transport delivers already-parsed [`Intent`]s: a command word,
//! the requesting identity, positional string arguments and an optional
//! mention target. This module validates arguments, enforces the admin
//! gate, drives the engines and composes the reply text. It is the only
//! place where internal errors are swapped for a generic user message.

use crate::{
    audit::DEFAULT_ACTIVITY_LIMIT,
    render,
    types::{BountyId, Registration, UserId},
    Error, Ledger, Result,
};

/// Generic message shown when an internal error was logged
const GENERAL_ERROR: &str = "I had an issue processing this request. I've logged the error.";

/// The requesting identity attached to every intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorInfo {
    /// Stable external id
    pub id: i64,

    /// Display name as the transport knows it
    pub display_name: String,

    /// Transport-level admin hint, captured into `User.is_admin` at
    /// registration
    pub admin_hint: bool,
}

/// A user referenced by an intent, by id or by display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mention {
    /// Referenced by stable external id
    Id(i64),
    /// Referenced by display name
    Name(String),
}

/// A structured, already-parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    /// Command word, e.g. `register` or `addbounty`
    pub command: String,

    /// Requesting identity
    pub actor: ActorInfo,

    /// Ordered positional arguments
    pub args: Vec<String>,

    /// Mention target, for commands aimed at another user
    pub mention: Option<Mention>,
}

/// Reply status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    /// The intent succeeded
    Ok,
    /// The intent was rejected or failed
    Error,
}

/// Text relayed back to the requesting user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Outcome
    pub status: ReplyStatus,

    /// User-facing message
    pub message: String,
}

impl Reply {
    /// Successful reply
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Ok,
            message: message.into(),
        }
    }

    /// Error reply
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Error,
            message: message.into(),
        }
    }

    /// Whether the intent succeeded
    pub fn is_ok(&self) -> bool {
        self.status == ReplyStatus::Ok
    }
}

fn arg<'a>(intent: &'a Intent, index: usize, what: &str) -> Result<&'a str> {
    intent
        .args
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| Error::InvalidArgument(format!("This command requires {}!", what)))
}

/// Bounty references may contain spaces and arrive unquoted
fn joined_args(intent: &Intent) -> Result<String> {
    if intent.args.is_empty() {
        return Err(Error::InvalidArgument(
            "Provide a bounty id or name!".to_string(),
        ));
    }
    Ok(intent.args.join(" "))
}

fn mention_of(intent: &Intent) -> Result<&Mention> {
    intent.mention.as_ref().ok_or_else(|| {
        Error::InvalidArgument("This command requires an @mention target!".to_string())
    })
}

fn parse_amount(raw: &str) -> Result<i64> {
    raw.parse().map_err(|_| Error::InvalidAmount)
}

impl Ledger {
    /// Process one intent and produce the reply to relay back
    ///
    /// Never panics and never leaks internal errors: anything that is not
    /// user-correctable is logged, noted in the audit log best-effort, and
    /// replaced with a generic message.
    pub fn handle_intent(&mut self, intent: &Intent) -> Reply {
        let result = self.dispatch(intent);
        self.metrics.record_intent(result.is_err());

        match result {
            Ok(message) => Reply::ok(message),
            Err(err) if err.is_user_facing() => Reply::error(err.to_string()),
            Err(err) => {
                tracing::error!(command = %intent.command, error = %err, "Intent failed");
                self.note_failure(UserId::new(intent.actor.id), &intent.command);
                Reply::error(GENERAL_ERROR)
            }
        }
    }

    fn dispatch(&mut self, intent: &Intent) -> Result<String> {
        let actor = UserId::new(intent.actor.id);

        match intent.command.as_str() {
            // User commands

            "register" => {
                let name = intent.actor.display_name.clone();
                match self.register(actor, &name, intent.actor.admin_hint)? {
                    Registration::Created { shares } => Ok(render::registered(&name, shares)),
                    Registration::AlreadyRegistered => Ok(render::already_registered(&name)),
                }
            }

            "bump" => {
                let target = self.resolve_target(mention_of(intent)?)?;
                let (target_id, target_name) = (target.id, target.display_name.clone());

                let shares = self.bump(actor, target_id)?;
                Ok(render::bumped(
                    &intent.actor.display_name,
                    &target_name,
                    shares,
                ))
            }

            "onthejob" => {
                let reference = joined_args(intent)?;
                let shares = self.join_bounty(&reference, actor)?;

                let id = self.resolve_bounty(&reference, false)?;
                let name = self.cache.bounty(id).map(|b| b.name.clone()).unwrap_or_default();
                Ok(render::joined(&name, shares))
            }

            "abandon" => {
                let reference = joined_args(intent)?;
                let shares = self.abandon_bounty(&reference, actor)?;

                let id = self.resolve_bounty(&reference, false)?;
                let name = self.cache.bounty(id).map(|b| b.name.clone()).unwrap_or_default();
                Ok(render::abandoned(&name, shares))
            }

            "leaderboard" => Ok(render::leaderboard(&self.leaderboard())),

            "bountylist" => Ok(render::bounty_list(&self.active_bounties())),

            // Admin commands

            "grant" => {
                self.require_admin(actor)?;
                let target = self.resolve_target(mention_of(intent)?)?;
                let (target_id, target_name) = (target.id, target.display_name.clone());
                let amount = parse_amount(arg(intent, 0, "a share amount")?)?;

                self.grant(actor, target_id, amount)?;
                Ok(render::granted(
                    &target_name,
                    &intent.actor.display_name,
                    amount,
                ))
            }

            "cashout" => {
                self.require_admin(actor)?;
                let target = self.resolve_target(mention_of(intent)?)?;
                let (target_id, target_name) = (target.id, target.display_name.clone());
                let amount = parse_amount(arg(intent, 0, "a share amount")?)?;

                let remaining = self.cashout(actor, target_id, amount)?;
                Ok(render::cashed_out(&target_name, amount, remaining))
            }

            "addbounty" => {
                self.require_admin(actor)?;
                let name = arg(intent, 0, "a bounty name")?.to_string();
                let capacity = arg(intent, 1, "a capacity")?
                    .parse()
                    .map_err(|_| Error::InvalidCapacity)?;
                let minutes = arg(intent, 2, "a duration in minutes")?
                    .parse()
                    .map_err(|_| Error::InvalidDuration)?;

                let bounty = self.create_bounty(&name, capacity, minutes)?;
                Ok(render::bounty_created(&bounty, minutes))
            }

            "endbounty" => {
                self.require_admin(actor)?;
                let reference = joined_args(intent)?;

                let bounty = self.end_bounty(&reference)?;
                Ok(render::bounty_ended(&bounty))
            }

            "audit" => {
                self.require_admin(actor)?;
                let raw = arg(intent, 0, "a numeric bounty id")?;
                let id = raw
                    .parse::<u64>()
                    .map_err(|_| Error::BountyNotFound(raw.to_string()))?;

                let audit = self.audit_bounty(BountyId::new(id))?;
                Ok(render::bounty_audit(&audit, self.now()))
            }

            "showlog" => {
                self.require_admin(actor)?;
                let target = self.resolve_target(mention_of(intent)?)?;
                let (target_id, target_name) = (target.id, target.display_name.clone());

                let rows = self.recent_activity(target_id, DEFAULT_ACTIVITY_LIMIT)?;
                Ok(render::activity_log(&target_name, &rows))
            }

            "config" => {
                self.require_admin(actor)?;
                match arg(intent, 0, "`get`, `set`, or `show`")? {
                    "get" => {
                        let key = arg(intent, 1, "a setting key")?;
                        Ok(self
                            .setting(key)
                            .unwrap_or_else(|| r"¯\_(ツ)_/¯".to_string()))
                    }
                    "set" => {
                        let key = arg(intent, 1, "a setting key")?.to_string();
                        let value = arg(intent, 2, "a setting value")?.to_string();
                        self.set_setting(&key, &value)?;
                        Ok(render::setting_saved(&key))
                    }
                    "show" => Ok(render::settings_table(&self.settings_snapshot())),
                    other => Err(Error::InvalidArgument(format!(
                        "Uh, your choices are `get`, `set`, or `show`. Not `{}`.",
                        other
                    ))),
                }
            }

            other => Err(Error::UnknownCommand(other.to_string())),
        }
    }

    /// Admin gate: the stored `is_admin` attribute decides, not the hint
    fn require_admin(&self, actor: UserId) -> Result<()> {
        match self.cache.user(actor) {
            Some(user) if user.is_admin => Ok(()),
            _ => Err(Error::NotAuthorized),
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

    fn intent(command: &str, actor: (i64, &str, bool), args: &[&str]) -> Intent {
        Intent {
            command: command.to_string(),
            actor: ActorInfo {
                id: actor.0,
                display_name: actor.1.to_string(),
                admin_hint: actor.2,
            },
            args: args.iter().map(|s| s.to_string()).collect(),
            mention: None,
        }
    }

    fn with_mention(mut intent: Intent, mention: Mention) -> Intent {
        intent.mention = Some(mention);
        intent
    }

    const ADMIN: (i64, &str, bool) = (1, "boss", true);
    const USER: (i64, &str, bool) = (2, "alice", false);

    #[test]
    fn test_register_and_repeat() {
        let (mut ledger, _clock, _temp) = test_ledger();

        let reply = ledger.handle_intent(&intent("register", USER, &[]));
        assert!(reply.is_ok());
        assert!(reply.message.contains("Welcome alice"));
        assert!(reply.message.contains("10 shares"));

        let again = ledger.handle_intent(&intent("register", USER, &[]));
        assert!(again.is_ok());
        assert!(again.message.contains("already registered"));
    }

    #[test]
    fn test_admin_gate_uses_stored_attribute() {
        let (mut ledger, _clock, _temp) = test_ledger();
        ledger.handle_intent(&intent("register", ADMIN, &[]));
        ledger.handle_intent(&intent("register", USER, &[]));

        // Non-admin blocked even with a forged hint
        let forged = (2, "alice", true);
        let reply = ledger.handle_intent(&with_mention(
            intent("grant", forged, &["5"]),
            Mention::Name("boss".to_string()),
        ));
        assert!(!reply.is_ok());
        assert!(reply.message.contains("administrator"));

        // Real admin passes
        let reply = ledger.handle_intent(&with_mention(
            intent("grant", ADMIN, &["5"]),
            Mention::Name("alice".to_string()),
        ));
        assert!(reply.is_ok(), "{}", reply.message);
        assert_eq!(ledger.user(UserId::new(2)).unwrap().shares, 15);
    }

    #[test]
    fn test_unregistered_actor_is_not_admin() {
        let (mut ledger, _clock, _temp) = test_ledger();

        let reply = ledger.handle_intent(&intent("addbounty", ADMIN, &["alley", "2", "10"]));
        assert!(!reply.is_ok());
        assert!(reply.message.contains("administrator"));
    }

    #[test]
    fn test_bounty_flow_through_intents() {
        let (mut ledger, _clock, _temp) = test_ledger();
        ledger.handle_intent(&intent("register", ADMIN, &[]));
        ledger.handle_intent(&intent("register", USER, &[]));

        let reply = ledger.handle_intent(&intent("addbounty", ADMIN, &["Clean Alley", "2", "10"]));
        assert!(reply.is_ok());
        assert!(reply.message.contains("NEW BOUNTY"));

        // Multi-word name arrives as separate args and is rejoined
        let reply = ledger.handle_intent(&intent("onthejob", USER, &["Clean", "Alley"]));
        assert!(reply.is_ok(), "{}", reply.message);
        assert!(reply.message.contains("Clean Alley"));

        let reply = ledger.handle_intent(&intent("audit", ADMIN, &["1"]));
        assert!(reply.is_ok());
        assert!(reply.message.contains("Muscle (1/2)"));

        let reply = ledger.handle_intent(&intent("endbounty", ADMIN, &["Clean Alley"]));
        assert!(reply.is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let (mut ledger, _clock, _temp) = test_ledger();
        ledger.handle_intent(&intent("register", ADMIN, &[]));

        let reply = ledger.handle_intent(&intent("config", ADMIN, &["set", "otj_shares", "3"]));
        assert!(reply.is_ok());

        let reply = ledger.handle_intent(&intent("config", ADMIN, &["get", "otj_shares"]));
        assert_eq!(reply.message, "3");

        let reply = ledger.handle_intent(&intent("config", ADMIN, &["show"]));
        assert!(reply.message.contains("otj_shares"));

        let reply = ledger.handle_intent(&intent("config", ADMIN, &["frobnicate"]));
        assert!(!reply.is_ok());
    }

    #[test]
    fn test_unknown_command() {
        let (mut ledger, _clock, _temp) = test_ledger();
        let reply = ledger.handle_intent(&intent("dance", USER, &[]));
        assert!(!reply.is_ok());
        assert!(reply.message.contains("Unknown command"));
    }

    #[test]
    fn test_missing_mention_is_reported() {
        let (mut ledger, _clock, _temp) = test_ledger();
        ledger.handle_intent(&intent("register", USER, &[]));

        let reply = ledger.handle_intent(&intent("bump", USER, &[]));
        assert!(!reply.is_ok());
        assert!(reply.message.contains("@mention"));
    }
}
