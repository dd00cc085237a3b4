//! User-facing reply text
//!
//! Everything the transport relays back to chat is composed here: one-line
//! acknowledgements plus the aligned monospace tables for the leaderboard,
//! the activity log, the settings overview and the bounty list. The engines
//! never format text themselves.

use crate::types::{ActivityRow, Bounty, BountyAudit, BountyListing, Leaderboard};
use chrono::DateTime;

/// Render a duration with at most two significant units ("1 day, 2 hrs")
pub fn display_time(seconds: i64) -> String {
    const INTERVALS: [(&str, i64); 5] = [
        ("wks", 604_800),
        ("days", 86_400),
        ("hrs", 3_600),
        ("mins", 60),
        ("sec", 1),
    ];

    let mut remaining = seconds.max(0);
    let mut parts = Vec::new();

    for (name, count) in INTERVALS {
        let value = remaining / count;
        if value > 0 {
            remaining -= value * count;
            let unit = if value == 1 {
                name.trim_end_matches('s')
            } else {
                name
            };
            parts.push(format!("{} {}", value, unit));
        }
    }

    if parts.is_empty() {
        return "0 sec".to_string();
    }
    parts.truncate(2);
    parts.join(", ")
}

/// "1 share" / "3 shares"
pub fn pluralize(amount: i64, noun: &str) -> String {
    if amount == 1 {
        format!("{} {}", amount, noun)
    } else {
        format!("{} {}s", amount, noun)
    }
}

fn short_date(at: i64) -> String {
    DateTime::from_timestamp(at, 0)
        .map(|d| d.format("%b %d").to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn short_datetime(at: i64) -> String {
    DateTime::from_timestamp(at, 0)
        .map(|d| d.format("%b-%d %H:%M").to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn full_datetime(at: i64) -> String {
    DateTime::from_timestamp(at, 0)
        .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "?".to_string())
}

// One-line acknowledgements

/// Welcome text for a fresh registration
pub fn registered(name: &str, shares: i64) -> String {
    format!(
        "Welcome {}! We've granted you {}!",
        name,
        pluralize(shares, "share")
    )
}

/// Reply for a repeat registration
pub fn already_registered(name: &str) -> String {
    format!("{}, you're already registered!", name)
}

/// Announcement for a freshly opened bounty
pub fn bounty_created(bounty: &Bounty, duration_minutes: i64) -> String {
    format!(
        "NEW BOUNTY!\n\nID {}: `{}` now has {} for willing muscle.\nThis bounty is open for {}. GO GO GO!",
        bounty.id,
        bounty.name,
        pluralize(bounty.capacity as i64, "open spot"),
        display_time(duration_minutes * 60)
    )
}

/// Acknowledgement for an explicit end
pub fn bounty_ended(bounty: &Bounty) -> String {
    format!("Bounty `{}` is ended!", bounty.name)
}

/// Acknowledgement for a successful join
pub fn joined(bounty_name: &str, shares: i64) -> String {
    format!(
        "Thanks for taking on `{}`! You've earned {}!",
        bounty_name,
        pluralize(shares, "share")
    )
}

/// Acknowledgement for leaving a bounty
pub fn abandoned(bounty_name: &str, shares: i64) -> String {
    format!(
        "You've left the bounty `{}` and {} removed.",
        bounty_name,
        if shares == 1 {
            "1 share was".to_string()
        } else {
            format!("{} shares were", shares)
        }
    )
}

/// Announcement for a bump
pub fn bumped(from: &str, to: &str, shares: i64) -> String {
    format!("{} 🤜💥🤛 {}!\n{} added!", from, to, pluralize(shares, "share"))
}

/// Announcement for an admin grant
pub fn granted(target: &str, from: &str, shares: i64) -> String {
    format!("{} received {} from {} 🤑", target, pluralize(shares, "share"), from)
}

/// Acknowledgement for a cashout
pub fn cashed_out(target: &str, shares: i64, remaining: i64) -> String {
    format!(
        "{} took the money and ran! 🤑\n{} redeemed, with {} left.",
        target,
        pluralize(shares, "share"),
        pluralize(remaining, "share")
    )
}

/// Acknowledgement for a saved setting
pub fn setting_saved(key: &str) -> String {
    format!("Setting saved for `{}`", key)
}

// Tables

/// Multi-line bounty audit summary
pub fn bounty_audit(audit: &BountyAudit, now: i64) -> String {
    let timing = if audit.is_active && audit.end_time > now {
        format!("Ends in {}", display_time(audit.end_time - now))
    } else {
        format!("Ran for {}", display_time(audit.end_time - audit.created_at))
    };

    format!(
        "Bounty {}: `{}`\nCreated {}\n{}\n\nMuscle ({}/{}): {}",
        audit.id,
        audit.name,
        full_datetime(audit.created_at),
        timing,
        audit.participants.len(),
        audit.capacity,
        audit.participants.join(", ")
    )
}

/// Leaderboard table with share percentages
pub fn leaderboard(board: &Leaderboard) -> String {
    if board.rows.is_empty() {
        return "There are currently no registered users!".to_string();
    }

    let name_width = board
        .rows
        .iter()
        .map(|r| r.display_name.len())
        .max()
        .unwrap_or(4)
        .max(4);

    let header = format!("{:<name_width$} | Joined | Shares (%)", "User");
    let mut table = format!("{}\n{}\n", header, "=".repeat(header.len()));

    for row in &board.rows {
        let percent = if board.total_shares != 0 {
            row.shares as f64 / board.total_shares as f64 * 100.0
        } else {
            0.0
        };
        table.push_str(&format!(
            "{:<name_width$} | {} | {} ({:.2}%)\n",
            row.display_name,
            short_date(row.joined_at),
            row.shares,
            percent
        ));
    }

    format!(
        "Reward Allocation: {}\nTotal Shares: {}\n\n{}",
        board.allocation,
        board.total_shares,
        table.trim_end()
    )
}

/// Active-bounty listing with seats and time left
pub fn bounty_list(bounties: &[BountyListing]) -> String {
    if bounties.is_empty() {
        return "There are no active bounties at this time.".to_string();
    }

    let mut table = String::from("Active bounties\n\n");
    for bounty in bounties {
        let availability = if bounty.seats_left > 0 {
            format!("{}/{}", bounty.seats_left, bounty.capacity)
        } else {
            "Full!".to_string()
        };

        table.push_str(&format!(
            "{}: {}\n    {} | {}\n",
            bounty.id,
            bounty.name,
            availability,
            display_time(bounty.ends_in)
        ));
    }

    table.push_str("\nJoin a bounty with `onthejob [id]`");
    table
}

/// Recent-activity table for one user
pub fn activity_log(target_name: &str, rows: &[ActivityRow]) -> String {
    if rows.is_empty() {
        return "No logs for this user".to_string();
    }

    let labels: Vec<String> = rows
        .iter()
        .map(|r| match r.subject {
            Some(bounty) => format!("{} (bounty {})", r.action, bounty),
            None => r.action.to_string(),
        })
        .collect();

    let from_width = rows
        .iter()
        .map(|r| r.from_name.len())
        .max()
        .unwrap_or(4)
        .max(4);
    let action_width = labels.iter().map(String::len).max().unwrap_or(3).max(3);
    let amount_width = rows
        .iter()
        .map(|r| r.amount.to_string().len())
        .max()
        .unwrap_or(1)
        .max(1);

    let header = format!(
        "{:<from_width$} | {:<action_width$} | {:<amount_width$} | Time",
        "From", "Act", "$"
    );
    let mut table = format!("{}\n{}\n", header, "=".repeat(header.len() + 8));

    for (row, label) in rows.iter().zip(&labels) {
        table.push_str(&format!(
            "{:<from_width$} | {:<action_width$} | {:<amount_width$} | {}\n",
            row.from_name,
            label,
            row.amount,
            short_datetime(row.at)
        ));
    }

    format!(
        "Last {} for {}\n\n{}",
        pluralize(rows.len() as i64, "update"),
        target_name,
        table.trim_end()
    )
}

/// Settings table, fallbacks overlaid with stored overrides
pub fn settings_table(settings: &[(String, String)]) -> String {
    let key_width = settings
        .iter()
        .map(|(k, _)| k.len())
        .max()
        .unwrap_or(7)
        .max(7);

    let header = format!("{:<key_width$} | Value", "Setting");
    let mut table = format!("{}\n{}\n", header, "=".repeat(header.len()));

    for (key, value) in settings {
        let shown = if value.len() > 20 {
            format!("{}...", &value[..17])
        } else {
            value.clone()
        };
        table.push_str(&format!("{:<key_width$} | {}\n", key, shown));
    }

    format!("Current Runtime Configuration\n\n{}", table.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BountyId, LeaderboardRow};

    #[test]
    fn test_display_time_two_units() {
        assert_eq!(display_time(0), "0 sec");
        assert_eq!(display_time(1), "1 sec");
        assert_eq!(display_time(61), "1 min, 1 sec");
        assert_eq!(display_time(3_600), "1 hr");
        assert_eq!(display_time(90_061), "1 day, 1 hr");
        assert_eq!(display_time(1_209_600), "2 wks");
        assert_eq!(display_time(-5), "0 sec");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(1, "share"), "1 share");
        assert_eq!(pluralize(0, "share"), "0 shares");
        assert_eq!(pluralize(5, "spot"), "5 spots");
    }

    #[test]
    fn test_leaderboard_percentages() {
        let board = Leaderboard {
            rows: vec![
                LeaderboardRow {
                    display_name: "alice".to_string(),
                    shares: 15,
                    joined_at: 1_700_000_000,
                },
                LeaderboardRow {
                    display_name: "bo".to_string(),
                    shares: 5,
                    joined_at: 1_700_000_000,
                },
            ],
            total_shares: 20,
            allocation: "$100".to_string(),
        };

        let text = leaderboard(&board);
        assert!(text.contains("Total Shares: 20"));
        assert!(text.contains("15 (75.00%)"));
        assert!(text.contains("5 (25.00%)"));
    }

    #[test]
    fn test_bounty_list_marks_full() {
        let listing = vec![BountyListing {
            id: BountyId::new(3),
            name: "alley".to_string(),
            seats_left: 0,
            capacity: 2,
            ends_in: 600,
        }];

        let text = bounty_list(&listing);
        assert!(text.contains("Full!"));
        assert!(text.contains("10 mins"));
    }

    #[test]
    fn test_empty_views() {
        let board = Leaderboard {
            rows: vec![],
            total_shares: 0,
            allocation: String::new(),
        };
        assert!(leaderboard(&board).contains("no registered users"));
        assert!(bounty_list(&[]).contains("no active bounties"));
        assert!(activity_log("alice", &[]).contains("No logs"));
    }
}
