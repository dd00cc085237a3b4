//! Bounty ledger server binary
//!
//! The chat transport is an external collaborator; until one is attached,
//! this binary drives the engine through a local console loop speaking the
//! same intents the transport would deliver:
//!
//! ```text
//! register
//! addbounty "Clean Alley" 2 10
//! as 7 alice register
//! as 7 alice onthejob Clean Alley
//! grant @alice 5
//! ```
//!
//! `as <id> <name> [admin]` switches the acting identity for one line;
//! tokens starting with `@` become the mention target.

use anyhow::Result;
use bounty_ledger::{spawn_ledger_actor, ActorInfo, Config, Intent, Ledger, Mention};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting bounty ledger server");

    // Load configuration
    let config = Config::from_env()?;
    if config.transport_token.is_none() {
        tracing::warn!("BOUNTY_TRANSPORT_TOKEN not set; chat transport disabled");
    }

    // Open ledger and hand it to the single-writer actor
    let ledger = Ledger::open(config)?;
    let handle = spawn_ledger_actor(ledger);
    tracing::info!("Ledger opened successfully");

    println!("bounty-ledger console; `as <id> <name> [admin]` switches identity, `quit` exits");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        let Some(intent) = parse_line(line) else {
            println!("! could not parse that line");
            continue;
        };

        match handle.dispatch(intent).await {
            Ok(reply) if reply.is_ok() => println!("{}", reply.message),
            Ok(reply) => println!("! {}", reply.message),
            Err(e) => {
                tracing::error!(error = %e, "Dispatch failed");
                break;
            }
        }
    }

    handle.shutdown().await?;
    tracing::info!("Shutting down bounty ledger server");
    Ok(())
}

/// Default console identity: a registered-on-first-use admin operator
const OPERATOR: (i64, &str) = (0, "operator");

/// Turn one console line into an intent
fn parse_line(line: &str) -> Option<Intent> {
    let mut tokens = split_quoted(line);
    if tokens.is_empty() {
        return None;
    }

    let actor = if tokens[0] == "as" {
        if tokens.len() < 4 {
            return None;
        }
        let id = tokens[1].parse().ok()?;
        let display_name = tokens[2].clone();
        let admin = tokens.get(3).map(String::as_str) == Some("admin");
        tokens.drain(..if admin { 4 } else { 3 });
        ActorInfo {
            id,
            display_name,
            admin_hint: admin,
        }
    } else {
        ActorInfo {
            id: OPERATOR.0,
            display_name: OPERATOR.1.to_string(),
            admin_hint: true,
        }
    };

    if tokens.is_empty() {
        return None;
    }
    let command = tokens.remove(0);

    let mut mention = None;
    let mut args = Vec::new();
    for token in tokens {
        match token.strip_prefix('@') {
            Some(name) if mention.is_none() => mention = Some(Mention::Name(name.to_string())),
            _ => args.push(token),
        }
    }

    Some(Intent {
        command,
        actor,
        args,
        mention,
    })
}

/// Whitespace splitter honoring double quotes
fn split_quoted(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}
