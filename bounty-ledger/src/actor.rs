//! Single-writer actor for the ledger
//!
//! One tokio task exclusively owns the [`Ledger`]; every intent travels
//! through its mailbox and is processed fully before the next one starts.
//! That serialization is the whole concurrency story: no locks, no
//! preemption mid-transaction, and every intent's effect is visible to the
//! next one.
//!
//! The transport side holds a cheap, cloneable [`LedgerHandle`].

use crate::{
    intent::{Intent, Reply},
    Error, Ledger, Result,
};
use tokio::sync::{mpsc, oneshot};

/// Mailbox depth; excess senders wait, providing backpressure
const MAILBOX_CAPACITY: usize = 256;

/// Message sent to the ledger actor
pub enum LedgerMessage {
    /// Process one intent
    Intent {
        /// The parsed command
        intent: Intent,
        /// Channel for the reply
        response: oneshot::Sender<Reply>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger messages
pub struct LedgerActor {
    /// Exclusively owned engine state
    ledger: Ledger,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(ledger: Ledger, mailbox: mpsc::Receiver<LedgerMessage>) -> Self {
        Self { ledger, mailbox }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Intent { intent, response } => {
                    let reply = self.ledger.handle_intent(&intent);
                    let _ = response.send(reply);
                }
                LedgerMessage::Shutdown => break,
            }
        }

        tracing::info!("Ledger actor stopped");
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    /// Process an intent and await its reply
    pub async fn dispatch(&self, intent: Intent) -> Result<Reply> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Intent {
                intent,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor, taking exclusive ownership of the ledger
pub fn spawn_ledger_actor(ledger: Ledger) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    let actor = LedgerActor::new(ledger, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
