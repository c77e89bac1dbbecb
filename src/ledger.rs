use crate::{
    error::LedgerError,
    events::LedgerEvent,
    session::SessionKey,
};
use chrono::{
    DateTime,
    Utc,
};
use fuels::types::{
    Identity,
    U256,
};
use serde::{
    Deserialize,
    Serialize,
};
use tokio::sync::mpsc;

pub mod in_memory_ledger;

pub use in_memory_ledger::InMemoryLedger;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSouls {
    pub confirmed: u64,
    /// Session point total for the confirmed souls.
    pub confirmed_points: u64,
    pub pending_batch: u32,
    pub last_collection: Option<DateTime<Utc>>,
}

/// Remote, authoritative game state.
pub trait SoulLedger {
    fn session_souls(
        &self,
        key: &SessionKey,
    ) -> impl Future<Output = Result<SessionSouls, LedgerError>>;

    /// Atomically records `count` souls and returns the points awarded.
    fn batch_submit(
        &self,
        key: &SessionKey,
        count: u32,
    ) -> impl Future<Output = Result<u64, LedgerError>>;

    /// Drains any batch the ledger still holds for the session.
    fn force_flush(&self, key: &SessionKey) -> impl Future<Output = Result<(), LedgerError>>;

    fn achievement_flags(
        &self,
        player: &Identity,
    ) -> impl Future<Output = Result<U256, LedgerError>>;
}

pub trait EventSource {
    fn next_event(&mut self) -> impl Future<Output = Result<LedgerEvent, LedgerError>>;

    /// Returns an already delivered event without waiting.
    fn try_next_event(&mut self) -> Option<LedgerEvent>;
}

pub struct ChannelEventSource {
    recv: mpsc::UnboundedReceiver<LedgerEvent>,
}

impl ChannelEventSource {
    pub fn new_with_sender() -> (Self, mpsc::UnboundedSender<LedgerEvent>) {
        let (send, recv) = mpsc::unbounded_channel();
        (ChannelEventSource { recv }, send)
    }
}

impl EventSource for ChannelEventSource {
    async fn next_event(&mut self) -> Result<LedgerEvent, LedgerError> {
        self.recv.recv().await.ok_or(LedgerError::StreamClosed)
    }

    fn try_next_event(&mut self) -> Option<LedgerEvent> {
        self.recv.try_recv().ok()
    }
}
