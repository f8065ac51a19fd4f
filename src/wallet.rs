use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{MzaniGoError, Result};
use crate::models::Ticket;
use crate::storage::{self, KeyValueStore};

pub const RECENTS_KEY: &str = "mzanigo_recent";
pub const TICKETS_KEY: &str = "mzanigo_tickets";
pub const MAX_RECENTS: usize = 5;

/// Most-recent-first, deduplicated, capped at [`MAX_RECENTS`]
pub fn push_recent(recents: &[String], destination: &str) -> Vec<String> {
    std::iter::once(destination)
        .chain(
            recents
                .iter()
                .map(String::as_str)
                .filter(|r| *r != destination),
        )
        .take(MAX_RECENTS)
        .map(str::to_string)
        .collect()
}

/// A user's recent destinations and booked tickets
pub struct Wallet {
    store: Arc<dyn KeyValueStore>,
    user_id: String,
    // serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl Wallet {
    pub fn new(store: Arc<dyn KeyValueStore>, user_id: String) -> Self {
        Self {
            store,
            user_id,
            write_lock: Mutex::new(()),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn key(&self, name: &str) -> String {
        format!("{}:{}", self.user_id, name)
    }

    pub async fn recents(&self) -> Result<Vec<String>> {
        Ok(storage::load(self.store.as_ref(), &self.key(RECENTS_KEY))
            .await?
            .unwrap_or_default())
    }

    pub async fn record_search(&self, destination: &str) -> Result<Vec<String>> {
        let _guard = self.write_lock.lock().await;
        let current = self.recents().await?;
        let updated = push_recent(&current, destination);
        storage::save(self.store.as_ref(), &self.key(RECENTS_KEY), &updated).await?;
        tracing::debug!("Recent destinations for {}: {:?}", self.user_id, updated);
        Ok(updated)
    }

    pub async fn clear_recents(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(&self.key(RECENTS_KEY)).await
    }

    /// Newest first
    pub async fn tickets(&self) -> Result<Vec<Ticket>> {
        Ok(storage::load(self.store.as_ref(), &self.key(TICKETS_KEY))
            .await?
            .unwrap_or_default())
    }

    pub async fn ticket(&self, id: &str) -> Result<Ticket> {
        self.tickets()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| MzaniGoError::NotFound(format!("Ticket {id} not found")))
    }

    /// Prepend a freshly issued ticket; existing tickets are never rewritten
    pub async fn add_ticket(&self, ticket: Ticket) -> Result<Vec<Ticket>> {
        let _guard = self.write_lock.lock().await;
        let mut tickets = self.tickets().await?;
        tracing::info!(
            "Adding ticket {} for route {} to wallet of {}",
            ticket.id,
            ticket.route_id,
            self.user_id
        );
        tickets.insert(0, ticket);
        storage::save(self.store.as_ref(), &self.key(TICKETS_KEY), &tickets).await?;
        Ok(tickets)
    }
}
