use async_trait::async_trait;
use chrono::{DateTime, Months, Utc};

use crate::domain::order::{ClientSummary, Order};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("Order already stored: {0}")]
    DuplicateOrder(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Published after an order has been stored.
#[derive(Debug, Clone)]
pub struct OrderSaved {
    pub order: Order,
    pub saved_at: DateTime<Utc>,
}

/// Durable home for finalized orders.
///
/// Implementations announce every successful `save` as an [`OrderSaved`]
/// notification; delivery concerns (upload, printing) hang off that, never
/// off the session.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn save(&self, order: Order) -> Result<(), RepositoryError>;

    async fn get(&self, order_id: &str) -> Result<Option<Order>, RepositoryError>;

    /// All orders, newest first
    async fn list(&self) -> Result<Vec<Order>, RepositoryError>;
}

/// Read access to client records
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    async fn find_client(&self, client_id: &str) -> Result<Option<ClientSummary>, RepositoryError>;
}

/// Orders dated within the last `months` months of `now`, optionally
/// narrowed by a case-insensitive client name/code search, newest first.
pub fn filter_recent(orders: &[Order], now: DateTime<Utc>, months: u32, search: Option<&str>) -> Vec<Order> {
    let cutoff = now
        .checked_sub_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut recent: Vec<Order> = orders
        .iter()
        .filter(|order| order.date >= cutoff)
        .filter(|order| match &needle {
            Some(needle) => {
                order.client_name.to_lowercase().contains(needle.as_str())
                    || order.client_code.to_lowercase().contains(needle.as_str())
            }
            None => true,
        })
        .cloned()
        .collect();

    recent.sort_by(|a, b| b.date.cmp(&a.date));
    recent
}
