use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

use super::repository::{filter_recent, ClientDirectory, OrderRepository, OrderSaved, RepositoryError};
use crate::domain::order::{ClientSummary, Order};

const NOTIFICATION_CAPACITY: usize = 64;

// ============================================================================
// In-Memory Order Repository
// ============================================================================

pub struct InMemoryOrderRepository {
    orders: RwLock<Vec<Order>>,
    notifications: broadcast::Sender<OrderSaved>,
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            orders: RwLock::new(Vec::new()),
            notifications,
        }
    }

    /// Receive an [`OrderSaved`] for every order stored from now on
    pub fn subscribe(&self) -> broadcast::Receiver<OrderSaved> {
        self.notifications.subscribe()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }

    pub async fn recent_orders(&self, now: DateTime<Utc>, months: u32, search: Option<&str>) -> Vec<Order> {
        let orders = self.orders.read().await;
        filter_recent(&orders, now, months, search)
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: Order) -> Result<(), RepositoryError> {
        {
            let mut orders = self.orders.write().await;
            if orders.iter().any(|existing| existing.id == order.id) {
                return Err(RepositoryError::DuplicateOrder(order.id));
            }
            orders.insert(0, order.clone());
        }

        tracing::info!(
            order_id = %order.id,
            client_code = %order.client_code,
            items = order.items.len(),
            "✅ Order stored"
        );

        // No subscribers is fine; nobody is waiting for uploads.
        let _ = self.notifications.send(OrderSaved {
            order,
            saved_at: Utc::now(),
        });

        Ok(())
    }

    async fn get(&self, order_id: &str) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.iter().find(|order| order.id == order_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        Ok(self.orders.read().await.clone())
    }
}

// ============================================================================
// In-Memory Client Directory
// ============================================================================

#[derive(Default)]
pub struct InMemoryClientDirectory {
    clients: RwLock<HashMap<String, ClientSummary>>,
}

impl InMemoryClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clients(clients: impl IntoIterator<Item = ClientSummary>) -> Self {
        let clients = clients
            .into_iter()
            .map(|client| (client.id.clone(), client))
            .collect();
        Self {
            clients: RwLock::new(clients),
        }
    }

    pub async fn insert(&self, client: ClientSummary) {
        self.clients.write().await.insert(client.id.clone(), client);
    }
}

#[async_trait]
impl ClientDirectory for InMemoryClientDirectory {
    async fn find_client(&self, client_id: &str) -> Result<Option<ClientSummary>, RepositoryError> {
        Ok(self.clients.read().await.get(client_id).cloned())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::domain::order::WorkerRef;

    fn order(id: &str, client_name: &str, client_code: &str, date: DateTime<Utc>) -> Order {
        Order {
            id: id.to_string(),
            client_id: format!("id-{client_code}"),
            client_name: client_name.to_string(),
            client_code: client_code.to_string(),
            date,
            items: vec![],
            notes: String::new(),
            signature: "firma".to_string(),
            worker: WorkerRef {
                id: "w1".to_string(),
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let repo = InMemoryOrderRepository::new();
        let now = Utc::now();

        repo.save(order("o-1", "Sol", "C1", now)).await.unwrap();
        repo.save(order("o-2", "Luna", "C2", now)).await.unwrap();

        assert_eq!(repo.len().await, 2);
        assert_eq!(repo.get("o-1").await.unwrap().unwrap().client_name, "Sol");
        assert!(repo.get("missing").await.unwrap().is_none());

        // Newest insert first
        let ids: Vec<String> = repo.list().await.unwrap().into_iter().map(|o| o.id).collect();
        assert_eq!(ids, vec!["o-2", "o-1"]);
    }

    #[tokio::test]
    async fn test_duplicate_order_is_rejected() {
        let repo = InMemoryOrderRepository::new();
        let now = Utc::now();

        repo.save(order("o-1", "Sol", "C1", now)).await.unwrap();
        let result = repo.save(order("o-1", "Sol", "C1", now)).await;

        assert_eq!(result, Err(RepositoryError::DuplicateOrder("o-1".to_string())));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_save_notifies_subscribers() {
        let repo = InMemoryOrderRepository::new();
        let mut rx = repo.subscribe();

        repo.save(order("o-1", "Sol", "C1", Utc::now())).await.unwrap();

        let saved = rx.recv().await.unwrap();
        assert_eq!(saved.order.id, "o-1");
    }

    #[tokio::test]
    async fn test_recent_orders_window_and_search() {
        let repo = InMemoryOrderRepository::new();
        let now = Utc::now();

        repo.save(order("old", "Sol", "C1", now - Duration::days(200))).await.unwrap();
        repo.save(order("a", "Joyería Sol", "C1", now - Duration::days(10))).await.unwrap();
        repo.save(order("b", "Luna", "C2", now - Duration::days(1))).await.unwrap();

        let recent = repo.recent_orders(now, 3, None).await;
        let ids: Vec<&str> = recent.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);

        let by_name = repo.recent_orders(now, 3, Some("SOL")).await;
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id, "a");

        let by_code = repo.recent_orders(now, 3, Some("c2")).await;
        assert_eq!(by_code[0].id, "b");

        let blank = repo.recent_orders(now, 3, Some("  ")).await;
        assert_eq!(blank.len(), 2);
    }

    #[tokio::test]
    async fn test_client_directory() {
        let directory = InMemoryClientDirectory::with_clients([ClientSummary {
            id: "c1".to_string(),
            name: "Sol".to_string(),
            client_code: "C1".to_string(),
        }]);

        assert!(directory.find_client("c1").await.unwrap().is_some());
        assert!(directory.find_client("c2").await.unwrap().is_none());

        directory
            .insert(ClientSummary {
                id: "c2".to_string(),
                name: "Luna".to_string(),
                client_code: "C2".to_string(),
            })
            .await;
        assert!(directory.find_client("c2").await.unwrap().is_some());
    }
}
