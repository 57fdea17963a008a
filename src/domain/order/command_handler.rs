use std::sync::Arc;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::analysis::ImageAnalyzer;
use crate::event_sourcing::core::{Aggregate, EventEnvelope};
use crate::metrics::Metrics;
use crate::persistence::{ClientDirectory, OrderRepository};
use crate::utils::{retry_on_transient, RetryConfig};

use super::aggregate::OrderSession;
use super::classifier::classify_batch;
use super::commands::SessionCommand;
use super::errors::{OrderError, ValidationError};
use super::events::SessionEvent;
use super::value_objects::{ClientSummary, Order, OrderItem, RawTagReading, WorkerRef};

// ============================================================================
// Order Session Handler
// ============================================================================
//
// Orchestrates: Command → OrderSession → Events → history
//
// The session sits behind a mutex so transitions are serialized. The only
// slow call, image analysis, runs without the lock and its items are added
// in one command afterwards, so a failed analysis adds nothing.
//
// ============================================================================

/// Collaborators shared by every session
pub struct OrderServices {
    pub analyzer: Arc<dyn ImageAnalyzer>,
    pub directory: Arc<dyn ClientDirectory>,
    pub repository: Arc<dyn OrderRepository>,
    pub metrics: Arc<Metrics>,
    pub retry: RetryConfig,
}

struct SessionState {
    session: OrderSession,
    history: Vec<EventEnvelope<SessionEvent>>,
}

impl SessionState {
    fn record(&mut self, events: Vec<SessionEvent>, actor: Option<&str>) {
        for event in events {
            let seq = self.history.len() as i64 + 1;
            let envelope = EventEnvelope::new(self.session.id, seq, event.name(), event);
            self.history.push(match actor {
                Some(actor) => envelope.with_actor(actor),
                None => envelope,
            });
        }
    }
}

pub struct OrderSessionHandler {
    services: Arc<OrderServices>,
    state: Mutex<SessionState>,
}

impl OrderSessionHandler {
    /// Open a session, optionally with a client already chosen
    pub fn start(services: Arc<OrderServices>, preselected_client_id: Option<String>) -> Self {
        let (session, started) = OrderSession::start(preselected_client_id);

        tracing::info!(
            session_id = %session.id,
            preselected_client = ?session.selected_client_id,
            "🧾 Order session started"
        );

        let mut state = SessionState {
            session,
            history: Vec::new(),
        };
        state.record(vec![started], None);

        Self {
            services,
            state: Mutex::new(state),
        }
    }

    async fn dispatch(&self, command: SessionCommand) -> Result<Vec<SessionEvent>, OrderError> {
        let mut state = self.state.lock().await;
        let events = state.session.execute(&command)?;

        tracing::debug!(
            session_id = %state.session.id,
            command = command.name(),
            events = events.len(),
            "Command applied"
        );

        state.record(events.clone(), None);
        Ok(events)
    }

    /// Analyze one photo and add every tag found on it.
    pub async fn add_photo(&self, image: &[u8], mime_type: &str) -> Result<Vec<OrderItem>, OrderError> {
        // Fail fast rather than paying for an analysis that cannot be used
        {
            let state = self.state.lock().await;
            if state.session.is_finalized() {
                return Err(OrderError::AlreadyFinalized);
            }
        }

        let analyzer = &self.services.analyzer;
        let metrics = &self.services.metrics;

        let readings = retry_on_transient("analyze_photo", &self.services.retry, |attempt| {
            metrics.analysis_attempts.inc();
            tracing::debug!(attempt = attempt, bytes = image.len(), "Analyzing photo");
            async move { analyzer.analyze(image, mime_type).await }
        })
        .await
        .into_result()
        .map_err(|e| {
            metrics.analysis_failures.with_label_values(&[e.reason()]).inc();
            tracing::warn!(error = %e, "❌ Photo analysis failed, no items added");
            OrderError::AnalysisFailure(e)
        })?;

        self.add_readings(&readings).await
    }

    /// Classify readings obtained elsewhere and add them
    pub async fn add_readings(&self, readings: &[RawTagReading]) -> Result<Vec<OrderItem>, OrderError> {
        let items = classify_batch(readings);
        self.dispatch(SessionCommand::AddItems { items: items.clone() }).await?;
        self.services.metrics.record_classified(&items, readings.len());

        tracing::info!(
            readings = readings.len(),
            added = items.len(),
            "Items added from tag readings"
        );

        Ok(items)
    }

    pub async fn remove_item(&self, item_id: &str) -> Result<(), OrderError> {
        self.dispatch(SessionCommand::RemoveItem {
            item_id: item_id.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Choose the client, who must exist in the directory
    pub async fn select_client(&self, client_id: &str) -> Result<ClientSummary, OrderError> {
        let client = self.resolve_client(client_id).await?;
        self.dispatch(SessionCommand::SelectClient {
            client_id: client.id.clone(),
        })
        .await?;
        Ok(client)
    }

    pub async fn set_notes(&self, notes: &str) -> Result<(), OrderError> {
        self.dispatch(SessionCommand::SetNotes {
            notes: notes.to_string(),
        })
        .await?;
        Ok(())
    }

    pub async fn request_signature(&self) -> Result<(), OrderError> {
        self.dispatch(SessionCommand::RequestSignature).await?;
        Ok(())
    }

    pub async fn abort_signing(&self) -> Result<(), OrderError> {
        self.dispatch(SessionCommand::AbortSigning).await?;
        Ok(())
    }

    pub async fn sign(&self, signature: &str) -> Result<(), OrderError> {
        self.dispatch(SessionCommand::Sign {
            signature: signature.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Produce the order, store it, and close the session.
    ///
    /// The lock is held from validation to the final transition, so two
    /// concurrent calls cannot both store an order. If the repository
    /// rejects the order the session stays awaiting signature.
    pub async fn finalize(&self, worker: WorkerRef) -> Result<Order, OrderError> {
        let mut state = self.state.lock().await;

        if state.session.is_finalized() {
            return Err(OrderError::AlreadyFinalized);
        }

        let client = match state.session.selected_client_id.as_deref() {
            Some(client_id) => self.resolve_client(client_id).await?,
            None => return Err(ValidationError::MissingClient.into()),
        };

        let command = SessionCommand::Finalize {
            order_id: new_order_id(),
            client,
            worker,
            finalized_at: Utc::now(),
        };

        let events = state.session.handle_command(&command)?;
        let order = events
            .iter()
            .find_map(|event| match event {
                SessionEvent::Finalized(e) => Some(e.order.clone()),
                _ => None,
            })
            .ok_or(OrderError::NotInitialized)?;

        self.services.repository.save(order.clone()).await?;

        for event in &events {
            state.session.apply_event(event)?;
        }
        state.record(events, Some(order.worker.id.as_str()));
        self.services.metrics.record_finalized(&order);

        tracing::info!(
            session_id = %state.session.id,
            order_id = %order.id,
            client_code = %order.client_code,
            items = order.total_items(),
            "✅ Order finalized"
        );

        Ok(order)
    }

    /// Current session state
    pub async fn snapshot(&self) -> OrderSession {
        self.state.lock().await.session.clone()
    }

    /// Every event the session has recorded, in order
    pub async fn history(&self) -> Vec<EventEnvelope<SessionEvent>> {
        self.state.lock().await.history.clone()
    }

    async fn resolve_client(&self, client_id: &str) -> Result<ClientSummary, OrderError> {
        let client_id = client_id.trim();
        if client_id.is_empty() {
            return Err(ValidationError::MissingClient.into());
        }

        self.services
            .directory
            .find_client(client_id)
            .await?
            .ok_or_else(|| ValidationError::UnknownClient(client_id.to_string()).into())
    }
}

fn new_order_id() -> String {
    format!("order-{}", Uuid::now_v7().simple())
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use async_trait::async_trait;

    use crate::analysis::AnalysisError;
    use crate::domain::order::{Material, SessionPhase};
    use crate::persistence::{InMemoryClientDirectory, InMemoryOrderRepository, RepositoryError};

    /// Fails with a transient error `failures` times, then succeeds
    struct FlakyAnalyzer {
        failures: u32,
        calls: AtomicU32,
        readings: Vec<RawTagReading>,
    }

    #[async_trait]
    impl ImageAnalyzer for FlakyAnalyzer {
        async fn analyze(&self, _image: &[u8], _mime_type: &str) -> Result<Vec<RawTagReading>, AnalysisError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(AnalysisError::Transport("connection reset".to_string()));
            }
            Ok(self.readings.clone())
        }
    }

    struct Fixture {
        handler: OrderSessionHandler,
        repository: Arc<InMemoryOrderRepository>,
        metrics: Arc<Metrics>,
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            multiplier: 1.0,
        }
    }

    fn readings() -> Vec<RawTagReading> {
        vec![
            RawTagReading::new("3001-1", Some(25.0), None),
            RawTagReading { code: None, price: Some(1.0), tag_color: None },
            RawTagReading::new("1102", None, Some("naranja")),
        ]
    }

    fn client() -> ClientSummary {
        ClientSummary {
            id: "client-1".to_string(),
            name: "Joyería Sol".to_string(),
            client_code: "C-001".to_string(),
        }
    }

    fn worker() -> WorkerRef {
        WorkerRef {
            id: "worker-1".to_string(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
        }
    }

    fn fixture(failures: u32, preselected: Option<&str>) -> Fixture {
        let repository = Arc::new(InMemoryOrderRepository::new());
        let metrics = Arc::new(Metrics::new().unwrap());
        let services = Arc::new(OrderServices {
            analyzer: Arc::new(FlakyAnalyzer {
                failures,
                calls: AtomicU32::new(0),
                readings: readings(),
            }),
            directory: Arc::new(InMemoryClientDirectory::with_clients([client()])),
            repository: repository.clone(),
            metrics: metrics.clone(),
            retry: fast_retry(),
        });

        Fixture {
            handler: OrderSessionHandler::start(services, preselected.map(str::to_string)),
            repository,
            metrics,
        }
    }

    async fn signed_fixture() -> Fixture {
        let f = fixture(0, Some("client-1"));
        f.handler.add_photo(b"jpeg", "image/jpeg").await.unwrap();
        f.handler.request_signature().await.unwrap();
        f.handler.sign("Marta").await.unwrap();
        f
    }

    #[tokio::test]
    async fn test_add_photo_classifies_and_adds_items() {
        let f = fixture(0, None);
        let items = f.handler.add_photo(b"jpeg", "image/jpeg").await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].category, "Pulseras de Oro");
        assert_eq!(items[1].material, Material::Acero);

        let session = f.handler.snapshot().await;
        assert_eq!(session.items, items);
        assert_eq!(f.metrics.classified_count(Material::Oro), 1);
        assert_eq!(f.metrics.readings_dropped.get(), 1);
        assert_eq!(f.metrics.analysis_attempts.get(), 1);
    }

    #[tokio::test]
    async fn test_transient_analysis_failure_is_retried() {
        let f = fixture(2, None);
        let items = f.handler.add_photo(b"jpeg", "image/jpeg").await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(f.metrics.analysis_attempts.get(), 3);
    }

    #[tokio::test]
    async fn test_failed_analysis_adds_nothing() {
        let f = fixture(10, None);
        let result = f.handler.add_photo(b"jpeg", "image/jpeg").await;

        assert!(matches!(
            result.unwrap_err(),
            OrderError::AnalysisFailure(AnalysisError::Transport(_))
        ));
        assert!(f.handler.snapshot().await.items.is_empty());
        assert_eq!(f.metrics.analysis_attempts.get(), 3);
        assert_eq!(
            f.metrics.analysis_failures.with_label_values(&["transport"]).get(),
            1
        );
    }

    #[tokio::test]
    async fn test_unknown_client_is_rejected() {
        let f = fixture(0, None);
        let result = f.handler.select_client("nobody").await;

        assert!(matches!(
            result.unwrap_err(),
            OrderError::Validation(ValidationError::UnknownClient(_))
        ));
        assert_eq!(f.handler.snapshot().await.selected_client_id, None);
    }

    #[tokio::test]
    async fn test_finalize_without_client_stays_building() {
        let f = fixture(0, None);
        f.handler.add_photo(b"jpeg", "image/jpeg").await.unwrap();

        let result = f.handler.finalize(worker()).await;
        assert!(matches!(
            result.unwrap_err(),
            OrderError::Validation(ValidationError::MissingClient)
        ));
        assert_eq!(f.handler.snapshot().await.phase, SessionPhase::Building);
        assert!(f.repository.is_empty().await);
    }

    #[tokio::test]
    async fn test_finalize_stores_exactly_one_order() {
        let f = signed_fixture().await;

        let order = f.handler.finalize(worker()).await.unwrap();
        assert!(order.id.starts_with("order-"));
        assert_eq!(order.client_name, "Joyería Sol");
        assert_eq!(order.client_code, "C-001");
        assert_eq!(order.signature, "Marta");
        assert_eq!(order.items.len(), 2);

        let again = f.handler.finalize(worker()).await;
        assert!(matches!(again.unwrap_err(), OrderError::AlreadyFinalized));

        let later = f.handler.add_photo(b"jpeg", "image/jpeg").await;
        assert!(matches!(later.unwrap_err(), OrderError::AlreadyFinalized));

        assert_eq!(f.repository.len().await, 1);
        assert_eq!(f.metrics.orders_finalized.get(), 1);
        assert_eq!(f.handler.snapshot().await.phase, SessionPhase::Finalized);
    }

    #[tokio::test]
    async fn test_concurrent_finalize_stores_one_order() {
        let f = signed_fixture().await;

        let (a, b) = tokio::join!(f.handler.finalize(worker()), f.handler.finalize(worker()));
        assert!(a.is_ok() != b.is_ok());
        assert_eq!(f.repository.len().await, 1);
    }

    #[tokio::test]
    async fn test_history_records_every_transition() {
        let f = signed_fixture().await;
        f.handler.finalize(worker()).await.unwrap();

        let history = f.handler.history().await;
        let types: Vec<&str> = history.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(
            types,
            vec!["SessionStarted", "ItemsAdded", "SignatureRequested", "Signed", "OrderFinalized"]
        );

        let sequence: Vec<i64> = history.iter().map(|e| e.sequence_number).collect();
        assert_eq!(sequence, vec![1, 2, 3, 4, 5]);
        assert_eq!(history.last().unwrap().actor.as_deref(), Some("worker-1"));

        let restored = OrderSession::load_from_events(&history).unwrap();
        assert_eq!(restored.phase, SessionPhase::Finalized);
    }

    struct RejectingRepository;

    #[async_trait]
    impl OrderRepository for RejectingRepository {
        async fn save(&self, _order: Order) -> Result<(), RepositoryError> {
            Err(RepositoryError::Unavailable("disk full".to_string()))
        }

        async fn get(&self, _order_id: &str) -> Result<Option<Order>, RepositoryError> {
            Ok(None)
        }

        async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_session_open() {
        let services = Arc::new(OrderServices {
            analyzer: Arc::new(FlakyAnalyzer {
                failures: 0,
                calls: AtomicU32::new(0),
                readings: readings(),
            }),
            directory: Arc::new(InMemoryClientDirectory::with_clients([client()])),
            repository: Arc::new(RejectingRepository),
            metrics: Arc::new(Metrics::new().unwrap()),
            retry: fast_retry(),
        });
        let handler = OrderSessionHandler::start(services, Some("client-1".to_string()));
        handler.add_photo(b"jpeg", "image/jpeg").await.unwrap();
        handler.request_signature().await.unwrap();
        handler.sign("Marta").await.unwrap();

        let err = handler.finalize(worker()).await.unwrap_err();
        assert!(matches!(err, OrderError::Persistence(_)));
        assert!(err.is_retryable());
        assert_eq!(handler.snapshot().await.phase, SessionPhase::AwaitingSignature);
    }
}
