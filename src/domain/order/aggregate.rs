use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::event_sourcing::core::Aggregate;
use super::value_objects::{Order, OrderItem, SessionPhase};
use super::events::*;
use super::commands::SessionCommand;
use super::errors::{OrderError, ValidationError};

// ============================================================================
// Order Session Aggregate
// ============================================================================
//
// Building ──request_signature──▶ AwaitingSignature ──finalize──▶ Finalized
//    ▲                                   │
//    └───────────abort_signing───────────┘
//
// Finalized is terminal: every command is rejected with AlreadyFinalized.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSession {
    // Identity
    pub id: Uuid,
    pub version: i64,

    // Current State (derived from events)
    pub phase: SessionPhase,
    pub items: Vec<OrderItem>,
    pub selected_client_id: Option<String>,
    pub notes: String,
    pub signature: Option<String>,

    // Audit Trail
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Set once the session has produced its order
    pub finalized_order_id: Option<String>,
}

impl OrderSession {
    /// Open a new session, returning the `Started` event that created it.
    pub fn start(preselected_client_id: Option<String>) -> (Self, SessionEvent) {
        let started = SessionStarted {
            session_id: Uuid::now_v7(),
            preselected_client_id: preselected_client_id.filter(|id| !id.trim().is_empty()),
            started_at: Utc::now(),
        };

        (Self::from_started(&started), SessionEvent::Started(started))
    }

    fn from_started(e: &SessionStarted) -> Self {
        Self {
            id: e.session_id,
            version: 1,
            phase: SessionPhase::Building,
            items: Vec::new(),
            selected_client_id: e.preselected_client_id.clone(),
            notes: String::new(),
            signature: None,
            created_at: e.started_at,
            updated_at: e.started_at,
            finalized_order_id: None,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.phase == SessionPhase::Finalized
    }

    pub fn item(&self, item_id: &str) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    fn ensure_building(&self) -> Result<(), OrderError> {
        match self.phase {
            SessionPhase::Building => Ok(()),
            SessionPhase::Finalized => Err(OrderError::AlreadyFinalized),
            other => Err(OrderError::InvalidPhase(other)),
        }
    }

    /// Everything required before the client may sign
    fn validate_ready_for_signature(&self) -> Result<&str, ValidationError> {
        let client_id = self
            .selected_client_id
            .as_deref()
            .ok_or(ValidationError::MissingClient)?;

        if self.items.is_empty() {
            return Err(ValidationError::EmptyItems);
        }

        Ok(client_id)
    }

    fn validate_items(items: &[OrderItem]) -> Result<(), ValidationError> {
        if items.iter().any(|item| item.code.trim().is_empty()) {
            return Err(ValidationError::MissingCode);
        }
        Ok(())
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for OrderSession {
    type Event = SessionEvent;
    type Command = SessionCommand;
    type Error = OrderError;

    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            SessionEvent::Started(e) => Ok(Self::from_started(e)),
            _ => Err(OrderError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        self.updated_at = Utc::now();
        self.version += 1;

        match event {
            SessionEvent::Started(_) => {
                // First event already applied
            }
            SessionEvent::ItemsAdded(e) => {
                self.items.extend(e.items.iter().cloned());
            }
            SessionEvent::ItemRemoved(e) => {
                self.items.retain(|item| item.id != e.item_id);
            }
            SessionEvent::ClientSelected(e) => {
                self.selected_client_id = Some(e.client_id.clone());
            }
            SessionEvent::NotesUpdated(e) => {
                self.notes = e.notes.clone();
            }
            SessionEvent::SignatureRequested(_) => {
                self.phase = SessionPhase::AwaitingSignature;
            }
            SessionEvent::SigningAborted(_) => {
                self.phase = SessionPhase::Building;
                self.signature = None;
            }
            SessionEvent::Signed(e) => {
                self.signature = e.signature.clone();
            }
            SessionEvent::Finalized(e) => {
                self.phase = SessionPhase::Finalized;
                self.finalized_order_id = Some(e.order.id.clone());
            }
        }

        Ok(())
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if self.is_finalized() {
            return Err(OrderError::AlreadyFinalized);
        }

        match command {
            SessionCommand::AddItems { items } => {
                self.ensure_building()?;
                Self::validate_items(items)?;

                if items.is_empty() {
                    return Ok(vec![]);
                }

                Ok(vec![SessionEvent::ItemsAdded(ItemsAdded {
                    items: items.clone(),
                })])
            }

            SessionCommand::RemoveItem { item_id } => {
                self.ensure_building()?;

                if self.item(item_id).is_none() {
                    return Err(OrderError::ItemNotFound(item_id.clone()));
                }

                Ok(vec![SessionEvent::ItemRemoved(ItemRemoved {
                    item_id: item_id.clone(),
                })])
            }

            SessionCommand::SelectClient { client_id } => {
                self.ensure_building()?;

                let client_id = client_id.trim();
                if client_id.is_empty() {
                    return Err(ValidationError::MissingClient.into());
                }

                if self.selected_client_id.as_deref() == Some(client_id) {
                    return Ok(vec![]);
                }

                Ok(vec![SessionEvent::ClientSelected(ClientSelected {
                    client_id: client_id.to_string(),
                })])
            }

            SessionCommand::SetNotes { notes } => {
                self.ensure_building()?;

                if *notes == self.notes {
                    return Ok(vec![]);
                }

                Ok(vec![SessionEvent::NotesUpdated(NotesUpdated {
                    notes: notes.clone(),
                })])
            }

            SessionCommand::RequestSignature => {
                self.ensure_building()?;
                self.validate_ready_for_signature()?;

                Ok(vec![SessionEvent::SignatureRequested(SignatureRequested {
                    requested_at: Utc::now(),
                })])
            }

            SessionCommand::AbortSigning => {
                match self.phase {
                    SessionPhase::AwaitingSignature => {}
                    other => return Err(OrderError::InvalidPhase(other)),
                }

                Ok(vec![SessionEvent::SigningAborted(SigningAborted)])
            }

            SessionCommand::Sign { signature } => {
                match self.phase {
                    SessionPhase::AwaitingSignature => {}
                    other => return Err(OrderError::InvalidPhase(other)),
                }

                let signature = Some(signature.trim())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);

                Ok(vec![SessionEvent::Signed(Signed { signature })])
            }

            SessionCommand::Finalize { order_id, client, worker, finalized_at } => {
                // Finalizing straight from Building still reports what is
                // missing instead of a bare phase error.
                let client_id = self.validate_ready_for_signature()?;

                let signature = match (self.phase, self.signature.as_deref()) {
                    (SessionPhase::AwaitingSignature, Some(signature)) => signature,
                    _ => return Err(ValidationError::MissingSignature.into()),
                };

                if client.id != client_id {
                    return Err(ValidationError::ClientMismatch {
                        selected: client_id.to_string(),
                        resolved: client.id.clone(),
                    }
                    .into());
                }

                let order = Order {
                    id: order_id.clone(),
                    client_id: client.id.clone(),
                    client_name: client.name.clone(),
                    client_code: client.client_code.clone(),
                    date: *finalized_at,
                    items: self.items.clone(),
                    notes: self.notes.clone(),
                    signature: signature.to_string(),
                    worker: worker.clone(),
                };

                Ok(vec![SessionEvent::Finalized(OrderFinalized { order })])
            }
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
