use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::event_sourcing::core::DomainEvent;
use super::value_objects::{Order, OrderItem};

// ============================================================================
// Order Session Events
// ============================================================================

/// Session Event - Union type for everything that can happen to a session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionEvent {
    Started(SessionStarted),
    ItemsAdded(ItemsAdded),
    ItemRemoved(ItemRemoved),
    ClientSelected(ClientSelected),
    NotesUpdated(NotesUpdated),
    SignatureRequested(SignatureRequested),
    SigningAborted(SigningAborted),
    Signed(Signed),
    Finalized(OrderFinalized),
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Started(_) => SessionStarted::event_type(),
            SessionEvent::ItemsAdded(_) => ItemsAdded::event_type(),
            SessionEvent::ItemRemoved(_) => ItemRemoved::event_type(),
            SessionEvent::ClientSelected(_) => ClientSelected::event_type(),
            SessionEvent::NotesUpdated(_) => NotesUpdated::event_type(),
            SessionEvent::SignatureRequested(_) => SignatureRequested::event_type(),
            SessionEvent::SigningAborted(_) => SigningAborted::event_type(),
            SessionEvent::Signed(_) => Signed::event_type(),
            SessionEvent::Finalized(_) => OrderFinalized::event_type(),
        }
    }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Session Started - a salesperson opened the order screen
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SessionStarted {
    pub session_id: Uuid,
    pub preselected_client_id: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl DomainEvent for SessionStarted {
    fn event_type() -> &'static str { "SessionStarted" }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ItemsAdded {
    pub items: Vec<OrderItem>,
}

impl DomainEvent for ItemsAdded {
    fn event_type() -> &'static str { "ItemsAdded" }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ItemRemoved {
    pub item_id: String,
}

impl DomainEvent for ItemRemoved {
    fn event_type() -> &'static str { "ItemRemoved" }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ClientSelected {
    pub client_id: String,
}

impl DomainEvent for ClientSelected {
    fn event_type() -> &'static str { "ClientSelected" }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NotesUpdated {
    pub notes: String,
}

impl DomainEvent for NotesUpdated {
    fn event_type() -> &'static str { "NotesUpdated" }
}

/// Signature Requested - order handed to the client for signing
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SignatureRequested {
    pub requested_at: DateTime<Utc>,
}

impl DomainEvent for SignatureRequested {
    fn event_type() -> &'static str { "SignatureRequested" }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SigningAborted;

impl DomainEvent for SigningAborted {
    fn event_type() -> &'static str { "SigningAborted" }
}

/// Signed - `None` clears a previous signature
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Signed {
    pub signature: Option<String>,
}

impl DomainEvent for Signed {
    fn event_type() -> &'static str { "Signed" }
}

/// Order Finalized - terminal event, carries the immutable order
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderFinalized {
    pub order: Order,
}

impl DomainEvent for OrderFinalized {
    fn event_type() -> &'static str { "OrderFinalized" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_matches_event_type() {
        let event = SessionEvent::NotesUpdated(NotesUpdated { notes: "x".to_string() });
        assert_eq!(event.name(), NotesUpdated::event_type());

        let event = SessionEvent::SigningAborted(SigningAborted);
        assert_eq!(event.name(), "SigningAborted");
    }

    #[test]
    fn test_events_use_default_version() {
        assert_eq!(SessionStarted::event_version(), 1);
        assert_eq!(OrderFinalized::event_version(), 1);
    }

    #[test]
    fn test_event_wire_shape_is_tagged() {
        let event = SessionEvent::ClientSelected(ClientSelected { client_id: "client-1".to_string() });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "ClientSelected");
        assert_eq!(value["data"]["client_id"], "client-1");
    }
}
