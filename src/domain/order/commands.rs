use chrono::{DateTime, Utc};

use super::value_objects::{ClientSummary, OrderItem, WorkerRef};

// ============================================================================
// Order Session Commands - Represent user intent
// ============================================================================

#[derive(Debug, Clone)]
pub enum SessionCommand {
    AddItems {
        items: Vec<OrderItem>,
    },
    RemoveItem {
        item_id: String,
    },
    SelectClient {
        client_id: String,
    },
    SetNotes {
        notes: String,
    },
    RequestSignature,
    AbortSigning,
    Sign {
        signature: String,
    },
    Finalize {
        order_id: String,
        client: ClientSummary,
        worker: WorkerRef,
        finalized_at: DateTime<Utc>,
    },
}

impl SessionCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::AddItems { .. } => "AddItems",
            SessionCommand::RemoveItem { .. } => "RemoveItem",
            SessionCommand::SelectClient { .. } => "SelectClient",
            SessionCommand::SetNotes { .. } => "SetNotes",
            SessionCommand::RequestSignature => "RequestSignature",
            SessionCommand::AbortSigning => "AbortSigning",
            SessionCommand::Sign { .. } => "Sign",
            SessionCommand::Finalize { .. } => "Finalize",
        }
    }
}
