// ============================================================================
// Order Domain - Tag Classification and the Order Session
// ============================================================================
//
// - Value objects (RawTagReading, OrderItem, Order, Material)
// - Classifier (tag reading → material / category / reference / size)
// - Events, commands and errors of an order session
// - Aggregate (OrderSession state machine)
// - Command handler (OrderSessionHandler, wires in analysis and storage)
//
// ============================================================================

pub mod value_objects;
pub mod classifier;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod command_handler;

// Re-export for convenience
pub use value_objects::*;
pub use classifier::{classify, classify_batch, infer_material, UNKNOWN_CATEGORY};
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use command_handler::*;
