// ============================================================================
// Persistence - Repository Seams
// ============================================================================
//
// The order flow only talks to the traits in `repository`; `memory` holds
// the in-process implementations used by the CLI and the tests.
//
// ============================================================================

pub mod repository;
pub mod memory;

pub use repository::{filter_recent, ClientDirectory, OrderRepository, OrderSaved, RepositoryError};
pub use memory::{InMemoryClientDirectory, InMemoryOrderRepository};
