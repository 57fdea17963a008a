// ============================================================================
// Event Sourcing Infrastructure
// ============================================================================
//
// Generic aggregate/event abstractions shared by every domain aggregate.
// Domain-specific code is in src/domain/
//
// ============================================================================

pub mod core;

pub use self::core::*;
