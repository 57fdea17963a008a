// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Kept apart from the event sourcing primitives and from the adapters
// (analysis, persistence, messaging) it is wired to.
//
// ============================================================================

pub mod order;
