//! Domain error types.
//!
//! These errors represent validation failures when assembling journey
//! values. They are distinct from feed, graph and API errors.

/// Domain-level errors for itinerary construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Invalid leg construction (e.g., arrival before departure)
    #[error("invalid leg: {0}")]
    InvalidLeg(&'static str),

    /// A leg starts before the previous one ends
    #[error("leg {index} departs before the previous leg arrives")]
    LegsOutOfOrder { index: usize },

    /// Itinerary has no legs
    #[error("itinerary must have at least one leg")]
    EmptyItinerary,
}
