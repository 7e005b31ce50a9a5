//! Itinerary engine.
//!
//! Owns the transport graph and walk graph, runs time-shifted router
//! searches between candidate stops, and turns the journeys into ranked
//! door-to-door itineraries.

pub mod assemble;
mod config;
mod error;
mod handle;
pub mod rank;
mod search;
mod shape;

pub use assemble::{DEFAULT_ROUTE_COLOR, normalize_color};
pub use config::EngineConfig;
pub use error::EngineError;
pub use handle::{DatasetSource, EngineHandle};
pub use search::{PathfindingEngine, SearchError, SearchRequest, SearchResult};
pub use shape::extract_section;
