//! Native public-transit itinerary planner.
//!
//! Loads a static transit feed into an indexed graph and answers
//! door-to-door queries ("how do I get from here to there, leaving now?")
//! with ranked itineraries of walking, waiting and transit legs.

pub mod cache;
pub mod domain;
pub mod engine;
pub mod feed;
pub mod graph;
pub mod planner;
pub mod raptor;
pub mod walk;
pub mod web;
