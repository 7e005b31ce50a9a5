//! Arena indices into the transport graph.
//!
//! The graph stores stops, routes and trips in dense vectors; these indices
//! address them. They are only meaningful for the graph that produced them.

use std::fmt;

/// Position of a stop in the graph's stop vector.
///
/// # Examples
///
/// ```
/// use transit_planner::domain::StopIdx;
///
/// let idx = StopIdx(3);
/// assert_eq!(idx.0, 3);
///
/// // Copy, so it's cheap to pass around
/// let idx2 = idx;
/// assert_eq!(idx, idx2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StopIdx(pub usize);

/// Position of a route in the graph's route vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteIdx(pub usize);

/// Position of a trip in the graph's trip vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TripIdx(pub usize);

macro_rules! index_conversions {
    ($($name:ident),*) => {
        $(
            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<usize> for $name {
                fn from(value: usize) -> Self {
                    $name(value)
                }
            }

            impl From<$name> for usize {
                fn from(value: $name) -> Self {
                    value.0
                }
            }
        )*
    };
}

index_conversions!(StopIdx, RouteIdx, TripIdx);
