//! Itinerary types.
//!
//! An `Itinerary` is a complete door-to-door plan: an ordered list of legs
//! (walking or cycling, waiting at a stop, riding a transit trip) with
//! precomputed totals. Itineraries are validated at construction and never
//! mutated afterwards.

use chrono::{DateTime, FixedOffset};

use super::{DomainError, LatLon, RouteMode};

/// An absolute instant in the request's UTC offset.
pub type Instant = DateTime<FixedOffset>;

/// An endpoint of a leg: either a stop or a free coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub position: LatLon,
    /// Set when the place is a stop of the transport graph.
    pub stop_id: Option<String>,
}

impl Place {
    /// A free coordinate such as the query origin.
    pub fn point(name: impl Into<String>, position: LatLon) -> Self {
        Self {
            name: name.into(),
            position,
            stop_id: None,
        }
    }

    /// A stop of the transport graph.
    pub fn stop(stop_id: impl Into<String>, name: impl Into<String>, position: LatLon) -> Self {
        Self {
            name: name.into(),
            position,
            stop_id: Some(stop_id.into()),
        }
    }
}

/// How a street leg is travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreetMode {
    Walk,
    Bicycle,
}

/// A walking or cycling leg.
#[derive(Debug, Clone, PartialEq)]
pub struct StreetLeg {
    pub mode: StreetMode,
    pub from: Place,
    pub to: Place,
    pub departure: Instant,
    pub arrival: Instant,
    pub distance_m: f64,
    /// Encoded polyline of the path, if one was drawn.
    pub polyline: Option<String>,
}

/// Time spent waiting at a place.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitLeg {
    pub at: Place,
    pub start: Instant,
    pub end: Instant,
}

/// A ride on one transit trip.
///
/// # Invariants
///
/// - Board and alight stops differ
/// - `arrival >= departure`
#[derive(Debug, Clone, PartialEq)]
pub struct TransitLeg {
    pub mode: RouteMode,
    pub from: Place,
    pub to: Place,
    pub departure: Instant,
    pub arrival: Instant,
    pub route_id: String,
    pub route_short_name: Option<String>,
    /// Always a single `#` followed by the hex color.
    pub route_color: String,
    pub trip_id: String,
    pub headsign: Option<String>,
    pub polyline: Option<String>,
}

/// One leg of an itinerary.
#[derive(Debug, Clone, PartialEq)]
pub enum Leg {
    Street(StreetLeg),
    Wait(WaitLeg),
    Transit(TransitLeg),
}

impl Leg {
    pub fn departure(&self) -> Instant {
        match self {
            Leg::Street(leg) => leg.departure,
            Leg::Wait(leg) => leg.start,
            Leg::Transit(leg) => leg.departure,
        }
    }

    pub fn arrival(&self) -> Instant {
        match self {
            Leg::Street(leg) => leg.arrival,
            Leg::Wait(leg) => leg.end,
            Leg::Transit(leg) => leg.arrival,
        }
    }

    /// Leg duration in whole seconds.
    pub fn duration_seconds(&self) -> i64 {
        (self.arrival() - self.departure()).num_seconds()
    }

    pub fn from(&self) -> &Place {
        match self {
            Leg::Street(leg) => &leg.from,
            Leg::Wait(leg) => &leg.at,
            Leg::Transit(leg) => &leg.from,
        }
    }

    pub fn to(&self) -> &Place {
        match self {
            Leg::Street(leg) => &leg.to,
            Leg::Wait(leg) => &leg.at,
            Leg::Transit(leg) => &leg.to,
        }
    }

    /// Upper-case mode label: `WALK`, `BICYCLE`, `WAIT` or the transit mode.
    pub fn mode_label(&self) -> &'static str {
        match self {
            Leg::Street(StreetLeg {
                mode: StreetMode::Walk,
                ..
            }) => "WALK",
            Leg::Street(StreetLeg {
                mode: StreetMode::Bicycle,
                ..
            }) => "BICYCLE",
            Leg::Wait(_) => "WAIT",
            Leg::Transit(leg) => leg.mode.as_str(),
        }
    }

    /// Returns the transit leg if this is one.
    pub fn as_transit(&self) -> Option<&TransitLeg> {
        match self {
            Leg::Transit(leg) => Some(leg),
            _ => None,
        }
    }

    /// Returns true if this is a transit leg.
    pub fn is_transit(&self) -> bool {
        matches!(self, Leg::Transit(_))
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.arrival() < self.departure() {
            return Err(DomainError::InvalidLeg("arrives before it departs"));
        }
        match self {
            Leg::Transit(leg) if leg.from.stop_id == leg.to.stop_id => {
                Err(DomainError::InvalidLeg("board and alight stop are the same"))
            }
            Leg::Street(leg) if !(leg.distance_m.is_finite() && leg.distance_m >= 0.0) => {
                Err(DomainError::InvalidLeg("distance must be finite"))
            }
            _ => Ok(()),
        }
    }
}

/// A complete plan from origin to destination.
///
/// # Invariants
///
/// - At least one leg
/// - Every leg is individually valid
/// - Each leg departs no earlier than the previous leg arrives
#[derive(Debug, Clone, PartialEq)]
pub struct Itinerary {
    legs: Vec<Leg>,
    walk_distance_m: f64,
    transfers: usize,
}

impl Itinerary {
    /// Constructs an itinerary, validating its legs.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the leg list is empty, a leg is malformed, or the
    /// legs are not time-ordered.
    ///
    /// # Examples
    ///
    /// ```
    /// use transit_planner::domain::{Itinerary, LatLon, Leg, Place, StreetLeg, StreetMode};
    /// use chrono::{DateTime, Duration};
    ///
    /// let start = DateTime::parse_from_rfc3339("2026-01-10T17:50:00+01:00").unwrap();
    /// let leg = Leg::Street(StreetLeg {
    ///     mode: StreetMode::Walk,
    ///     from: Place::point("Origin", LatLon::new(45.1954, 0.7808)),
    ///     to: Place::point("Destination", LatLon::new(45.1960, 0.7810)),
    ///     departure: start,
    ///     arrival: start + Duration::seconds(55),
    ///     distance_m: 68.0,
    ///     polyline: None,
    /// });
    ///
    /// let itinerary = Itinerary::new(vec![leg]).unwrap();
    /// assert_eq!(itinerary.duration_seconds(), 55);
    /// assert_eq!(itinerary.transfers(), 0);
    /// assert!(itinerary.is_street_only());
    /// ```
    pub fn new(legs: Vec<Leg>) -> Result<Self, DomainError> {
        if legs.is_empty() {
            return Err(DomainError::EmptyItinerary);
        }

        for leg in &legs {
            leg.validate()?;
        }

        for (i, window) in legs.windows(2).enumerate() {
            if window[1].departure() < window[0].arrival() {
                return Err(DomainError::LegsOutOfOrder { index: i + 1 });
            }
        }

        let walk_distance_m = legs
            .iter()
            .filter_map(|leg| match leg {
                Leg::Street(street) if street.mode == StreetMode::Walk => Some(street.distance_m),
                _ => None,
            })
            .sum();
        let transfers = legs
            .iter()
            .filter(|leg| leg.is_transit())
            .count()
            .saturating_sub(1);

        Ok(Itinerary {
            legs,
            walk_distance_m,
            transfers,
        })
    }

    /// Returns all legs in order.
    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    /// Returns the transit legs in order.
    pub fn transit_legs(&self) -> impl Iterator<Item = &TransitLeg> {
        self.legs.iter().filter_map(Leg::as_transit)
    }

    /// Departure of the first leg.
    pub fn departure(&self) -> Instant {
        // Safe: validated non-empty at construction
        self.legs[0].departure()
    }

    /// Arrival of the last leg.
    pub fn arrival(&self) -> Instant {
        self.legs[self.legs.len() - 1].arrival()
    }

    /// Total duration in whole seconds.
    pub fn duration_seconds(&self) -> i64 {
        (self.arrival() - self.departure()).num_seconds()
    }

    /// Total walked distance in metres.
    pub fn walk_distance_m(&self) -> f64 {
        self.walk_distance_m
    }

    /// Number of transit legs minus one, or zero.
    pub fn transfers(&self) -> usize {
        self.transfers
    }

    /// Returns true if the itinerary uses no transit at all.
    pub fn is_street_only(&self) -> bool {
        !self.legs.iter().any(Leg::is_transit)
    }

    /// Route of the first transit leg.
    pub fn first_route_id(&self) -> Option<&str> {
        self.transit_legs().next().map(|leg| leg.route_id.as_str())
    }

    /// The `(route, board stop, alight stop)` sequence of the transit legs.
    pub fn transit_signature(&self) -> Vec<(&str, Option<&str>, Option<&str>)> {
        self.transit_legs()
            .map(|leg| {
                (
                    leg.route_id.as_str(),
                    leg.from.stop_id.as_deref(),
                    leg.to.stop_id.as_deref(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(minutes: i64) -> Instant {
        DateTime::parse_from_rfc3339("2026-01-10T17:50:00+01:00").unwrap()
            + Duration::minutes(minutes)
    }

    fn stop(id: &str) -> Place {
        Place::stop(id, format!("Stop {id}"), LatLon::new(45.19, 0.72))
    }

    fn walk(from: Place, to: Place, dep: i64, arr: i64, distance_m: f64) -> Leg {
        Leg::Street(StreetLeg {
            mode: StreetMode::Walk,
            from,
            to,
            departure: at(dep),
            arrival: at(arr),
            distance_m,
            polyline: None,
        })
    }

    fn ride(route: &str, from: &str, to: &str, dep: i64, arr: i64) -> Leg {
        Leg::Transit(TransitLeg {
            mode: RouteMode::Bus,
            from: stop(from),
            to: stop(to),
            departure: at(dep),
            arrival: at(arr),
            route_id: route.into(),
            route_short_name: Some(route.into()),
            route_color: "#1976D2".into(),
            trip_id: format!("{route}-trip"),
            headsign: None,
            polyline: None,
        })
    }

    #[test]
    fn empty_is_rejected() {
        assert_eq!(Itinerary::new(vec![]), Err(DomainError::EmptyItinerary));
    }

    #[test]
    fn totals_are_computed() {
        let origin = Place::point("Origin", LatLon::new(45.195, 0.78));
        let dest = Place::point("Destination", LatLon::new(45.185, 0.66));
        let legs = vec![
            walk(origin, stop("A"), 0, 4, 300.0),
            Leg::Wait(WaitLeg {
                at: stop("A"),
                start: at(4),
                end: at(7),
            }),
            ride("L1", "A", "B", 7, 20),
            walk(stop("B"), stop("C"), 20, 22, 120.0),
            ride("L2", "C", "D", 25, 40),
            walk(stop("D"), dest, 40, 45, 350.0),
        ];
        let itinerary = Itinerary::new(legs).unwrap();

        assert_eq!(itinerary.duration_seconds(), 45 * 60);
        assert_eq!(itinerary.transfers(), 1);
        assert_eq!(itinerary.walk_distance_m(), 770.0);
        assert_eq!(itinerary.first_route_id(), Some("L1"));
        assert!(!itinerary.is_street_only());
        assert_eq!(
            itinerary.transit_signature(),
            vec![
                ("L1", Some("A"), Some("B")),
                ("L2", Some("C"), Some("D")),
            ]
        );
    }

    #[test]
    fn out_of_order_legs_are_rejected() {
        let legs = vec![ride("L1", "A", "B", 0, 20), ride("L2", "B", "C", 10, 30)];
        assert_eq!(
            Itinerary::new(legs),
            Err(DomainError::LegsOutOfOrder { index: 1 })
        );
    }

    #[test]
    fn transit_leg_needs_distinct_stops() {
        let err = Itinerary::new(vec![ride("L1", "A", "A", 0, 10)]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidLeg(_)));
    }

    #[test]
    fn leg_cannot_go_backwards_in_time() {
        let err = Itinerary::new(vec![ride("L1", "A", "B", 10, 5)]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidLeg(_)));
    }

    #[test]
    fn mode_labels() {
        assert_eq!(ride("L1", "A", "B", 0, 1).mode_label(), "BUS");
        assert_eq!(walk(stop("A"), stop("B"), 0, 1, 1.0).mode_label(), "WALK");
        let wait = Leg::Wait(WaitLeg {
            at: stop("A"),
            start: at(0),
            end: at(2),
        });
        assert_eq!(wait.mode_label(), "WAIT");
        assert_eq!(wait.duration_seconds(), 120);
    }

    #[test]
    fn bicycle_distance_is_not_walk_distance() {
        let leg = Leg::Street(StreetLeg {
            mode: StreetMode::Bicycle,
            from: stop("A"),
            to: stop("B"),
            departure: at(0),
            arrival: at(10),
            distance_m: 2500.0,
            polyline: None,
        });
        assert_eq!(leg.mode_label(), "BICYCLE");
        let itinerary = Itinerary::new(vec![leg]).unwrap();
        assert_eq!(itinerary.walk_distance_m(), 0.0);
        assert!(itinerary.is_street_only());
    }
}
