//! Static feed reader.
//!
//! Reads a directory of feed CSV files into a [`Dataset`]. `stops.txt`,
//! `routes.txt`, `trips.txt` and `stop_times.txt` are required; `calendar.txt`,
//! `calendar_dates.txt`, `shapes.txt` and `transfers.txt` are read when
//! present.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::domain::{
    CalendarDateRecord, CalendarRecord, Dataset, ExceptionType, RouteRecord, ServiceTime,
    ShapePointRecord, StopRecord, StopTimeRecord, TimeError, TransferRecord, TripRecord,
};

/// Error reading a feed directory.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed {file}: {source}")]
    Csv {
        file: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{file}: {source}")]
    InvalidTime {
        file: &'static str,
        #[source]
        source: TimeError,
    },

    #[error("{file}: invalid date {value:?}, expected YYYYMMDD")]
    InvalidDate { file: &'static str, value: String },
}

#[derive(Deserialize)]
struct RawStop {
    stop_id: String,
    #[serde(default)]
    stop_name: Option<String>,
    stop_lat: f64,
    stop_lon: f64,
    #[serde(default)]
    location_type: Option<u8>,
    #[serde(default)]
    parent_station: Option<String>,
}

#[derive(Deserialize)]
struct RawRoute {
    route_id: String,
    #[serde(default)]
    route_short_name: Option<String>,
    #[serde(default)]
    route_long_name: Option<String>,
    #[serde(default)]
    route_color: Option<String>,
    route_type: u16,
}

#[derive(Deserialize)]
struct RawTrip {
    route_id: String,
    service_id: String,
    trip_id: String,
    #[serde(default)]
    trip_headsign: Option<String>,
    #[serde(default)]
    shape_id: Option<String>,
}

#[derive(Deserialize)]
struct RawStopTime {
    trip_id: String,
    #[serde(default)]
    arrival_time: Option<String>,
    #[serde(default)]
    departure_time: Option<String>,
    stop_id: String,
    stop_sequence: u32,
}

#[derive(Deserialize)]
struct RawCalendar {
    service_id: String,
    monday: u8,
    tuesday: u8,
    wednesday: u8,
    thursday: u8,
    friday: u8,
    saturday: u8,
    sunday: u8,
    start_date: String,
    end_date: String,
}

#[derive(Deserialize)]
struct RawCalendarDate {
    service_id: String,
    date: String,
    exception_type: u8,
}

#[derive(Deserialize)]
struct RawShapePoint {
    shape_id: String,
    shape_pt_lat: f64,
    shape_pt_lon: f64,
    shape_pt_sequence: u32,
}

#[derive(Deserialize)]
struct RawTransfer {
    from_stop_id: String,
    to_stop_id: String,
    #[serde(default)]
    transfer_type: Option<u8>,
    #[serde(default)]
    min_transfer_time: Option<u32>,
}

/// `transfer_type` marking a pair where transfers are not possible.
const TRANSFER_NOT_POSSIBLE: u8 = 3;

fn read_table<T: DeserializeOwned>(dir: &Path, file: &'static str) -> Result<Vec<T>, FeedError> {
    let reader = BufReader::new(File::open(dir.join(file))?);
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    rdr.deserialize()
        .map(|row| row.map_err(|source| FeedError::Csv { file, source }))
        .collect()
}

fn read_optional_table<T: DeserializeOwned>(
    dir: &Path,
    file: &'static str,
) -> Result<Vec<T>, FeedError> {
    if !dir.join(file).exists() {
        debug!(file, "optional feed file absent");
        return Ok(Vec::new());
    }
    read_table(dir, file)
}

fn parse_date(file: &'static str, value: &str) -> Result<NaiveDate, FeedError> {
    NaiveDate::parse_from_str(value, "%Y%m%d").map_err(|_| FeedError::InvalidDate {
        file,
        value: value.to_string(),
    })
}

fn parse_time(value: &str) -> Result<ServiceTime, FeedError> {
    ServiceTime::parse(value).map_err(|source| FeedError::InvalidTime {
        file: "stop_times.txt",
        source,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Read every feed table in `dir`.
///
/// # Errors
///
/// Fails if a required file is missing or any file is malformed. Stop times
/// with neither an arrival nor a departure time and calendar exceptions with
/// an unknown type are skipped with a warning.
pub fn load_dir(dir: &Path) -> Result<Dataset, FeedError> {
    let stops = read_table::<RawStop>(dir, "stops.txt")?
        .into_iter()
        .map(|s| StopRecord {
            name: non_empty(s.stop_name).unwrap_or_else(|| s.stop_id.clone()),
            stop_id: s.stop_id,
            lat: s.stop_lat,
            lon: s.stop_lon,
            location_type: s.location_type,
            parent_station: non_empty(s.parent_station),
        })
        .collect();

    let routes = read_table::<RawRoute>(dir, "routes.txt")?
        .into_iter()
        .map(|r| RouteRecord {
            route_id: r.route_id,
            short_name: non_empty(r.route_short_name),
            long_name: non_empty(r.route_long_name),
            color: non_empty(r.route_color),
            route_type: r.route_type,
        })
        .collect();

    let trips = read_table::<RawTrip>(dir, "trips.txt")?
        .into_iter()
        .map(|t| TripRecord {
            trip_id: t.trip_id,
            route_id: t.route_id,
            service_id: t.service_id,
            shape_id: non_empty(t.shape_id),
            headsign: non_empty(t.trip_headsign),
        })
        .collect();

    let mut untimed = 0usize;
    let mut stop_times = Vec::new();
    for st in read_table::<RawStopTime>(dir, "stop_times.txt")? {
        let arrival = non_empty(st.arrival_time);
        let departure = non_empty(st.departure_time);
        let (arrival, departure) = match (arrival, departure) {
            (Some(a), Some(d)) => (parse_time(&a)?, parse_time(&d)?),
            (Some(a), None) => {
                let t = parse_time(&a)?;
                (t, t)
            }
            (None, Some(d)) => {
                let t = parse_time(&d)?;
                (t, t)
            }
            (None, None) => {
                untimed += 1;
                continue;
            }
        };
        stop_times.push(StopTimeRecord {
            trip_id: st.trip_id,
            stop_id: st.stop_id,
            arrival,
            departure,
            stop_sequence: st.stop_sequence,
        });
    }
    if untimed > 0 {
        warn!(skipped = untimed, "skipped stop times without times");
    }

    let calendar = read_optional_table::<RawCalendar>(dir, "calendar.txt")?
        .into_iter()
        .map(|c| {
            Ok(CalendarRecord {
                monday: c.monday == 1,
                tuesday: c.tuesday == 1,
                wednesday: c.wednesday == 1,
                thursday: c.thursday == 1,
                friday: c.friday == 1,
                saturday: c.saturday == 1,
                sunday: c.sunday == 1,
                start_date: parse_date("calendar.txt", &c.start_date)?,
                end_date: parse_date("calendar.txt", &c.end_date)?,
                service_id: c.service_id,
            })
        })
        .collect::<Result<Vec<_>, FeedError>>()?;

    let mut unknown_exceptions = 0usize;
    let mut calendar_dates = Vec::new();
    for cd in read_optional_table::<RawCalendarDate>(dir, "calendar_dates.txt")? {
        let Some(exception_type) = ExceptionType::from_code(cd.exception_type) else {
            unknown_exceptions += 1;
            continue;
        };
        calendar_dates.push(CalendarDateRecord {
            date: parse_date("calendar_dates.txt", &cd.date)?,
            service_id: cd.service_id,
            exception_type,
        });
    }
    if unknown_exceptions > 0 {
        warn!(skipped = unknown_exceptions, "skipped calendar exceptions with unknown type");
    }

    let shapes = read_optional_table::<RawShapePoint>(dir, "shapes.txt")?
        .into_iter()
        .map(|p| ShapePointRecord {
            shape_id: p.shape_id,
            lat: p.shape_pt_lat,
            lon: p.shape_pt_lon,
            sequence: p.shape_pt_sequence,
        })
        .collect();

    let raw_transfers = read_optional_table::<RawTransfer>(dir, "transfers.txt")?;
    let raw_count = raw_transfers.len();
    let transfers: Vec<TransferRecord> = raw_transfers
        .into_iter()
        .filter(|t| {
            t.from_stop_id != t.to_stop_id && t.transfer_type != Some(TRANSFER_NOT_POSSIBLE)
        })
        .map(|t| TransferRecord {
            from_stop_id: t.from_stop_id,
            to_stop_id: t.to_stop_id,
            min_transfer_time: t.min_transfer_time,
        })
        .collect();
    if transfers.len() < raw_count {
        debug!(
            skipped = raw_count - transfers.len(),
            "skipped same-stop and forbidden transfers"
        );
    }

    let dataset = Dataset {
        stops,
        routes,
        trips,
        stop_times,
        calendar,
        calendar_dates,
        shapes,
        transfers,
    };
    info!(
        dir = %dir.display(),
        stops = dataset.stops.len(),
        routes = dataset.routes.len(),
        trips = dataset.trips.len(),
        stop_times = dataset.stop_times.len(),
        "read feed"
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_feed(dir: &Path) {
        fs::write(
            dir.join("stops.txt"),
            "stop_id,stop_name,stop_lat,stop_lon,location_type,parent_station\n\
             SP1,Gare,45.1870,0.7150,1,\n\
             Q1,Gare Quai 1,45.1871,0.7151,0,SP1\n\
             Q2,Mairie,45.1840,0.7200,,\n",
        )
        .unwrap();
        fs::write(
            dir.join("routes.txt"),
            "route_id,route_short_name,route_long_name,route_type,route_color\n\
             A,A,Ligne A,3,E30613\n\
             T,,Navette,0,\n",
        )
        .unwrap();
        fs::write(
            dir.join("trips.txt"),
            "route_id,service_id,trip_id,trip_headsign,shape_id\n\
             A,SEM,A-1,Mairie,SH1\n",
        )
        .unwrap();
        fs::write(
            dir.join("stop_times.txt"),
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
             A-1,23:50:00,23:50:00,Q1,1\n\
             A-1,,,Q2,2\n\
             A-1,24:05:00,,Q2,3\n",
        )
        .unwrap();
        fs::write(
            dir.join("calendar.txt"),
            "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n\
             SEM,1,1,1,1,1,0,0,20260101,20261231\n",
        )
        .unwrap();
        fs::write(
            dir.join("calendar_dates.txt"),
            "service_id,date,exception_type\n\
             SEM,20260501,2\n\
             SEM,20260502,9\n",
        )
        .unwrap();
    }

    #[test]
    fn reads_feed_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path());

        let ds = load_dir(dir.path()).unwrap();

        assert_eq!(ds.stops.len(), 3);
        assert_eq!(ds.stops[0].location_type, Some(1));
        assert_eq!(ds.stops[1].parent_station.as_deref(), Some("SP1"));
        assert_eq!(ds.stops[2].location_type, None);

        assert_eq!(ds.routes[0].color.as_deref(), Some("E30613"));
        assert_eq!(ds.routes[1].short_name, None);
        assert_eq!(ds.routes[1].color, None);

        assert_eq!(ds.trips[0].headsign.as_deref(), Some("Mairie"));
        assert_eq!(ds.trips[0].shape_id.as_deref(), Some("SH1"));

        // the untimed row is skipped, times past midnight are kept
        assert_eq!(ds.stop_times.len(), 2);
        assert_eq!(ds.stop_times[1].arrival, ServiceTime::from_hms(24, 5, 0));
        assert_eq!(ds.stop_times[1].departure, ServiceTime::from_hms(24, 5, 0));

        assert!(ds.calendar[0].monday);
        assert!(!ds.calendar[0].saturday);
        assert_eq!(
            ds.calendar[0].end_date,
            NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()
        );

        assert_eq!(ds.calendar_dates.len(), 1);
        assert_eq!(ds.calendar_dates[0].exception_type, ExceptionType::Removed);

        assert!(ds.shapes.is_empty());
        assert!(ds.transfers.is_empty());
    }

    #[test]
    fn missing_required_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path());
        fs::remove_file(dir.path().join("trips.txt")).unwrap();

        assert!(matches!(load_dir(dir.path()), Err(FeedError::Io(_))));
    }

    #[test]
    fn bad_time_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path());
        fs::write(
            dir.path().join("stop_times.txt"),
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
             A-1,8h30,8h30,Q1,1\n",
        )
        .unwrap();

        let err = load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, FeedError::InvalidTime { .. }));
    }

    #[test]
    fn bad_date_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path());
        fs::write(
            dir.path().join("calendar_dates.txt"),
            "service_id,date,exception_type\nSEM,2026-05-01,1\n",
        )
        .unwrap();

        let err = load_dir(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            FeedError::InvalidDate { file: "calendar_dates.txt", .. }
        ));
        assert_eq!(
            err.to_string(),
            "calendar_dates.txt: invalid date \"2026-05-01\", expected YYYYMMDD"
        );
    }

    #[test]
    fn malformed_row_is_csv_error() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path());
        fs::write(
            dir.path().join("stops.txt"),
            "stop_id,stop_name,stop_lat,stop_lon\nQ1,Gare,north,0.7\n",
        )
        .unwrap();

        let err = load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, FeedError::Csv { file: "stops.txt", .. }));
    }

    #[test]
    fn transfers_and_shapes_are_read() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path());
        fs::write(
            dir.path().join("transfers.txt"),
            "from_stop_id,to_stop_id,transfer_type,min_transfer_time\nQ1,Q2,2,240\nQ2,Q1,0,\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("shapes.txt"),
            "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\nSH1,45.1871,0.7151,1\nSH1,45.1840,0.7200,2\n",
        )
        .unwrap();

        let ds = load_dir(dir.path()).unwrap();
        assert_eq!(ds.transfers[0].min_transfer_time, Some(240));
        assert_eq!(ds.transfers[1].min_transfer_time, None);
        assert_eq!(ds.shapes.len(), 2);
        assert_eq!(ds.shapes[1].sequence, 2);
    }

    #[test]
    fn forbidden_and_same_stop_transfers_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path());
        fs::write(
            dir.path().join("transfers.txt"),
            "from_stop_id,to_stop_id,transfer_type,min_transfer_time
             Q1,Q2,3,
             Q1,Q1,2,300
             Q2,Q1,1,
",
        )
        .unwrap();

        let ds = load_dir(dir.path()).unwrap();
        assert_eq!(ds.transfers.len(), 1);
        assert_eq!(ds.transfers[0].from_stop_id, "Q2");
        assert_eq!(ds.transfers[0].to_stop_id, "Q1");
    }
}
