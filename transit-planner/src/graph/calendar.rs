//! Service calendar: weekly patterns plus dated exceptions.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::domain::{CalendarDateRecord, CalendarRecord, ExceptionType};

/// Answers "does service X run on date D?".
///
/// A dated exception always wins over the weekly pattern for its date.
#[derive(Debug, Clone, Default)]
pub struct ServiceCalendar {
    weekly: HashMap<String, CalendarRecord>,
    exceptions: HashMap<String, HashMap<NaiveDate, ExceptionType>>,
}

impl ServiceCalendar {
    pub fn new(calendar: &[CalendarRecord], calendar_dates: &[CalendarDateRecord]) -> Self {
        let weekly = calendar
            .iter()
            .map(|c| (c.service_id.clone(), c.clone()))
            .collect();

        let mut exceptions: HashMap<String, HashMap<NaiveDate, ExceptionType>> = HashMap::new();
        for cd in calendar_dates {
            exceptions
                .entry(cd.service_id.clone())
                .or_default()
                .insert(cd.date, cd.exception_type);
        }

        Self { weekly, exceptions }
    }

    /// Returns true if `service_id` runs on `date`.
    ///
    /// Unknown services never run.
    pub fn is_active(&self, service_id: &str, date: NaiveDate) -> bool {
        if let Some(exception) = self
            .exceptions
            .get(service_id)
            .and_then(|dates| dates.get(&date))
        {
            return *exception == ExceptionType::Added;
        }

        match self.weekly.get(service_id) {
            Some(cal) => {
                date >= cal.start_date && date <= cal.end_date && cal.runs_on_weekday(date)
            }
            None => false,
        }
    }

    /// Number of services with a weekly pattern.
    pub fn service_count(&self) -> usize {
        self.weekly.len()
    }
}
