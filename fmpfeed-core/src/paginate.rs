//! CalendarPaginator: date-window stepping under a per-response record cap.
//!
//! Calendar endpoints return at most [`RECORD_CAP`] records per response and
//! have no cursor. The only progress signal is the date of the last record of
//! a page, which becomes the inclusive upper bound of the next request.
//!
//! Precondition: records within a page arrive in descending date order. This
//! is not verified; an ascending page would make the window skip records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Maximum number of records the remote service returns per response.
pub const RECORD_CAP: usize = 4000;

/// Inclusive date window of one request. `from <= to` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// The same boundary date was seen twice in a row at the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationStall {
    pub date: NaiveDate,
    pub record_count: usize,
}

/// Receives self-corrected conditions that are not errors.
pub trait DiagnosticSink: Send + Sync {
    fn pagination_stall(&self, stall: &PaginationStall);
}

#[derive(Debug, Clone)]
pub struct CalendarPaginator {
    from: NaiveDate,
    to: NaiveDate,
    last_to: NaiveDate,
    cap: usize,
}

impl CalendarPaginator {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, FetchError> {
        if to < from {
            return Err(FetchError::InvalidRange { from, to });
        }
        Ok(Self {
            from,
            to,
            last_to: to,
            cap: RECORD_CAP,
        })
    }

    /// Override the cap, for services configured with a different limit.
    pub fn with_record_cap(mut self, cap: usize) -> Self {
        self.cap = cap.max(1);
        self
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    pub fn window(&self) -> PaginationWindow {
        PaginationWindow {
            from: self.from,
            to: self.to,
        }
    }

    /// Step past a page of `record_count` records whose last date was `last_date`.
    ///
    /// Returns whether another page must be requested. `to` never increases:
    /// a `last_date` after the current upper bound is clamped to it.
    pub fn advance(
        &mut self,
        record_count: usize,
        last_date: Option<NaiveDate>,
        diagnostics: Option<&dyn DiagnosticSink>,
    ) -> bool {
        let Some(last_date) = last_date else {
            return false;
        };
        let mut to = last_date.min(self.to);

        if record_count < self.cap {
            // the boundary day was fully drained
            let Some(previous) = to.pred_opt() else {
                return false;
            };
            to = previous;
        } else if to == self.last_to {
            tracing::warn!(date = %to, record_count, "pagination stalled at the record cap");
            if let Some(sink) = diagnostics {
                sink.pagination_stall(&PaginationStall {
                    date: to,
                    record_count,
                });
            }
            let Some(previous) = to.pred_opt() else {
                return false;
            };
            to = previous;
        }

        self.to = to;
        self.last_to = to;
        self.to >= self.from
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[derive(Default)]
    struct Stalls(Mutex<Vec<PaginationStall>>);

    impl DiagnosticSink for Stalls {
        fn pagination_stall(&self, stall: &PaginationStall) {
            self.0.lock().unwrap().push(*stall);
        }
    }

    #[test]
    fn rejects_inverted_range() {
        let err = CalendarPaginator::new(d("2024-03-01"), d("2024-02-01")).unwrap_err();
        assert!(matches!(err, FetchError::InvalidRange { .. }));
    }

    #[test]
    fn single_day_window_is_valid() {
        let p = CalendarPaginator::new(d("2024-03-01"), d("2024-03-01")).unwrap();
        assert_eq!(p.window().from, p.window().to);
    }

    #[test]
    fn empty_page_finishes() {
        let mut p = CalendarPaginator::new(d("2024-01-01"), d("2024-03-01")).unwrap();
        assert!(!p.advance(0, None, None));
        assert_eq!(p.to(), d("2024-03-01"));
    }

    #[test]
    fn partial_page_steps_past_boundary_day() {
        let mut p = CalendarPaginator::new(d("2024-01-01"), d("2024-03-01")).unwrap();
        assert!(p.advance(3999, Some(d("2024-02-10")), None));
        assert_eq!(p.to(), d("2024-02-09"));
    }

    #[test]
    fn full_page_refetches_boundary_day() {
        let mut p = CalendarPaginator::new(d("2024-01-01"), d("2024-03-01")).unwrap();
        assert!(p.advance(RECORD_CAP, Some(d("2024-02-10")), None));
        assert_eq!(p.to(), d("2024-02-10"));
    }

    #[test]
    fn repeated_full_page_on_same_date_is_forced_forward() {
        let stalls = Stalls::default();
        let mut p = CalendarPaginator::new(d("2024-01-01"), d("2024-03-01")).unwrap();
        assert!(p.advance(4000, Some(d("2024-02-10")), Some(&stalls)));
        assert!(p.advance(4000, Some(d("2024-02-10")), Some(&stalls)));
        assert_eq!(p.to(), d("2024-02-09"));
        let seen = stalls.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].date, d("2024-02-10"));
    }

    #[test]
    fn full_first_page_at_upper_bound_is_a_stall() {
        let mut p = CalendarPaginator::new(d("2024-01-01"), d("2024-03-01")).unwrap();
        assert!(p.advance(4000, Some(d("2024-03-01")), None));
        assert_eq!(p.to(), d("2024-02-29"));
    }

    #[test]
    fn stops_once_window_is_exhausted() {
        let mut p = CalendarPaginator::new(d("2024-01-01"), d("2024-01-05")).unwrap();
        assert!(!p.advance(12, Some(d("2024-01-01")), None));
        assert!(p.to() < p.from());
    }

    #[test]
    fn later_dates_are_clamped() {
        let mut p = CalendarPaginator::new(d("2024-01-01"), d("2024-01-05")).unwrap();
        assert!(p.advance(10, Some(d("2024-02-01")), None));
        assert_eq!(p.to(), d("2024-01-04"));
    }

    #[test]
    fn custom_cap() {
        let mut p = CalendarPaginator::new(d("2024-01-01"), d("2024-01-31"))
            .unwrap()
            .with_record_cap(10);
        assert!(p.advance(10, Some(d("2024-01-20")), None));
        assert_eq!(p.to(), d("2024-01-20"));
    }
}
