//! Property tests for pagination and coercion invariants.
//!
//! Uses proptest to verify:
//! 1. Termination: pagination ends within (to - from) + 1 calls, capped or not
//! 2. Monotonicity: the window's upper bound never increases
//! 3. Completeness: with fewer records per day than the cap, nothing is missed
//! 4. Numeric coercion: integer text reads back as the same integer

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use fmpfeed_core::validate::{parse_numeric, Number};
use fmpfeed_core::CalendarPaginator;
use proptest::prelude::*;

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Simulated service: up to `cap` records in `[from, to]`, newest first.
fn serve(per_day: &[usize], from: NaiveDate, to: NaiveDate, cap: usize) -> Vec<NaiveDate> {
    let mut page = Vec::new();
    let mut date = to;
    while date >= from && page.len() < cap {
        let index = (date - base()).num_days() as usize;
        for _ in 0..per_day[index] {
            if page.len() == cap {
                break;
            }
            page.push(date);
        }
        match date.pred_opt() {
            Some(previous) => date = previous,
            None => break,
        }
    }
    page
}

// ── 1. Termination ───────────────────────────────────────────────────

proptest! {
    /// Capped pages stuck on the same date still move the window down.
    #[test]
    fn always_capped_pages_terminate(days in 1i64..60, cap in 1usize..50) {
        let from = base();
        let to = from + Duration::days(days - 1);
        let mut paginator = CalendarPaginator::new(from, to).unwrap().with_record_cap(cap);

        let mut calls = 0;
        loop {
            calls += 1;
            prop_assert!(calls <= days, "still paginating after {} calls", calls);
            let upper = paginator.to();
            if !paginator.advance(cap, Some(upper), None) {
                break;
            }
        }
    }

    /// Any mix of full and partial pages ends within (to - from) + 1 calls.
    #[test]
    fn any_page_sequence_ends_within_window_days(
        days in 1i64..90,
        pages in prop::collection::vec((any::<bool>(), -5i64..90), 1..120),
    ) {
        let cap = 10;
        let from = base();
        let to = from + Duration::days(days - 1);
        let bound = (to - from).num_days() + 1;
        let mut paginator = CalendarPaginator::new(from, to).unwrap().with_record_cap(cap);

        let mut calls = 0;
        for (full, offset) in pages {
            calls += 1;
            let count = if full { cap } else { cap - 1 };
            if !paginator.advance(count, Some(from + Duration::days(offset)), None) {
                break;
            }
            prop_assert!(calls < bound, "still paginating after {} calls", calls);
        }
        prop_assert!(calls <= bound);
    }
}

// ── 2. Monotonicity ──────────────────────────────────────────────────

proptest! {
    /// Whatever the service answers, `to` never grows and stays above `from` while pages remain.
    #[test]
    fn upper_bound_never_increases(
        days in 1i64..60,
        pages in prop::collection::vec((0usize..=10, -5i64..90), 1..40),
    ) {
        let from = base();
        let to = from + Duration::days(days - 1);
        let mut paginator = CalendarPaginator::new(from, to).unwrap().with_record_cap(10);

        for (count, offset) in pages {
            let before = paginator.to();
            let more = paginator.advance(count, Some(from + Duration::days(offset)), None);
            prop_assert!(paginator.to() <= before);
            prop_assert_eq!(more, paginator.to() >= from);
            if !more {
                break;
            }
        }
    }
}

// ── 3. Completeness ──────────────────────────────────────────────────

proptest! {
    /// Every record is seen at least once when no single day fills a page.
    #[test]
    fn uncapped_days_are_fully_drained(per_day in prop::collection::vec(0usize..5, 1..40)) {
        let cap = 5;
        let from = base();
        let to = from + Duration::days(per_day.len() as i64 - 1);
        let mut paginator = CalendarPaginator::new(from, to).unwrap().with_record_cap(cap);

        let mut seen: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        let mut requests = 0;
        loop {
            requests += 1;
            prop_assert!(requests <= 2 * per_day.len() + 2);
            let window = paginator.window();
            let page = serve(&per_day, window.from, window.to, cap);
            // a re-fetched boundary day is counted once per page; keep the max
            let mut in_page: BTreeMap<NaiveDate, usize> = BTreeMap::new();
            for date in &page {
                *in_page.entry(*date).or_default() += 1;
            }
            for (date, count) in in_page {
                let entry = seen.entry(date).or_default();
                *entry = (*entry).max(count);
            }
            if !paginator.advance(page.len(), page.last().copied(), None) {
                break;
            }
        }

        for (index, &expected) in per_day.iter().enumerate() {
            let date = from + Duration::days(index as i64);
            prop_assert_eq!(seen.get(&date).copied().unwrap_or(0), expected, "day {}", date);
        }
    }
}

// ── 4. Numeric coercion ──────────────────────────────────────────────

proptest! {
    #[test]
    fn integer_text_reads_back(value in any::<i64>()) {
        prop_assert_eq!(parse_numeric(&value.to_string()), Some(Number::Int(value)));
    }

    #[test]
    fn decimal_text_is_float(whole in -1_000_000i64..1_000_000, frac in 0u32..1000) {
        let text = format!("{whole}.{frac:03}");
        prop_assert!(matches!(parse_numeric(&text), Some(Number::Float(_))));
    }
}
