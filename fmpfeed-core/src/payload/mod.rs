//! Domain records, one per endpoint shape, and the wire enumerations.
//!
//! Each record implements [`Payload`](crate::mapper::Payload): its schema is a
//! static table and the mapping is done by the generic routine in
//! [`crate::mapper`].

mod calendar;
mod exchange;
mod listing;
mod profile;
mod quote;
mod statement;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use calendar::{DividendsCalendarItem, EarningsCalendarItem, SplitsCalendarItem};
pub use exchange::{AvailableExchange, ExchangeMarketHours};
pub use listing::{Cryptocurrency, FinancialStatementSymbol, Index, Stock};
pub use profile::CompanyProfile;
pub use quote::{BatchExchangeQuote, BatchForexQuote, EodQuote, HistoricalChart, HistoricalPriceEod};
pub use statement::{IncomeStatement, LatestFinancialStatement};

/// Fiscal period of a reported statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "FY")]
    Fy,
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Period {
    pub const ALL: [Period; 5] = [Period::Fy, Period::Q1, Period::Q2, Period::Q3, Period::Q4];

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Fy => "FY",
            Period::Q1 => "Q1",
            Period::Q2 => "Q2",
            Period::Q3 => "Q3",
            Period::Q4 => "Q4",
        }
    }
}

/// Period filter accepted by statement queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodQuery {
    Annual,
    Quarter,
    #[serde(rename = "FY")]
    Fy,
    #[serde(rename = "Q1")]
    Q1,
    #[serde(rename = "Q2")]
    Q2,
    #[serde(rename = "Q3")]
    Q3,
    #[serde(rename = "Q4")]
    Q4,
}

impl PeriodQuery {
    pub const ALL: [PeriodQuery; 7] = [
        PeriodQuery::Annual,
        PeriodQuery::Quarter,
        PeriodQuery::Fy,
        PeriodQuery::Q1,
        PeriodQuery::Q2,
        PeriodQuery::Q3,
        PeriodQuery::Q4,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PeriodQuery::Annual => "annual",
            PeriodQuery::Quarter => "quarter",
            PeriodQuery::Fy => "FY",
            PeriodQuery::Q1 => "Q1",
            PeriodQuery::Q2 => "Q2",
            PeriodQuery::Q3 => "Q3",
            PeriodQuery::Q4 => "Q4",
        }
    }
}

impl From<Period> for PeriodQuery {
    fn from(period: Period) -> Self {
        match period {
            Period::Fy => PeriodQuery::Fy,
            Period::Q1 => PeriodQuery::Q1,
            Period::Q2 => PeriodQuery::Q2,
            Period::Q3 => PeriodQuery::Q3,
            Period::Q4 => PeriodQuery::Q4,
        }
    }
}

/// Bar size of intraday charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInterval {
    #[serde(rename = "1min")]
    OneMinute,
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "30min")]
    ThirtyMinutes,
    #[serde(rename = "1hour")]
    OneHour,
    #[serde(rename = "4hour")]
    FourHours,
}

impl TimeInterval {
    pub const ALL: [TimeInterval; 6] = [
        TimeInterval::OneMinute,
        TimeInterval::FiveMinutes,
        TimeInterval::FifteenMinutes,
        TimeInterval::ThirtyMinutes,
        TimeInterval::OneHour,
        TimeInterval::FourHours,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeInterval::OneMinute => "1min",
            TimeInterval::FiveMinutes => "5min",
            TimeInterval::FifteenMinutes => "15min",
            TimeInterval::ThirtyMinutes => "30min",
            TimeInterval::OneHour => "1hour",
            TimeInterval::FourHours => "4hour",
        }
    }
}

macro_rules! wire_token {
    ($ty:ty, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty>::ALL
                    .into_iter()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| format!("unknown {}: {s}", $what))
            }
        }
    };
}

wire_token!(Period, "period");
wire_token!(PeriodQuery, "period");
wire_token!(TimeInterval, "time interval");
