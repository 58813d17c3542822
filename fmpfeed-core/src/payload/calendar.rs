//! Calendar records. Their `date` drives calendar pagination, so it is parsed
//! rather than kept as text.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::mapper::{FieldSpec, Payload};
use crate::validate::Number;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendsCalendarItem {
    pub symbol: String,
    pub date: NaiveDate,
    pub record_date: Option<String>,
    pub payment_date: Option<String>,
    pub declaration_date: Option<String>,
    pub adj_dividend: f64,
    pub dividend: f64,
    #[serde(rename = "yield")]
    pub dividend_yield: f64,
    pub frequency: String,
}

impl Payload for DividendsCalendarItem {
    const ENTITY: &'static str = "dividends calendar";
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::key("symbol"),
        FieldSpec::date("date"),
        FieldSpec::nullable_string("recordDate"),
        FieldSpec::nullable_string("paymentDate"),
        FieldSpec::nullable_string("declarationDate"),
        FieldSpec::float("adjDividend"),
        FieldSpec::float("dividend"),
        FieldSpec::float("yield"),
        FieldSpec::string("frequency"),
    ];

    fn calendar_date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsCalendarItem {
    pub symbol: String,
    pub date: NaiveDate,
    pub eps_actual: f64,
    pub eps_estimated: Option<Number>,
    pub revenue_actual: i64,
    pub revenue_estimated: Option<i64>,
    pub last_updated: String,
}

impl Payload for EarningsCalendarItem {
    const ENTITY: &'static str = "earnings calendar";
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::key("symbol"),
        FieldSpec::date("date"),
        FieldSpec::float("epsActual"),
        FieldSpec::nullable_number("epsEstimated"),
        FieldSpec::integer("revenueActual"),
        FieldSpec::nullable_integer("revenueEstimated"),
        FieldSpec::string("lastUpdated"),
    ];

    fn calendar_date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitsCalendarItem {
    pub symbol: String,
    pub date: NaiveDate,
    pub numerator: i64,
    pub denominator: i64,
}

impl Payload for SplitsCalendarItem {
    const ENTITY: &'static str = "splits calendar";
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::key("symbol"),
        FieldSpec::date("date"),
        FieldSpec::integer("numerator"),
        FieldSpec::integer("denominator"),
    ];

    fn calendar_date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}
