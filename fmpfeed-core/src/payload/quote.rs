use serde::{Deserialize, Serialize};

use crate::mapper::{FieldSpec, Narrow, Payload};
use crate::validate::Number;

const fn price(wire: &'static str) -> FieldSpec {
    FieldSpec::number(wire).narrow(Narrow::ToFloat)
}

/// Row of the end-of-day bulk CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EodQuote {
    pub symbol: String,
    pub date: String,
    pub open: f64,
    pub low: f64,
    pub high: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: f64,
}

impl Payload for EodQuote {
    const ENTITY: &'static str = "eod bulk quote";
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::key("symbol"),
        FieldSpec::string("date"),
        price("open"),
        price("low"),
        price("high"),
        price("close"),
        price("adjClose"),
        price("volume"),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPriceEod {
    pub symbol: String,
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub change: f64,
    pub change_percent: f64,
    pub vwap: f64,
}

impl Payload for HistoricalPriceEod {
    const ENTITY: &'static str = "historical price eod";
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::key("symbol"),
        FieldSpec::string("date"),
        price("open"),
        price("high"),
        price("low"),
        price("close"),
        FieldSpec::integer("volume"),
        price("change"),
        price("changePercent"),
        price("vwap"),
    ];
}

/// Intraday bar. The timestamp (`YYYY-MM-DD HH:MM:SS`) is the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalChart {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Payload for HistoricalChart {
    const ENTITY: &'static str = "historical chart";
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::key("date"),
        price("open"),
        price("high"),
        price("low"),
        price("close"),
        FieldSpec::integer("volume"),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchForexQuote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub volume: Option<Number>,
}

impl Payload for BatchForexQuote {
    const ENTITY: &'static str = "batch forex quote";
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::key("symbol"),
        price("price"),
        price("change"),
        FieldSpec::nullable_number("volume"),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchExchangeQuote {
    pub symbol: String,
    pub price: Option<f64>,
    pub change: Option<f64>,
    pub volume: Option<Number>,
}

impl Payload for BatchExchangeQuote {
    const ENTITY: &'static str = "batch exchange quote";
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::key("symbol"),
        FieldSpec::nullable_number("price").narrow(Narrow::FloatOrNull),
        FieldSpec::nullable_number("change").narrow(Narrow::FloatOrNull),
        FieldSpec::nullable_number("volume"),
    ];
}
