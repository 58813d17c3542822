use serde::{Deserialize, Serialize};

use crate::mapper::{FieldSpec, Narrow, Payload};
use crate::validate::Number;

/// Company profile, served per symbol as JSON and in bulk as CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub symbol: String,
    pub price: Option<Number>,
    pub market_cap: Option<i64>,
    pub beta: Option<Number>,
    pub last_dividend: Option<Number>,
    pub range: Option<String>,
    pub change: Option<Number>,
    pub change_percentage: Option<Number>,
    pub volume: Option<Number>,
    pub average_volume: Option<i64>,
    pub company_name: Option<String>,
    pub currency: Option<String>,
    pub cik: Option<String>,
    pub isin: Option<String>,
    pub cusip: Option<String>,
    pub exchange_full_name: Option<String>,
    pub exchange: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub ceo: Option<String>,
    pub sector: Option<String>,
    pub country: Option<String>,
    /// Reported as text; some issuers publish ranges.
    pub full_time_employees: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub image: Option<String>,
    pub ipo_date: Option<String>,
    pub default_image: Option<bool>,
    pub is_etf: Option<bool>,
    pub is_actively_trading: Option<bool>,
    pub is_adr: Option<bool>,
    pub is_fund: Option<bool>,
}

impl Payload for CompanyProfile {
    const ENTITY: &'static str = "company profile";
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::key("symbol"),
        FieldSpec::nullable_number("price"),
        FieldSpec::nullable_number("marketCap").narrow(Narrow::IntOrNull),
        FieldSpec::nullable_number("beta"),
        FieldSpec::nullable_number("lastDividend"),
        FieldSpec::nullable_string("range"),
        FieldSpec::nullable_number("change"),
        FieldSpec::nullable_number("changePercentage"),
        FieldSpec::nullable_number("volume"),
        FieldSpec::nullable_number("averageVolume").narrow(Narrow::IntOrNull),
        FieldSpec::nullable_string("companyName"),
        FieldSpec::nullable_string("currency"),
        FieldSpec::nullable_string("cik"),
        FieldSpec::nullable_string("isin"),
        FieldSpec::nullable_string("cusip"),
        FieldSpec::nullable_string("exchangeFullName"),
        FieldSpec::nullable_string("exchange"),
        FieldSpec::nullable_string("industry"),
        FieldSpec::nullable_string("website"),
        FieldSpec::nullable_string("description"),
        FieldSpec::nullable_string("ceo"),
        FieldSpec::nullable_string("sector"),
        FieldSpec::nullable_string("country"),
        FieldSpec::nullable_string("fullTimeEmployees"),
        FieldSpec::nullable_string("phone"),
        FieldSpec::nullable_string("address"),
        FieldSpec::nullable_string("city"),
        FieldSpec::nullable_string("state"),
        FieldSpec::nullable_string("zip"),
        FieldSpec::nullable_string("image"),
        FieldSpec::nullable_string("ipoDate"),
        FieldSpec::nullable_boolean("defaultImage"),
        FieldSpec::nullable_boolean("isEtf"),
        FieldSpec::nullable_boolean("isActivelyTrading"),
        FieldSpec::nullable_boolean("isAdr"),
        FieldSpec::nullable_boolean("isFund"),
    ];
}
