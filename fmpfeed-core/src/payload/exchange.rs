use serde::{Deserialize, Serialize};

use crate::mapper::{FieldSpec, Payload};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableExchange {
    pub exchange: String,
    pub name: String,
    pub country_name: Option<String>,
    /// ISO 3166-1 alpha-2.
    pub country_code: Option<String>,
    /// Ticker suffix used on this exchange, e.g. `.AS`.
    pub symbol_suffix: Option<String>,
    pub delay: Option<String>,
}

impl Payload for AvailableExchange {
    const ENTITY: &'static str = "available exchange";
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::key("exchange"),
        FieldSpec::string("name"),
        FieldSpec::nullable_string("countryName"),
        FieldSpec::nullable_string("countryCode").exact_length(2),
        FieldSpec::nullable_string("symbolSuffix").null_if("N/A"),
        FieldSpec::nullable_string("delay"),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeMarketHours {
    pub exchange: String,
    pub name: String,
    pub opening_hour: String,
    pub closing_hour: String,
    pub timezone: String,
    pub is_market_open: bool,
    pub opening_additional: Option<String>,
    pub closing_additional: Option<String>,
}

impl Payload for ExchangeMarketHours {
    const ENTITY: &'static str = "exchange market hours";
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::key("exchange"),
        FieldSpec::string("name"),
        FieldSpec::string("openingHour"),
        FieldSpec::string("closingHour"),
        FieldSpec::string("timezone"),
        FieldSpec::boolean("isMarketOpen"),
        FieldSpec::optional_string("openingAdditional"),
        FieldSpec::optional_string("closingAdditional"),
    ];
}
