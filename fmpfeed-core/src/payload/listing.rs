use serde::{Deserialize, Serialize};

use crate::mapper::{FieldSpec, Payload};
use crate::validate::Number;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    pub currency: String,
}

impl Payload for Index {
    const ENTITY: &'static str = "index";
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::key("symbol"),
        FieldSpec::string("name"),
        FieldSpec::string("exchange"),
        FieldSpec::string("currency"),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cryptocurrency {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    pub ico_date: Option<String>,
    pub circulating_supply: Option<Number>,
    pub total_supply: Option<Number>,
}

impl Payload for Cryptocurrency {
    const ENTITY: &'static str = "cryptocurrency";
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::key("symbol"),
        FieldSpec::string("name"),
        FieldSpec::string("exchange"),
        FieldSpec::nullable_string("icoDate"),
        FieldSpec::nullable_number("circulatingSupply"),
        FieldSpec::nullable_number("totalSupply"),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    pub symbol: String,
    pub company_name: Option<String>,
}

impl Payload for Stock {
    const ENTITY: &'static str = "stock";
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::key("symbol"),
        FieldSpec::nullable_string("companyName"),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialStatementSymbol {
    pub symbol: String,
    pub company_name: String,
    pub trading_currency: String,
    pub reporting_currency: Option<String>,
}

impl Payload for FinancialStatementSymbol {
    const ENTITY: &'static str = "financial statement symbol";
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::key("symbol"),
        FieldSpec::string("companyName"),
        FieldSpec::string("tradingCurrency"),
        FieldSpec::nullable_string("reportingCurrency"),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawRecord;
    use crate::validate::{FailureKind, ValidationMode};
    use serde_json::json;

    #[test]
    fn cryptocurrency_keeps_numeric_shape() {
        let raw = RawRecord::new(json!({
            "symbol": "BTCUSD",
            "name": "Bitcoin USD",
            "exchange": "CCC",
            "icoDate": null,
            "circulatingSupply": 19_500_000,
            "totalSupply": 21e6
        }));
        let coin = Cryptocurrency::from_raw(&raw, ValidationMode::Strict).unwrap();
        assert_eq!(coin.circulating_supply, Some(Number::Int(19_500_000)));
        assert_eq!(coin.total_supply, Some(Number::Float(21e6)));
        assert_eq!(coin.ico_date, None);
    }

    #[test]
    fn stock_requires_company_name_key() {
        let raw = RawRecord::new(json!({ "symbol": "AAPL" }));
        let failure = Stock::from_raw(&raw, ValidationMode::Strict).unwrap_err();
        assert_eq!(failure.kind, FailureKind::MissingField);
        assert_eq!(
            failure.to_string(),
            "The stock in AAPL must contain a \"companyName\" key."
        );
    }

    #[test]
    fn index_rejects_blank_currency() {
        let raw = RawRecord::new(json!({
            "symbol": "^GSPC",
            "name": "S&P 500",
            "exchange": "SNP",
            "currency": ""
        }));
        let failure = Index::from_raw(&raw, ValidationMode::Strict).unwrap_err();
        assert_eq!(failure.field.as_deref(), Some("currency"));
        assert_eq!(failure.context.as_deref(), Some("^GSPC"));
    }

    #[test]
    fn statement_symbol_allows_missing_reporting_currency() {
        let raw = RawRecord::new(json!({
            "symbol": "6898.HK",
            "companyName": "China Aluminum Cans Holdings Limited",
            "tradingCurrency": "HKD",
            "reportingCurrency": null
        }));
        let symbol = FinancialStatementSymbol::from_raw(&raw, ValidationMode::Strict).unwrap();
        assert_eq!(symbol.reporting_currency, None);
    }
}
