use serde::{Deserialize, Serialize};

use super::Period;
use crate::mapper::{FieldSpec, Narrow, Payload};

/// Income statement line items. Missing amounts read as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeStatement {
    pub symbol: String,
    pub date: String,
    pub reported_currency: String,
    pub cik: String,
    pub filing_date: String,
    pub accepted_date: String,
    pub fiscal_year: String,
    pub period: Period,
    pub revenue: i64,
    pub cost_of_revenue: i64,
    pub gross_profit: i64,
    pub research_and_development_expenses: i64,
    pub general_and_administrative_expenses: i64,
    pub selling_and_marketing_expenses: i64,
    pub selling_general_and_administrative_expenses: i64,
    pub other_expenses: i64,
    pub operating_expenses: i64,
    pub cost_and_expenses: i64,
    pub net_interest_income: i64,
    pub interest_income: i64,
    pub interest_expense: i64,
    pub depreciation_and_amortization: i64,
    pub ebitda: i64,
    pub ebit: i64,
    pub non_operating_income_excluding_interest: i64,
    pub operating_income: i64,
    pub total_other_income_expenses_net: i64,
    pub income_before_tax: i64,
    pub income_tax_expense: i64,
    pub net_income_from_continuing_operations: i64,
    pub net_income_from_discontinued_operations: i64,
    pub other_adjustments_to_net_income: i64,
    pub net_income: i64,
    pub net_income_deductions: i64,
    pub bottom_line_net_income: i64,
    pub eps: f64,
    pub eps_diluted: f64,
    pub weighted_average_shs_out: i64,
    pub weighted_average_shs_out_dil: i64,
}

const fn amount(wire: &'static str) -> FieldSpec {
    FieldSpec::nullable_number(wire).narrow(Narrow::IntOrZero)
}

impl Payload for IncomeStatement {
    const ENTITY: &'static str = "income statement";
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::key("symbol"),
        FieldSpec::string("date"),
        FieldSpec::string("reportedCurrency"),
        FieldSpec::string("cik"),
        FieldSpec::string("filingDate"),
        FieldSpec::string("acceptedDate"),
        FieldSpec::string("fiscalYear"),
        FieldSpec::string("period"),
        amount("revenue"),
        amount("costOfRevenue"),
        amount("grossProfit"),
        amount("researchAndDevelopmentExpenses"),
        amount("generalAndAdministrativeExpenses"),
        amount("sellingAndMarketingExpenses"),
        amount("sellingGeneralAndAdministrativeExpenses"),
        amount("otherExpenses"),
        amount("operatingExpenses"),
        amount("costAndExpenses"),
        amount("netInterestIncome"),
        amount("interestIncome"),
        amount("interestExpense"),
        amount("depreciationAndAmortization"),
        amount("ebitda"),
        amount("ebit"),
        amount("nonOperatingIncomeExcludingInterest"),
        amount("operatingIncome"),
        amount("totalOtherIncomeExpensesNet"),
        amount("incomeBeforeTax"),
        amount("incomeTaxExpense"),
        amount("netIncomeFromContinuingOperations"),
        amount("netIncomeFromDiscontinuedOperations"),
        amount("otherAdjustmentsToNetIncome"),
        amount("netIncome"),
        amount("netIncomeDeductions"),
        amount("bottomLineNetIncome"),
        FieldSpec::nullable_number("eps").narrow(Narrow::FloatOrZero),
        FieldSpec::nullable_number("epsDiluted").narrow(Narrow::FloatOrZero),
        amount("weightedAverageShsOut"),
        amount("weightedAverageShsOutDil"),
    ];
}

/// Entry of the feed of recently filed statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestFinancialStatement {
    pub symbol: String,
    pub calendar_year: i64,
    pub period: String,
    pub date: String,
    pub date_added: String,
}

impl Payload for LatestFinancialStatement {
    const ENTITY: &'static str = "latest financial statement";
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::key("symbol"),
        FieldSpec::integer("calendarYear"),
        FieldSpec::string("period"),
        FieldSpec::string("date"),
        FieldSpec::string("dateAdded"),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawRecord;
    use crate::validate::{FailureKind, ValidationMode};
    use serde_json::{json, Value};

    fn statement() -> Value {
        let mut raw = json!({
            "symbol": "AAPL",
            "date": "2024-09-28",
            "reportedCurrency": "USD",
            "cik": "0000320193",
            "filingDate": "2024-11-01",
            "acceptedDate": "2024-11-01 06:01:36",
            "fiscalYear": "2024",
            "period": "FY",
            "eps": 6.11,
            "epsDiluted": 6.08
        });
        let fields = raw.as_object_mut().unwrap();
        for spec in &IncomeStatement::SCHEMA[8..] {
            fields.entry(spec.wire).or_insert(Value::Null);
        }
        fields.insert("revenue".into(), json!(391035000000i64));
        fields.insert("grossProfit".into(), json!(180683000000.0));
        raw
    }

    #[test]
    fn missing_amounts_read_as_zero() {
        let income = IncomeStatement::from_raw(&RawRecord::new(statement()), ValidationMode::Strict)
            .unwrap();
        assert_eq!(income.period, Period::Fy);
        assert_eq!(income.revenue, 391_035_000_000);
        assert_eq!(income.gross_profit, 180_683_000_000);
        assert_eq!(income.ebitda, 0);
        assert_eq!(income.eps_diluted, 6.08);
    }

    #[test]
    fn unknown_period_is_unmappable() {
        let mut raw = statement();
        raw["period"] = json!("H1");
        let failure = IncomeStatement::from_raw(&RawRecord::new(raw), ValidationMode::Strict)
            .unwrap_err();
        assert!(matches!(failure.kind, FailureKind::Unmappable(_)));
        assert_eq!(failure.context.as_deref(), Some("AAPL"));
    }

    #[test]
    fn latest_statement_needs_integer_year() {
        let raw = json!({
            "symbol": "FGFI",
            "calendarYear": "2024",
            "period": "Q4",
            "date": "2024-12-31",
            "dateAdded": "2025-03-13 17:03:59"
        });
        let failure =
            LatestFinancialStatement::from_raw(&RawRecord::new(raw.clone()), ValidationMode::Strict)
                .unwrap_err();
        assert_eq!(failure.kind, FailureKind::NotInteger);

        let latest =
            LatestFinancialStatement::from_raw(&RawRecord::new(raw), ValidationMode::Lenient)
                .unwrap();
        assert_eq!(latest.calendar_year, 2024);
    }
}
