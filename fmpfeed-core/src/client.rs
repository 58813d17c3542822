//! FmpClient: one method per endpoint, each returning a lazy [`RecordStream`].
//!
//! Nothing is requested until the returned stream is pulled (or opened by a
//! cooperative task). JSON endpoints validate strictly, CSV endpoints
//! leniently; the failure policy decides whether a bad record ends the
//! stream or is reported and skipped.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::ClientConfig;
use crate::decode::WireFormat;
use crate::error::FetchError;
use crate::mapper::Payload;
use crate::paginate::{CalendarPaginator, DiagnosticSink};
use crate::payload::{
    AvailableExchange, BatchExchangeQuote, BatchForexQuote, CompanyProfile, Cryptocurrency,
    DividendsCalendarItem, EarningsCalendarItem, EodQuote, ExchangeMarketHours,
    FinancialStatementSymbol, HistoricalChart, HistoricalPriceEod, IncomeStatement, Index,
    LatestFinancialStatement, Period, PeriodQuery, SplitsCalendarItem, Stock, TimeInterval,
};
use crate::pipeline::{FailurePolicy, IgnoreFailures, Paging, RecordStream};
use crate::transport::{HttpClientTransport, HttpTransport};

/// `profile-bulk` is served in numbered parts; no real dataset comes close.
pub const PROFILE_BULK_PART_LIMIT: u32 = 100;

fn date_param(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn params<const N: usize>(pairs: [(&str, String); N]) -> Vec<(String, String)> {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

#[derive(Clone)]
pub struct FmpClient {
    transport: Arc<dyn HttpTransport>,
    policy: FailurePolicy,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
}

impl FmpClient {
    /// Client over any transport, failing fast on invalid records.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            policy: FailurePolicy::FailFast,
            diagnostics: None,
        }
    }

    /// Live client. With `strict = false` invalid records are logged and skipped.
    pub fn from_config(config: &ClientConfig) -> Result<Self, FetchError> {
        let transport = HttpClientTransport::new(config)?;
        tracing::debug!(base_url = %config.base_url, strict = config.strict, "client configured");
        Ok(Self::new(Arc::new(transport)).with_strict_mode(config.strict))
    }

    pub fn with_strict_mode(self, strict: bool) -> Self {
        let policy = if strict {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::collect(IgnoreFailures)
        };
        self.with_failure_policy(policy)
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Receiver of pagination stalls on calendar endpoints.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn failure_policy(&self) -> &FailurePolicy {
        &self.policy
    }

    /// Stream `P` records from an arbitrary endpoint.
    pub fn stream<P: Payload>(
        &self,
        path: impl Into<String>,
        format: WireFormat,
        query: Vec<(String, String)>,
        paging: Paging,
    ) -> RecordStream<P> {
        RecordStream::new(Arc::clone(&self.transport), path, format, query, paging)
            .with_failure_policy(self.policy.clone())
            .with_diagnostics(self.diagnostics.clone())
    }

    fn json<P: Payload>(&self, path: &str, query: Vec<(String, String)>) -> RecordStream<P> {
        self.stream(path, WireFormat::JSON, query, Paging::Single)
    }

    fn csv<P: Payload>(&self, path: &str, query: Vec<(String, String)>) -> RecordStream<P> {
        self.stream(path, WireFormat::Csv, query, Paging::Single)
    }

    fn calendar<P: Payload>(
        &self,
        path: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<RecordStream<P>, FetchError> {
        let paginator = CalendarPaginator::new(from, to)?;
        Ok(self.stream(path, WireFormat::JSON, Vec::new(), Paging::Calendar(paginator)))
    }

    // ── Reference lists ──

    pub fn available_exchanges(&self) -> RecordStream<AvailableExchange> {
        self.json("stable/available-exchanges", Vec::new())
    }

    pub fn exchange_market_hours(&self) -> RecordStream<ExchangeMarketHours> {
        self.json("stable/all-exchange-market-hours", Vec::new())
    }

    pub fn index_list(&self) -> RecordStream<Index> {
        self.json("stable/index-list", Vec::new())
    }

    pub fn cryptocurrency_list(&self) -> RecordStream<Cryptocurrency> {
        self.json("stable/cryptocurrency-list", Vec::new())
    }

    pub fn stock_list(&self) -> RecordStream<Stock> {
        self.json("stable/stock-list", Vec::new())
    }

    pub fn financial_statement_symbols(&self) -> RecordStream<FinancialStatementSymbol> {
        self.json("stable/financial-statement-symbol-list", Vec::new())
    }

    // ── Company profiles ──

    /// Profiles for a comma-separated list of symbols.
    pub fn company_profile(&self, symbols: &str) -> RecordStream<CompanyProfile> {
        self.json("stable/profile", params([("symbol", symbols.to_string())]))
    }

    /// Every profile, read part by part until the service answers 400.
    pub fn company_profile_bulk(&self) -> RecordStream<CompanyProfile> {
        self.stream(
            "stable/profile-bulk",
            WireFormat::Csv,
            Vec::new(),
            Paging::Parts {
                limit: PROFILE_BULK_PART_LIMIT,
            },
        )
    }

    // ── Calendars ──

    pub fn dividends_calendar(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<RecordStream<DividendsCalendarItem>, FetchError> {
        self.calendar("stable/dividends-calendar", from, to)
    }

    pub fn earnings_calendar(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<RecordStream<EarningsCalendarItem>, FetchError> {
        self.calendar("stable/earnings-calendar", from, to)
    }

    pub fn splits_calendar(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<RecordStream<SplitsCalendarItem>, FetchError> {
        self.calendar("stable/splits-calendar", from, to)
    }

    // ── Statements ──

    pub fn latest_financial_statements(
        &self,
        page: u32,
        limit: u32,
    ) -> RecordStream<LatestFinancialStatement> {
        self.json(
            "stable/latest-financial-statements",
            params([("page", page.to_string()), ("limit", limit.to_string())]),
        )
    }

    pub fn income_statement(
        &self,
        symbol: &str,
        period: Option<PeriodQuery>,
    ) -> RecordStream<IncomeStatement> {
        let mut query = params([("symbol", symbol.to_string())]);
        if let Some(period) = period {
            query.push(("period".into(), period.to_string()));
        }
        self.json("stable/income-statement", query)
    }

    pub fn income_statement_bulk(&self, year: i32, period: Period) -> RecordStream<IncomeStatement> {
        self.csv(
            "stable/income-statement-bulk",
            params([("year", year.to_string()), ("period", period.to_string())]),
        )
    }

    // ── Prices and quotes ──

    pub fn eod_bulk(&self, date: NaiveDate) -> RecordStream<EodQuote> {
        self.csv("stable/eod-bulk", params([("date", date_param(date))]))
    }

    pub fn historical_price_eod(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RecordStream<HistoricalPriceEod> {
        self.json(
            "stable/historical-price-eod/full",
            params([
                ("symbol", symbol.to_string()),
                ("from", date_param(from)),
                ("to", date_param(to)),
            ]),
        )
    }

    pub fn historical_chart(
        &self,
        symbol: &str,
        interval: TimeInterval,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RecordStream<HistoricalChart> {
        self.json(
            &format!("stable/historical-chart/{interval}"),
            params([
                ("symbol", symbol.to_string()),
                ("from", date_param(from)),
                ("to", date_param(to)),
            ]),
        )
    }

    pub fn batch_exchange_quote(&self, exchange: &str) -> RecordStream<BatchExchangeQuote> {
        self.json(
            "stable/batch-exchange-quote",
            params([("exchange", exchange.to_string())]),
        )
    }

    pub fn batch_forex_quotes(&self) -> RecordStream<BatchForexQuote> {
        self.json("stable/batch-forex-quotes", Vec::new())
    }
}

impl std::fmt::Debug for FmpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FmpClient")
            .field("policy", &self.policy)
            .field("diagnostics", &self.diagnostics.is_some())
            .finish_non_exhaustive()
    }
}
