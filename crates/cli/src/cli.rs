//! CLI command handling

use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use clap::Parser;
use tracing::{info, warn};

use erpsales_infra::{ConfigError, LedgerConfig, PostgresSalesLedger};
use erpsales_sales::{
    compute_breakdown, compute_net_sales_report, DailySalesBreakdown, LedgerError, LedgerResult,
    SalesLedger, DEFAULT_TOP_PRODUCTS,
};

use crate::render::{TextReport, TextStyle};

/// Daily sales summary: gross sales, returns and net sales for one day
#[derive(Debug, Parser)]
#[command(name = "erpsales")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Report date (YYYY-MM-DD); defaults to today
    #[arg(value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Number of best-selling products to list
    #[arg(long, value_name = "N", default_value_t = DEFAULT_TOP_PRODUCTS)]
    top: u32,

    /// Only print the net sales summary (no product or branch breakdown)
    #[arg(long)]
    summary_only: bool,

    /// UTC offset deciding what "today" is, e.g. +05:30
    #[arg(long, value_name = "±HH:MM", value_parser = parse_utc_offset, allow_hyphen_values = true)]
    utc_offset: Option<FixedOffset>,

    /// Currency symbol printed before amounts
    #[arg(long, value_name = "SYMBOL", default_value = "₹")]
    currency: String,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let date = self.report_date(Utc::now());
        let config = LedgerConfig::from_env().context("loading ledger configuration")?;
        info!(%date, target = %config.target(), "computing daily sales");

        let ledger = PostgresSalesLedger::connect(&config)
            .await
            .with_context(|| format!("connecting to ledger at {}", config.target()))?;

        // The connection is released whether or not the report could be computed.
        let result = self.compute(date, &ledger).await;
        ledger.close().await;
        let breakdown = result.with_context(|| format!("computing sales for {date}"))?;

        self.print(&breakdown)
    }

    /// The date to report on: the explicit argument, else today in the
    /// requested UTC offset, else today in local time.
    fn report_date(&self, now: DateTime<Utc>) -> NaiveDate {
        match (self.date, self.utc_offset) {
            (Some(date), _) => date,
            (None, Some(offset)) => now.with_timezone(&offset).date_naive(),
            (None, None) => now.with_timezone(&Local).date_naive(),
        }
    }

    async fn compute<L>(&self, date: NaiveDate, ledger: &L) -> LedgerResult<DailySalesBreakdown>
    where
        L: SalesLedger + ?Sized,
    {
        if self.summary_only {
            let summary = compute_net_sales_report(date, ledger).await?;
            return Ok(DailySalesBreakdown::summary_only(summary));
        }
        compute_breakdown(date, self.top, ledger).await
    }

    fn print(&self, breakdown: &DailySalesBreakdown) -> anyhow::Result<()> {
        let mut stdout = std::io::stdout().lock();
        if self.json {
            writeln!(stdout, "{}", to_json(breakdown)?)?;
        } else {
            let style = TextStyle {
                currency: &self.currency,
                top_limit: self.top,
                summary_only: self.summary_only,
            };
            write!(stdout, "{}", TextReport::new(breakdown, &style))?;
        }
        stdout.flush()?;
        Ok(())
    }
}

/// Pretty JSON of the breakdown; amounts are decimal strings.
fn to_json(breakdown: &DailySalesBreakdown) -> serde_json::Result<String> {
    serde_json::to_string_pretty(breakdown)
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected a date like 2025-11-26: {e}"))
}

/// Parse `±HH:MM` (also `Z`/`UTC` for zero) into a fixed offset.
fn parse_utc_offset(raw: &str) -> Result<FixedOffset, String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| "invalid offset".to_string());
    }

    let invalid = || format!("expected an offset like +05:30 or -08:00, got {raw:?}");
    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    if hours.len() != 2 || minutes.len() != 2 {
        return Err(invalid());
    }
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// What went wrong, as far as the exit status and hints are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    Config,
    DataSource,
    MalformedResult,
    Other,
}

impl FailureKind {
    fn of(err: &anyhow::Error) -> Self {
        if err.downcast_ref::<ConfigError>().is_some() {
            return Self::Config;
        }
        match err.downcast_ref::<LedgerError>() {
            Some(LedgerError::DataSource(_)) => Self::DataSource,
            Some(LedgerError::MalformedResult(_)) => Self::MalformedResult,
            None => Self::Other,
        }
    }

    fn exit_code(self) -> ExitCode {
        match self {
            Self::Config => ExitCode::from(2),
            Self::DataSource | Self::MalformedResult | Self::Other => ExitCode::FAILURE,
        }
    }
}

fn troubleshooting_hints(target: Option<&str>) -> Vec<String> {
    let server = target.unwrap_or("the configured host");
    vec![
        format!("Check that the database server at {server} is running"),
        "Verify network connectivity to the database host".to_string(),
        "Ensure the server accepts remote connections".to_string(),
        "Check firewall settings".to_string(),
    ]
}

/// Print the failure to stderr and pick the exit status.
pub fn report_failure(err: &anyhow::Error) -> ExitCode {
    let kind = FailureKind::of(err);
    warn!(?kind, "daily sales report failed");

    eprintln!("Error: {err:#}");
    match kind {
        FailureKind::Config => {
            eprintln!();
            eprintln!("Set SALES_DATABASE_URL, or SALES_DB_NAME with SALES_DB_HOST/PORT/USER/PASSWORD.");
        }
        FailureKind::DataSource => {
            let target = LedgerConfig::from_env().ok().map(|c| c.target());
            eprintln!();
            eprintln!("Troubleshooting:");
            for hint in troubleshooting_hints(target.as_deref()) {
                eprintln!("   - {hint}");
            }
        }
        FailureKind::MalformedResult | FailureKind::Other => {}
    }
    kind.exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use erpsales_infra::ledger::{InMemorySalesLedger, LedgerLine, LedgerRecord};
    use rust_decimal::Decimal;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 26).unwrap()
    }

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::try_parse_from(["erpsales"]).unwrap();
        assert_eq!(cli.date, None);
        assert!(!cli.json);
        assert!(!cli.summary_only);
        assert_eq!(cli.top, DEFAULT_TOP_PRODUCTS);
        assert_eq!(cli.currency, "₹");
        assert_eq!(cli.utc_offset, None);
    }

    #[test]
    fn test_cli_parse_date_and_flags() {
        let cli = Cli::try_parse_from([
            "erpsales",
            "2025-11-26",
            "--json",
            "--top",
            "3",
            "--summary-only",
            "--currency",
            "Rs.",
        ])
        .unwrap();
        assert_eq!(cli.date, Some(day()));
        assert!(cli.json);
        assert!(cli.summary_only);
        assert_eq!(cli.top, 3);
        assert_eq!(cli.currency, "Rs.");
    }

    #[test]
    fn test_cli_rejects_bad_date() {
        assert!(Cli::try_parse_from(["erpsales", "26/11/2025"]).is_err());
        assert!(Cli::try_parse_from(["erpsales", "2025-02-30"]).is_err());
    }

    #[test]
    fn test_cli_parse_utc_offset() {
        let cli = Cli::try_parse_from(["erpsales", "--utc-offset", "+05:30"]).unwrap();
        assert_eq!(cli.utc_offset, FixedOffset::east_opt(5 * 3600 + 1800));

        let cli = Cli::try_parse_from(["erpsales", "--utc-offset=-08:00"]).unwrap();
        assert_eq!(cli.utc_offset, FixedOffset::west_opt(8 * 3600));
    }

    #[test]
    fn test_utc_offset_parser() {
        assert_eq!(parse_utc_offset("Z"), Ok(FixedOffset::east_opt(0).unwrap()));
        assert_eq!(parse_utc_offset("+00:00"), Ok(FixedOffset::east_opt(0).unwrap()));
        assert_eq!(
            parse_utc_offset("-03:30"),
            Ok(FixedOffset::west_opt(3 * 3600 + 1800).unwrap())
        );
        for bad in ["05:30", "+5:30", "+24:00", "+05:60", "+0530", "", "+ab:cd"] {
            assert!(parse_utc_offset(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_report_date_resolution() {
        let now = Utc.with_ymd_and_hms(2025, 11, 26, 20, 0, 0).unwrap();

        let cli = Cli::try_parse_from(["erpsales", "--utc-offset", "+05:30"]).unwrap();
        assert_eq!(cli.report_date(now), NaiveDate::from_ymd_opt(2025, 11, 27).unwrap());

        let cli = Cli::try_parse_from(["erpsales", "--utc-offset=-08:00"]).unwrap();
        assert_eq!(cli.report_date(now), day());

        let cli = Cli::try_parse_from(["erpsales", "2025-01-01", "--utc-offset", "+05:30"]).unwrap();
        assert_eq!(cli.report_date(now), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    fn ledger() -> InMemorySalesLedger {
        let noon = day().and_hms_opt(12, 0, 0).unwrap();
        InMemorySalesLedger::with_records([
            LedgerRecord::sale(noon, Decimal::from(600), Decimal::from(30))
                .with_line(LedgerLine::new("Milk 1L", Decimal::from(6), Decimal::from(300))),
            LedgerRecord::sales_return(noon, Decimal::from(100), Decimal::from(5)),
        ])
    }

    #[tokio::test]
    async fn test_compute_full_breakdown() {
        let cli = Cli::try_parse_from(["erpsales", "--top", "5"]).unwrap();
        let breakdown = cli.compute(day(), &ledger()).await.unwrap();
        assert_eq!(breakdown.summary.net_amount(), Decimal::from(500));
        assert_eq!(breakdown.top_products.len(), 1);
        assert_eq!(breakdown.branches.len(), 1);
    }

    #[tokio::test]
    async fn test_compute_summary_only_skips_detail() {
        let cli = Cli::try_parse_from(["erpsales", "--summary-only"]).unwrap();
        let breakdown = cli.compute(day(), &ledger()).await.unwrap();
        assert_eq!(breakdown.summary.net_tax(), Decimal::from(25));
        assert!(breakdown.top_products.is_empty());
        assert!(breakdown.branches.is_empty());
    }

    #[tokio::test]
    async fn test_compute_propagates_outage() {
        let cli = Cli::try_parse_from(["erpsales"]).unwrap();
        let ledger = ledger();
        ledger.set_outage(Some("connection refused")).unwrap();
        let err = cli.compute(day(), &ledger).await.unwrap_err();
        assert!(err.is_data_source());
    }

    #[tokio::test]
    async fn test_json_output_shape() {
        let cli = Cli::try_parse_from(["erpsales", "--json"]).unwrap();
        let breakdown = cli.compute(day(), &ledger()).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&to_json(&breakdown).unwrap()).unwrap();

        let summary = &json["summary"];
        assert_eq!(summary["date"], "2025-11-26");
        assert_eq!(summary["gross_sales"]["bill_count"], 1);
        assert_eq!(summary["gross_sales"]["amount"], "600");
        assert_eq!(summary["returns"]["tax"], "5");
        assert_eq!(summary["net_bill_count"], 0);
        assert_eq!(summary["net_amount"], "500");

        assert_eq!(json["top_products"][0]["description"], "Milk 1L");
        assert_eq!(json["top_products"][0]["quantity"], "6");
        assert_eq!(json["branches"][0]["branch"], 0);
        assert_eq!(json["branches"][0]["bill_count"], 1);
    }

    #[test]
    fn test_failure_kind_through_context() {
        let err = anyhow::Error::new(ConfigError::Missing("SALES_DB_NAME"))
            .context("loading ledger configuration");
        assert_eq!(FailureKind::of(&err), FailureKind::Config);

        let err = anyhow::Error::new(LedgerError::data_source("refused")).context("connecting");
        assert_eq!(FailureKind::of(&err), FailureKind::DataSource);

        let err = anyhow::Error::new(LedgerError::malformed("bad column"));
        assert_eq!(FailureKind::of(&err), FailureKind::MalformedResult);

        let err = anyhow::anyhow!("something else");
        assert_eq!(FailureKind::of(&err), FailureKind::Other);
    }

    #[test]
    fn test_hints_name_the_target() {
        let hints = troubleshooting_hints(Some("192.168.0.3:5432/urban"));
        assert!(hints[0].contains("192.168.0.3:5432/urban"));
        assert_eq!(troubleshooting_hints(None).len(), 4);
    }
}
