//! Postgres-backed transaction ledger.
//!
//! Reads `inv_transaction_master` (one row per voucher) and
//! `inv_transaction_details` (one row per line item). The ledger is owned by the
//! transactional system; this module only issues read-only aggregate queries,
//! and the session is opened with `default_transaction_read_only = on`.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `LedgerError` as follows:
//!
//! | SQLx Error | LedgerError | Scenario |
//! |------------|-------------|----------|
//! | ColumnDecode / Decode | `MalformedResult` | Column type differs from the expected aggregate (e.g. `float8` sum) |
//! | ColumnNotFound / ColumnIndexOutOfBounds | `MalformedResult` | Row shape differs from the expected aggregate |
//! | TypeNotFound | `MalformedResult` | Unknown column type |
//! | Database | `DataSource` | SQL error, permission denied, authentication failure |
//! | Io / Tls / Protocol | `DataSource` | Host unreachable, connection dropped mid-query |
//! | PoolTimedOut / PoolClosed | `DataSource` | Connect timeout, ledger already closed |
//! | Other | `DataSource` | Anything else the driver reports |

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{info, instrument};

use erpsales_sales::{
    BranchSalesRow, LedgerError, LedgerResult, LedgerTotalsRow, ProductSalesRow, SalesLedger,
    VoucherType,
};

use crate::config::LedgerConfig;

/// Both totals queries run at once, each on its own connection.
const MAX_CONNECTIONS: u32 = 2;

const DAILY_TOTALS_SQL: &str = r#"
    SELECT
        COUNT(*) AS bill_count,
        SUM(grand_total) AS amount,
        SUM(vat_amount) AS tax,
        SUM(total_discount) AS discount
    FROM inv_transaction_master
    WHERE CAST(transaction_date AS DATE) = $1
        AND voucher_type = $2
"#;

const TOP_PRODUCTS_SQL: &str = r#"
    SELECT
        d.product_description AS description,
        SUM(d.quantity) AS quantity,
        SUM(d.net_amount) AS amount
    FROM inv_transaction_details d
    INNER JOIN inv_transaction_master m
        ON d.inv_transaction_master_id = m.inv_transaction_master_id
    WHERE CAST(m.transaction_date AS DATE) = $1
        AND m.voucher_type = $2
    GROUP BY d.product_description
    ORDER BY SUM(d.quantity) DESC NULLS LAST, d.product_description ASC
    LIMIT $3
"#;

const BRANCH_SALES_SQL: &str = r#"
    SELECT
        COALESCE(branch_id, 0) AS branch_id,
        COUNT(*) AS bill_count,
        SUM(grand_total) AS amount
    FROM inv_transaction_master
    WHERE CAST(transaction_date AS DATE) = $1
        AND voucher_type = $2
    GROUP BY COALESCE(branch_id, 0)
    ORDER BY SUM(grand_total) DESC NULLS LAST, COALESCE(branch_id, 0) ASC
"#;

/// Postgres-backed sales ledger.
///
/// Holds a small SQLx pool that lives for one invocation: open it with
/// [`PostgresSalesLedger::connect`], and call [`PostgresSalesLedger::close`]
/// once the report is computed, whether or not computing it succeeded.
#[derive(Debug, Clone)]
pub struct PostgresSalesLedger {
    pool: PgPool,
}

impl PostgresSalesLedger {
    /// Connect to the ledger described by `config`.
    ///
    /// One connection is established eagerly so an unreachable host or bad
    /// credentials fail here, before any query is issued.
    #[instrument(skip(config), fields(target = %config.target()), err)]
    pub async fn connect(config: &LedgerConfig) -> LedgerResult<Self> {
        let options = config
            .connect_options()
            .clone()
            .options([("default_transaction_read_only", "on")]);

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(config.connect_timeout())
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        info!("connected to ledger");
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool (the caller is responsible for its settings).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close every connection. Idempotent.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("ledger connection closed");
    }
}

#[async_trait]
impl SalesLedger for PostgresSalesLedger {
    #[instrument(skip(self), err)]
    async fn daily_totals(
        &self,
        date: NaiveDate,
        voucher: VoucherType,
    ) -> LedgerResult<Option<LedgerTotalsRow>> {
        let row = sqlx::query(DAILY_TOTALS_SQL)
            .bind(date)
            .bind(voucher.code())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("daily_totals", e))?;

        row.as_ref().map(totals_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn top_products(&self, date: NaiveDate, limit: u32) -> LedgerResult<Vec<ProductSalesRow>> {
        let rows = sqlx::query(TOP_PRODUCTS_SQL)
            .bind(date)
            .bind(VoucherType::SalesInvoice.code())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("top_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn branch_sales(&self, date: NaiveDate) -> LedgerResult<Vec<BranchSalesRow>> {
        let rows = sqlx::query(BRANCH_SALES_SQL)
            .bind(date)
            .bind(VoucherType::SalesInvoice.code())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("branch_sales", e))?;

        rows.iter().map(branch_from_row).collect()
    }
}

fn expect_columns(operation: &str, row: &PgRow, expected: usize) -> LedgerResult<()> {
    if row.len() != expected {
        return Err(LedgerError::malformed(format!(
            "{operation}: expected {expected} columns, got {}",
            row.len()
        )));
    }
    Ok(())
}

fn totals_from_row(row: &PgRow) -> LedgerResult<LedgerTotalsRow> {
    expect_columns("daily_totals", row, 4)?;
    let get_err = |e| map_sqlx_error("daily_totals", e);
    Ok(LedgerTotalsRow {
        bill_count: row.try_get::<Option<i64>, _>(0).map_err(get_err)?,
        amount: row.try_get::<Option<Decimal>, _>(1).map_err(get_err)?,
        tax: row.try_get::<Option<Decimal>, _>(2).map_err(get_err)?,
        discount: row.try_get::<Option<Decimal>, _>(3).map_err(get_err)?,
    })
}

fn product_from_row(row: &PgRow) -> LedgerResult<ProductSalesRow> {
    expect_columns("top_products", row, 3)?;
    let get_err = |e| map_sqlx_error("top_products", e);
    Ok(ProductSalesRow {
        description: row.try_get::<Option<String>, _>(0).map_err(get_err)?,
        quantity: row.try_get::<Option<Decimal>, _>(1).map_err(get_err)?,
        amount: row.try_get::<Option<Decimal>, _>(2).map_err(get_err)?,
    })
}

fn branch_from_row(row: &PgRow) -> LedgerResult<BranchSalesRow> {
    expect_columns("branch_sales", row, 3)?;
    let get_err = |e| map_sqlx_error("branch_sales", e);
    Ok(BranchSalesRow {
        branch_id: row.try_get::<Option<i32>, _>(0).map_err(get_err)?,
        bill_count: row.try_get::<Option<i64>, _>(1).map_err(get_err)?,
        amount: row.try_get::<Option<Decimal>, _>(2).map_err(get_err)?,
    })
}

/// Map SQLx errors to ledger errors.
///
/// See the module documentation for the mapping table.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> LedgerError {
    match err {
        sqlx::Error::ColumnDecode { index, source } => LedgerError::malformed(format!(
            "{operation}: column {index} has an unexpected type: {source}"
        )),
        sqlx::Error::Decode(source) => {
            LedgerError::malformed(format!("{operation}: failed to decode value: {source}"))
        }
        sqlx::Error::ColumnNotFound(name) => {
            LedgerError::malformed(format!("{operation}: column {name} not found"))
        }
        sqlx::Error::ColumnIndexOutOfBounds { index, len } => LedgerError::malformed(format!(
            "{operation}: column index {index} out of bounds (row has {len})"
        )),
        sqlx::Error::TypeNotFound { type_name } => {
            LedgerError::malformed(format!("{operation}: unknown type {type_name}"))
        }
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
            LedgerError::data_source(format!(
                "database error in {operation}: {} (code {code})",
                db_err.message()
            ))
        }
        sqlx::Error::PoolTimedOut => LedgerError::data_source(format!(
            "timed out waiting for a ledger connection in {operation}"
        )),
        sqlx::Error::PoolClosed => {
            LedgerError::data_source(format!("ledger connection closed in {operation}"))
        }
        sqlx::Error::Io(e) => LedgerError::data_source(format!("I/O error in {operation}: {e}")),
        other => LedgerError::data_source(format!("sqlx error in {operation}: {other}")),
    }
}
