//! Postgres-backed stores.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `ConditionFailed` | Part created twice |
//! | Database (check constraint violation) | `23514` | `TransactionCanceled` (inside `transact`) / `ConditionFailed` | Quantity would go negative |
//! | Database (numeric value out of range) | `22003` | `QuantityOverflow` (inside `transact`) | Quantity past `BIGINT` range |
//! | Database (deadlock / serialization failure) | `40P01` / `40001` | `TransactionCanceled` | Lost a race with a concurrent transaction |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | PoolClosed / Other | N/A | `Backend` | Network errors, connection failures, etc. |
//!
//! ## Atomicity
//!
//! `transact` runs every conditional update inside one SQL transaction. Each
//! update is an `UPDATE ... WHERE quantity >= $guard RETURNING ...`; a missing
//! row or failed guard returns no row, and the SQL transaction is dropped
//! (rolled back) before anything becomes visible.
//!
//! Before any update runs, every touched row is locked with one
//! `SELECT ... ORDER BY code FOR UPDATE`, so concurrent transactions acquire
//! overlapping rows in the same order whatever order their updates are listed in.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;

use partforge_core::PartCode;
use partforge_inventory::{BomEntry, LOW_STOCK_STATE_KEY, LowStockState, Part};

use super::r#trait::{
    AlertStateStore, BomKey, BomStore, DEFAULT_MAX_TRANSACTION_ITEMS, InventoryStore, Precondition,
    StoreError,
};
use super::transaction::{Condition, StockChange, Transaction};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS parts (
        code          TEXT PRIMARY KEY,
        name          TEXT NOT NULL,
        quantity      BIGINT NOT NULL CHECK (quantity >= 0),
        min_quantity  BIGINT NOT NULL CHECK (min_quantity >= 0),
        created_at    TIMESTAMPTZ NOT NULL,
        updated_at    TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bom_entries (
        parent_code       TEXT NOT NULL,
        component_code    TEXT NOT NULL,
        units_per_parent  BIGINT NOT NULL CHECK (units_per_parent > 0),
        PRIMARY KEY (parent_code, component_code)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS alert_state (
        pk          TEXT PRIMARY KEY,
        signature   TEXT NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL
    )
    "#,
];

/// Create the tables used by the Postgres stores if they do not exist yet.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
    }
    Ok(())
}

/// Postgres-backed part store.
#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
    max_transaction_items: usize,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self::with_max_transaction_items(pool, DEFAULT_MAX_TRANSACTION_ITEMS)
    }

    pub fn with_max_transaction_items(pool: PgPool, max_transaction_items: usize) -> Self {
        Self {
            pool: Arc::new(pool),
            max_transaction_items,
        }
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    fn max_transaction_items(&self) -> usize {
        self.max_transaction_items
    }

    #[instrument(skip(self), fields(code = %code), err)]
    async fn get(&self, code: &PartCode) -> Result<Option<Part>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT code, name, quantity, min_quantity, created_at, updated_at
            FROM parts
            WHERE code = $1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_part", e))?;

        row.map(|r| part_from_row(&r)).transpose()
    }

    #[instrument(skip(self, part), fields(code = %part.code), err)]
    async fn put(&self, part: Part, precondition: Precondition) -> Result<(), StoreError> {
        let sql = match precondition {
            Precondition::MustNotExist => {
                r#"
                INSERT INTO parts (code, name, quantity, min_quantity, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#
            }
            Precondition::None => {
                r#"
                INSERT INTO parts (code, name, quantity, min_quantity, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (code) DO UPDATE SET
                    name = EXCLUDED.name,
                    quantity = EXCLUDED.quantity,
                    min_quantity = EXCLUDED.min_quantity,
                    created_at = EXCLUDED.created_at,
                    updated_at = EXCLUDED.updated_at
                "#
            }
        };

        sqlx::query(sql)
            .bind(part.code.as_str())
            .bind(&part.name)
            .bind(part.quantity)
            .bind(part.min_quantity)
            .bind(part.created_at)
            .bind(part.updated_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::ConditionFailed(format!("part {} already exists", part.code))
                } else if is_check_violation(&e) {
                    StoreError::ConditionFailed(format!("negative quantity for part {}", part.code))
                } else {
                    map_sqlx_error("put_part", e)
                }
            })?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn scan(&self) -> Result<Vec<Part>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT code, name, quantity, min_quantity, created_at, updated_at
            FROM parts
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("scan_parts", e))?;

        rows.iter().map(part_from_row).collect()
    }

    #[instrument(skip(self, tx), fields(items = tx.len()), err)]
    async fn transact(&self, tx: Transaction) -> Result<Vec<Part>, StoreError> {
        if tx.len() > self.max_transaction_items {
            return Err(StoreError::TransactionTooLarge {
                limit: self.max_transaction_items,
                actual: tx.len(),
            });
        }
        if tx.is_empty() {
            return Err(StoreError::InvalidTransaction("no updates".to_string()));
        }
        if let Some(code) = tx.duplicate_key() {
            return Err(StoreError::InvalidTransaction(format!(
                "part {code} appears more than once"
            )));
        }

        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            r#"
            SELECT code FROM parts
            WHERE code = ANY($1::text[])
            ORDER BY code
            FOR UPDATE
            "#,
        )
        .bind(lock_order(&tx))
        .fetch_all(&mut *db_tx)
        .await
        .map_err(|e| map_sqlx_error("lock_parts", e))?;

        let now = Utc::now();
        let mut post_images = Vec::with_capacity(tx.len());

        for update in tx.updates() {
            let (mode, amount) = match update.change {
                None => ("keep", 0_i64),
                Some(StockChange::Add(delta)) => ("add", delta),
                Some(StockChange::Set(value)) => ("set", value),
            };
            // Stored quantities are never negative, so `>= 0` only checks existence.
            let guard = match update.condition {
                Condition::Exists => 0_i64,
                Condition::AtLeast(min) => min,
            };

            let row = sqlx::query(
                r#"
                UPDATE parts SET
                    quantity = CASE $2::text
                        WHEN 'add' THEN quantity + $3::bigint
                        WHEN 'set' THEN $3::bigint
                        ELSE quantity
                    END,
                    min_quantity = COALESCE($4::bigint, min_quantity),
                    updated_at = $5
                WHERE code = $1 AND quantity >= $6
                RETURNING code, name, quantity, min_quantity, created_at, updated_at
                "#,
            )
            .bind(update.code.as_str())
            .bind(mode)
            .bind(amount)
            .bind(update.min_quantity)
            .bind(now)
            .bind(guard)
            .fetch_optional(&mut *db_tx)
            .await
            .map_err(|e| {
                if is_check_violation(&e) {
                    StoreError::TransactionCanceled(format!(
                        "part {} would go negative",
                        update.code
                    ))
                } else if is_out_of_range(&e) {
                    StoreError::QuantityOverflow(update.code.to_string())
                } else {
                    map_sqlx_error("transact_update", e)
                }
            })?;

            match row {
                Some(row) => post_images.push(part_from_row(&row)?),
                None => {
                    // Dropping `db_tx` rolls back the updates already applied.
                    return Err(StoreError::TransactionCanceled(format!(
                        "condition {:?} failed for part {}",
                        update.condition, update.code
                    )));
                }
            }
        }

        db_tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(post_images)
    }
}

/// Postgres-backed BOM store.
#[derive(Debug, Clone)]
pub struct PostgresBomStore {
    pool: Arc<PgPool>,
}

impl PostgresBomStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl BomStore for PostgresBomStore {
    #[instrument(skip(self), fields(parent_code = %parent_code), err)]
    async fn query(&self, parent_code: &PartCode) -> Result<Vec<BomEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT parent_code, component_code, units_per_parent
            FROM bom_entries
            WHERE parent_code = $1
            "#,
        )
        .bind(parent_code.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("query_bom", e))?;

        rows.iter()
            .map(|row| {
                Ok(BomEntry {
                    parent_code: code_column(row, "parent_code")?,
                    component_code: code_column(row, "component_code")?,
                    units_per_parent: row
                        .try_get("units_per_parent")
                        .map_err(|e| map_sqlx_error("decode_bom", e))?,
                })
            })
            .collect()
    }

    #[instrument(skip(self, deletes, inserts), fields(deletes = deletes.len(), inserts = inserts.len()), err)]
    async fn batch_write(&self, deletes: Vec<BomKey>, inserts: Vec<BomEntry>) -> Result<(), StoreError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        for key in &deletes {
            sqlx::query("DELETE FROM bom_entries WHERE parent_code = $1 AND component_code = $2")
                .bind(key.parent_code.as_str())
                .bind(key.component_code.as_str())
                .execute(&mut *db_tx)
                .await
                .map_err(|e| map_sqlx_error("delete_bom_entry", e))?;
        }

        for entry in &inserts {
            sqlx::query(
                r#"
                INSERT INTO bom_entries (parent_code, component_code, units_per_parent)
                VALUES ($1, $2, $3)
                ON CONFLICT (parent_code, component_code)
                DO UPDATE SET units_per_parent = EXCLUDED.units_per_parent
                "#,
            )
            .bind(entry.parent_code.as_str())
            .bind(entry.component_code.as_str())
            .bind(entry.units_per_parent)
            .execute(&mut *db_tx)
            .await
            .map_err(|e| map_sqlx_error("insert_bom_entry", e))?;
        }

        db_tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

/// Postgres-backed alert state, stored as a single row keyed by `low_stock`.
#[derive(Debug, Clone)]
pub struct PostgresAlertStateStore {
    pool: Arc<PgPool>,
}

impl PostgresAlertStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl AlertStateStore for PostgresAlertStateStore {
    #[instrument(skip(self), err)]
    async fn get(&self) -> Result<Option<LowStockState>, StoreError> {
        let row = sqlx::query("SELECT signature, updated_at FROM alert_state WHERE pk = $1")
            .bind(LOW_STOCK_STATE_KEY)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_alert_state", e))?;

        row.map(|r| {
            let signature: String = r
                .try_get("signature")
                .map_err(|e| map_sqlx_error("decode_alert_state", e))?;
            let updated_at: DateTime<Utc> = r
                .try_get("updated_at")
                .map_err(|e| map_sqlx_error("decode_alert_state", e))?;
            Ok(LowStockState {
                signature,
                updated_at,
            })
        })
        .transpose()
    }

    #[instrument(skip(self, state), fields(signature = %state.signature), err)]
    async fn compare_and_set(
        &self,
        expected: Option<&str>,
        state: LowStockState,
    ) -> Result<bool, StoreError> {
        let result = match expected {
            None => sqlx::query(
                r#"
                INSERT INTO alert_state (pk, signature, updated_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (pk) DO NOTHING
                "#,
            )
            .bind(LOW_STOCK_STATE_KEY)
            .bind(&state.signature)
            .bind(state.updated_at)
            .execute(&*self.pool)
            .await,
            Some(previous) => sqlx::query(
                r#"
                UPDATE alert_state SET signature = $2, updated_at = $3
                WHERE pk = $1 AND signature = $4
                "#,
            )
            .bind(LOW_STOCK_STATE_KEY)
            .bind(&state.signature)
            .bind(state.updated_at)
            .bind(previous)
            .execute(&*self.pool)
            .await,
        }
        .map_err(|e| map_sqlx_error("compare_and_set_alert_state", e))?;

        Ok(result.rows_affected() == 1)
    }
}

fn part_from_row(row: &sqlx::postgres::PgRow) -> Result<Part, StoreError> {
    let decode = |e| map_sqlx_error("decode_part", e);
    Ok(Part {
        code: code_column(row, "code")?,
        name: row.try_get("name").map_err(decode)?,
        quantity: row.try_get("quantity").map_err(decode)?,
        min_quantity: row.try_get("min_quantity").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

fn code_column(row: &sqlx::postgres::PgRow, column: &str) -> Result<PartCode, StoreError> {
    let raw: String = row
        .try_get(column)
        .map_err(|e| map_sqlx_error("decode_code", e))?;
    PartCode::new(&raw).map_err(|e| StoreError::Backend(format!("stored {column} is invalid: {e}")))
}

/// Codes touched by `tx`, in the order their rows are locked.
fn lock_order(tx: &Transaction) -> Vec<String> {
    let mut codes: Vec<String> = tx.updates().iter().map(|u| u.code.to_string()).collect();
    codes.sort();
    codes
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            classify_sqlstate(db_err.code().as_deref(), msg)
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn classify_sqlstate(code: Option<&str>, msg: String) -> StoreError {
    match code {
        Some("23505") => StoreError::ConditionFailed(msg),
        // deadlock_detected, serialization_failure: Postgres aborted this side of a race.
        Some("40P01") | Some("40001") => StoreError::TransactionCanceled(msg),
        _ => StoreError::Backend(msg),
    }
}

fn db_code_is(err: &sqlx::Error, expected: &str) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == expected;
        }
    }
    false
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    db_code_is(err, "23505")
}

/// Check if an error is a check constraint violation.
fn is_check_violation(err: &sqlx::Error) -> bool {
    db_code_is(err, "23514")
}

/// Check if an error is a numeric out-of-range failure (`BIGINT` overflow).
fn is_out_of_range(err: &sqlx::Error) -> bool {
    db_code_is(err, "22003")
}
