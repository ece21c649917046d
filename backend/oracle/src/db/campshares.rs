//! CampShare ledger rows.

use sqlx::SqlitePool;

use crate::errors::{OracleError, Result};
use crate::models::{CampShare, NewCampShare};

const COLUMNS: &str = "cs_id, contract_address, cs_time, cs_type, user_id, amount, \
                       balance_movement, unstake_complete_date, parameters";

/// Append a provisional row. The id is `MAX(cs_id) + 1` (1 for an empty
/// table), computed in the same statement as the insert.
pub async fn insert_campshare(pool: &SqlitePool, row: &NewCampShare) -> Result<CampShare> {
    let sql = format!(
        "INSERT INTO campshares \
             (cs_id, contract_address, cs_time, cs_type, user_id, amount, \
              balance_movement, unstake_complete_date, parameters) \
         SELECT COALESCE(MAX(cs_id), 0) + 1, '', ?1, ?2, ?3, ?4, 0, ?5, '{{}}' FROM campshares \
         RETURNING {COLUMNS}"
    );
    let inserted = sqlx::query_as::<_, CampShare>(&sql)
        .bind(row.cs_time)
        .bind(row.cs_type)
        .bind(row.user_id)
        .bind(row.amount)
        .bind(row.unstake_complete_date)
        .fetch_one(pool)
        .await?;
    Ok(inserted)
}

pub async fn get_campshare(pool: &SqlitePool, cs_id: i64) -> Result<CampShare> {
    let sql = format!("SELECT {COLUMNS} FROM campshares WHERE cs_id = ?1");
    sqlx::query_as::<_, CampShare>(&sql)
        .bind(cs_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| OracleError::NotFound(format!("campshare {cs_id}")))
}

pub async fn campshares_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<CampShare>> {
    let sql = format!("SELECT {COLUMNS} FROM campshares WHERE user_id = ?1 ORDER BY cs_id ASC");
    let rows = sqlx::query_as::<_, CampShare>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Sum of `balance_movement` over every row of the user.
pub async fn user_balance(pool: &SqlitePool, user_id: i64) -> Result<i64> {
    let balance: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(balance_movement), 0) FROM campshares WHERE user_id = ?1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(balance)
}

/// Record the amount the Relayer confirmed for a provisional row.
pub async fn confirm_amount(
    pool: &SqlitePool,
    cs_id: i64,
    amount: i64,
    balance_movement: i64,
    contract_address: Option<&str>,
) -> Result<()> {
    let rows = sqlx::query(
        r#"
        UPDATE campshares
        SET    amount = ?1,
               balance_movement = ?2,
               contract_address = COALESCE(?3, contract_address)
        WHERE  cs_id = ?4
        "#,
    )
    .bind(amount)
    .bind(balance_movement)
    .bind(contract_address)
    .bind(cs_id)
    .execute(pool)
    .await?
    .rows_affected();

    if rows == 0 {
        return Err(OracleError::NotFound(format!("campshare {cs_id}")));
    }
    Ok(())
}
