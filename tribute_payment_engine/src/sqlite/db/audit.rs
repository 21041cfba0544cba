use sqlx::SqliteConnection;

use crate::{
    db_types::{AuditEntry, NewAuditEntry},
    traits::PaymentStoreError,
};

/// Appends one row to the balance ledger. There is deliberately no update or delete counterpart
/// in this module.
pub async fn insert_audit_entry(
    entry: NewAuditEntry,
    conn: &mut SqliteConnection,
) -> Result<AuditEntry, PaymentStoreError> {
    let change = entry.new_balance - entry.old_balance;
    let metadata = entry.metadata.as_ref().map(ToString::to_string);
    let row = sqlx::query_as(
        r#"
            INSERT INTO balance_audit (
                user_id,
                old_balance,
                new_balance,
                change_amount,
                reason,
                reference_id,
                metadata
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(entry.user_id)
    .bind(entry.old_balance)
    .bind(entry.new_balance)
    .bind(change)
    .bind(entry.reason)
    .bind(entry.reference_id)
    .bind(metadata)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Ledger rows for one user, newest first. Forensic queries only.
pub async fn fetch_entries_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<AuditEntry>, PaymentStoreError> {
    let rows = sqlx::query_as("SELECT * FROM balance_audit WHERE user_id = $1 ORDER BY id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}
