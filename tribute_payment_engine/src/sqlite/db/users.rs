use log::trace;
use sqlx::SqliteConnection;
use trb_common::Tokens;

use crate::{
    db_types::{BalanceChange, UserRow},
    traits::PaymentStoreError,
};

pub async fn fetch_user_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<UserRow>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(user)
}

/// Creates the user row if it does not exist. Used by test fixtures and provisioning; the payment
/// flow itself never creates users.
pub async fn upsert_user(id: i64, chat_id: i64, conn: &mut SqliteConnection) -> Result<UserRow, PaymentStoreError> {
    let user = sqlx::query_as(
        r#"
        INSERT INTO users (id, chat_id) VALUES ($1, $2)
        ON CONFLICT (id) DO UPDATE SET chat_id = excluded.chat_id, updated_at = CURRENT_TIMESTAMP
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(chat_id)
    .fetch_one(conn)
    .await?;
    Ok(user)
}

/// Adds `amount` to the user's balance and reports the before/after pair.
///
/// The write is additive (`balance = balance + $1`), never an overwrite from a previously read
/// value, so concurrent mutations from other flows are preserved. Callers wrap this in a
/// transaction together with the preceding read so the reported `old_balance` is the value the
/// update actually applied to.
pub async fn credit_balance(
    user_id: i64,
    amount: Tokens,
    conn: &mut SqliteConnection,
) -> Result<Option<BalanceChange>, PaymentStoreError> {
    let Some(user) = fetch_user_by_id(user_id, conn).await? else {
        return Ok(None);
    };
    let (new_balance,): (Tokens,) = sqlx::query_as(
        "UPDATE users SET balance = balance + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING balance",
    )
    .bind(amount)
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Credited {amount} to user #{user_id}. New balance: {new_balance}");
    Ok(Some(BalanceChange { old_balance: user.balance, new_balance }))
}

/// Subtracts `amount` from the user's balance, clamping the result at zero.
pub async fn debit_balance_clamped(
    user_id: i64,
    amount: Tokens,
    conn: &mut SqliteConnection,
) -> Result<Option<BalanceChange>, PaymentStoreError> {
    let Some(user) = fetch_user_by_id(user_id, conn).await? else {
        return Ok(None);
    };
    let (new_balance,): (Tokens,) = sqlx::query_as(
        "UPDATE users SET balance = MAX(0, balance - $1), updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING \
         balance",
    )
    .bind(amount)
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Debited up to {amount} from user #{user_id}. New balance: {new_balance}");
    Ok(Some(BalanceChange { old_balance: user.balance, new_balance }))
}
