use sqlx::SqliteConnection;

use crate::{
    db_types::{GenerationRecord, NewGeneration},
    traits::PaymentStoreError,
};

pub async fn insert_generation(
    gen: NewGeneration,
    conn: &mut SqliteConnection,
) -> Result<GenerationRecord, PaymentStoreError> {
    let record = sqlx::query_as(
        "INSERT INTO generations (id, user_id, cost) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(gen.id)
    .bind(gen.user_id)
    .bind(gen.cost)
    .fetch_one(conn)
    .await?;
    Ok(record)
}

pub async fn fetch_generation(
    id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<GenerationRecord>, sqlx::Error> {
    let record = sqlx::query_as("SELECT * FROM generations WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(record)
}

/// The one-shot refund flag flip. The `WHERE refunded = 0` clause makes checking and setting the
/// flag a single atomic write; a `None` result means the generation was already refunded (or
/// never existed, which callers disambiguate with [`fetch_generation`]).
pub async fn try_claim_refund_flag(
    id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<GenerationRecord>, PaymentStoreError> {
    let record = sqlx::query_as(
        "UPDATE generations SET refunded = 1 WHERE id = $1 AND refunded = 0 RETURNING *",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(record)
}
