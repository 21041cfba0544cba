use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderId},
    traits::PaymentStoreError,
};

/// Inserts the shadow order into the database, returning `false` in the second element if an
/// order with this uuid already exists.
pub async fn idempotent_insert(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<(Order, bool), PaymentStoreError> {
    let inserted = match fetch_order_by_uuid(&order.uuid, conn).await? {
        Some(order) => (order, false),
        None => {
            let order = insert_order(order, conn).await?;
            debug!("🗃️ Shadow order {} inserted for user #{}", order.uuid, order.user_id);
            (order, true)
        },
    };
    Ok(inserted)
}

async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, PaymentStoreError> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                uuid,
                user_id,
                amount,
                currency,
                tokens,
                payment_url,
                email
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(order.uuid)
    .bind(order.user_id)
    .bind(order.amount)
    .bind(order.currency)
    .bind(order.tokens)
    .bind(order.payment_url)
    .bind(order.email)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

/// Returns the shadow order for the corresponding processor `uuid`, if it exists.
pub async fn fetch_order_by_uuid(
    uuid: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE uuid = $1").bind(uuid.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// The conditional `Pending -> Paid` claim. The `WHERE status = 'Pending'` clause makes the
/// idempotency check and the status flip a single atomic write; an empty result means another
/// caller (webhook or status poll) already claimed this order.
pub async fn claim_pending_order(
    uuid: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, PaymentStoreError> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders
        SET status = 'Paid', paid_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
        WHERE uuid = $1 AND status = 'Pending'
        RETURNING *
        "#,
    )
    .bind(uuid.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// The conditional `Pending -> Failed` transition. Orders that already reached a terminal state
/// are left untouched and `None` is returned.
pub async fn mark_order_failed(
    uuid: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, PaymentStoreError> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders
        SET status = 'Failed', updated_at = CURRENT_TIMESTAMP
        WHERE uuid = $1 AND status = 'Pending'
        RETURNING *
        "#,
    )
    .bind(uuid.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// The conditional `Paid -> Refunded` claim. Doubles as the duplicate-refund guard: a redelivered
/// refund event finds the order already `Refunded` and loses the claim.
pub async fn claim_paid_order(
    uuid: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, PaymentStoreError> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders
        SET status = 'Refunded', refunded_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
        WHERE uuid = $1 AND status = 'Paid'
        RETURNING *
        "#,
    )
    .bind(uuid.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
