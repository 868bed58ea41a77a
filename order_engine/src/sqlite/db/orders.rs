use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderId},
    helpers::db_now,
    traits::OrderStoreError,
};

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut tx` as the connection argument.
///
/// The order id and all timestamps are assigned here. The stored order is returned.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderStoreError> {
    let order = order.into_order(OrderId::random(), db_now());
    sqlx::query(
        r#"
            INSERT INTO orders (
                id,
                customer_id,
                product_id,
                quantity,
                total_price,
                status,
                order_time,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9);
        "#,
    )
    .bind(&order.id)
    .bind(&order.customer_id)
    .bind(&order.product_id)
    .bind(order.quantity)
    .bind(order.total_price)
    .bind(order.status.to_string())
    .bind(order.order_time)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(conn)
    .await?;
    debug!("🗃️ Order {} for customer {} has been saved in the DB", order.id, order.customer_id);
    Ok(order)
}

pub async fn fetch_order_by_id(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, OrderStoreError> {
    let order = sqlx::query_as(
        r#"
            SELECT
                id,
                customer_id,
                product_id,
                quantity,
                total_price,
                status,
                order_time,
                created_at,
                updated_at
            FROM orders WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ Fetched order {id}: {order:?}");
    Ok(order)
}

pub async fn count_orders(conn: &mut SqliteConnection) -> Result<i64, OrderStoreError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(conn).await?;
    Ok(count)
}
