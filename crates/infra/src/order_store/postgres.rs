//! Postgres-backed order store.
//!
//! Ids come from a `BIGSERIAL` column, so identity assignment and the insert
//! happen in one statement (`INSERT ... RETURNING`). Listing compiles
//! [`QueryParameters`] to SQL with bound parameters; no user text is ever
//! spliced into the statement.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | `fetch_optional` returned no row | `NotFound` |
//! | anything else (pool closed, network, constraint) | `Storage` |

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;

use orders_core::query::{Direction, Filter, FilterOp, FilterValue, Operand};
use orders_core::{NewOrder, Order, OrderId, QueryParameters};

use super::{OrderStore, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id          BIGSERIAL PRIMARY KEY,
    customer_id BIGINT NOT NULL,
    title       TEXT,
    description TEXT
)
"#;

#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the `orders` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    tracing::warn!(operation, error = %err, "order store query failed");
    StoreError::Storage(format!("{operation}: {err}"))
}

fn order_from_row(row: &PgRow) -> Result<Order, sqlx::Error> {
    Ok(Order {
        id: OrderId::new(row.try_get::<i64, _>("id")?),
        customer_id: row.try_get("customer_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
    })
}

fn push_value(qb: &mut QueryBuilder<'static, Postgres>, value: &FilterValue) {
    match value {
        FilterValue::Int(v) => qb.push_bind(*v),
        FilterValue::Text(s) => qb.push_bind(s.clone()),
    };
}

fn push_filter(qb: &mut QueryBuilder<'static, Postgres>, filter: &Filter) {
    let column = filter.field.column();

    match (&filter.operand, filter.op) {
        (_, FilterOp::IsNull) => {
            qb.push(column).push(" IS NULL");
        }
        (_, FilterOp::IsNotNull) => {
            qb.push(column).push(" IS NOT NULL");
        }
        (Operand::One(value), FilterOp::EqIc | FilterOp::NeqIc) => {
            let cmp = if filter.op == FilterOp::EqIc { " = " } else { " <> " };
            qb.push("LOWER(").push(column).push(")").push(cmp).push("LOWER(");
            push_value(qb, value);
            qb.push(")");
        }
        (Operand::One(value), op) => {
            let cmp = match op {
                FilterOp::Eq => " = ",
                FilterOp::Neq => " <> ",
                FilterOp::Like => " LIKE ",
                FilterOp::LikeIc => " ILIKE ",
                FilterOp::Gt => " > ",
                FilterOp::Gte => " >= ",
                FilterOp::Lt => " < ",
                FilterOp::Lte => " <= ",
                _ => " = ",
            };
            qb.push(column).push(cmp);
            push_value(qb, value);
        }
        // Postgres rejects `IN ()`; an empty list is a constant.
        (Operand::Many(values), FilterOp::In) if values.is_empty() => {
            qb.push("FALSE");
        }
        (Operand::Many(values), FilterOp::Nin) if values.is_empty() => {
            qb.push(column).push(" IS NOT NULL");
        }
        (Operand::Many(values), op) => {
            let keyword = if op == FilterOp::Nin { " NOT IN (" } else { " IN (" };
            qb.push(column).push(keyword);
            let mut list = qb.separated(", ");
            for value in values {
                match value {
                    FilterValue::Int(v) => list.push_bind(*v),
                    FilterValue::Text(s) => list.push_bind(s.clone()),
                };
            }
            list.push_unseparated(")");
        }
        (Operand::None, _) => {
            qb.push("FALSE");
        }
    }
}

/// Compile a listing query. Matches the ordering of [`QueryParameters::apply`].
fn build_list_query(query: &QueryParameters) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT id, customer_id, title, description FROM orders");

    for (i, filter) in query.filters.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        push_filter(&mut qb, filter);
    }

    qb.push(" ORDER BY ");
    for sort in &query.order {
        qb.push(sort.field.column());
        qb.push(match sort.direction {
            Direction::Asc => " ASC NULLS FIRST, ",
            Direction::Desc => " DESC NULLS LAST, ",
        });
    }
    qb.push("id ASC");

    if let Some(limit) = query.limit {
        qb.push(" LIMIT ").push_bind(i64::from(limit));
    }
    if let Some(offset) = query.offset {
        qb.push(" OFFSET ").push_bind(i64::from(offset));
    }

    qb
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[instrument(skip_all, fields(filters = query.filters.len()), err)]
    async fn list(&self, query: &QueryParameters) -> Result<Vec<Order>, StoreError> {
        let mut qb = build_list_query(query);
        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;

        rows.iter()
            .map(order_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_order", e))
    }

    #[instrument(skip(self, id), fields(order_id = %id))]
    async fn get(&self, id: OrderId) -> Result<Order, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, title, description
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order", e))?;

        match row {
            Some(row) => order_from_row(&row).map_err(|e| map_sqlx_error("decode_order", e)),
            None => Err(StoreError::NotFound(id)),
        }
    }

    #[instrument(skip_all, fields(customer_id = order.customer_id), err)]
    async fn create(&self, order: NewOrder) -> Result<Order, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO orders (customer_id, title, description)
            VALUES ($1, $2, $3)
            RETURNING id, customer_id, title, description
            "#,
        )
        .bind(order.customer_id)
        .bind(order.title)
        .bind(order.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_order", e))?;

        order_from_row(&row).map_err(|e| map_sqlx_error("decode_order", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_for(pairs: &[(&str, &str)]) -> String {
        let q = QueryParameters::from_pairs(pairs.iter().copied()).unwrap();
        build_list_query(&q).sql().to_string()
    }

    #[test]
    fn empty_query_orders_by_id() {
        assert_eq!(
            sql_for(&[]),
            "SELECT id, customer_id, title, description FROM orders ORDER BY id ASC"
        );
    }

    #[test]
    fn filters_are_bound_not_spliced() {
        let sql = sql_for(&[("where", "customerId:EQ:7 title:LIKEIC:'%drop table%'")]);
        assert_eq!(
            sql,
            "SELECT id, customer_id, title, description FROM orders \
             WHERE customer_id = $1 AND title ILIKE $2 ORDER BY id ASC"
        );
    }

    #[test]
    fn list_operands_and_pagination() {
        let sql = sql_for(&[
            ("where", "id:IN:[1,2,3] title:ISNULL"),
            ("order", "customerId DESC"),
            ("limit", "10"),
            ("offset", "20"),
        ]);
        assert_eq!(
            sql,
            "SELECT id, customer_id, title, description FROM orders \
             WHERE id IN ($1, $2, $3) AND title IS NULL \
             ORDER BY customer_id DESC NULLS LAST, id ASC LIMIT $4 OFFSET $5"
        );
    }

    #[test]
    fn case_insensitive_equality_lowers_both_sides() {
        let sql = sql_for(&[("where", "title:EQIC:Laptop")]);
        assert!(sql.contains("WHERE LOWER(title) = LOWER($1)"));
    }

    #[test]
    fn empty_in_list_is_constant() {
        let sql = sql_for(&[("where", "customerId:IN:[]")]);
        assert!(sql.contains("WHERE FALSE"));
    }
}
