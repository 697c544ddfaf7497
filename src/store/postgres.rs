// src/store/postgres.rs

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use super::{Collection, Condition, DocumentStore, Filter, StoreError};

/// PostgreSQL adapter: every collection lives in one JSONB `documents` table.
///
/// Uniqueness rules are partial unique indexes (see `migrations/`), so a
/// violated constraint surfaces as `StoreError::Conflict`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

fn map_write_error(err: sqlx::Error, collection: Collection) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("duplicate key in {}", collection))
        }
        _ => {
            tracing::error!("Write to {} failed: {:?}", collection, err);
            StoreError::from(err)
        }
    }
}

fn select_query<'a>(collection: Collection, filter: &'a Filter) -> QueryBuilder<'a, Postgres> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT body FROM documents WHERE collection = ");
    builder.push_bind(collection.as_str());

    for condition in &filter.conditions {
        match condition {
            Condition::Eq(field, value) => {
                builder.push(" AND body -> ");
                builder.push_bind(field.as_str());
                builder.push(" = ");
                builder.push_bind(Json(value));
            }
            Condition::In(_, values) if values.is_empty() => {
                builder.push(" AND FALSE");
            }
            Condition::In(field, values) => {
                builder.push(" AND body -> ");
                builder.push_bind(field.as_str());
                builder.push(" IN (");
                let mut separated = builder.separated(", ");
                for value in values {
                    separated.push_bind(Json(value));
                }
                separated.push_unseparated(")");
            }
        }
    }

    builder.push(" ORDER BY seq");
    builder
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert(&self, collection: Collection, id: &str, doc: Value) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection.as_str())
            .bind(id)
            .bind(Json(doc))
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, collection))?;
        Ok(())
    }

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Value>, StoreError> {
        let mut builder = select_query(collection, filter);
        builder.push(" LIMIT 1");
        let row: Option<Json<Value>> = builder
            .build_query_scalar()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(doc)| doc))
    }

    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let mut builder = select_query(collection, filter);
        let rows: Vec<Json<Value>> = builder
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|Json(doc)| doc).collect())
    }

    async fn replace(&self, collection: Collection, id: &str, doc: Value) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE documents SET body = $1 WHERE collection = $2 AND id = $3")
            .bind(Json(doc))
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, collection))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
