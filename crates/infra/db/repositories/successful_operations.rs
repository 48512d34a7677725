use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::successful_operations},
};
use domain::{
    entities::successful_operations::{
        InsertSuccessfulOperationEntity, SuccessfulOperationEntity,
    },
    repositories::successful_operations::SuccessfulOperationRepository,
};

pub struct SuccessfulOperationPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SuccessfulOperationPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SuccessfulOperationRepository for SuccessfulOperationPostgres {
    async fn record_operation(&self, operation: InsertSuccessfulOperationEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let operation_id = insert_into(successful_operations::table)
            .values(&operation)
            .returning(successful_operations::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(operation_id)
    }

    async fn list_recent_by_email(
        &self,
        email: &str,
        limit: i64,
    ) -> Result<Vec<SuccessfulOperationEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = successful_operations::table
            .filter(successful_operations::email.eq(email))
            .order(successful_operations::created_at.desc())
            .limit(limit)
            .select(SuccessfulOperationEntity::as_select())
            .load::<SuccessfulOperationEntity>(&mut conn)?;

        Ok(results)
    }
}
