//! User repository for database operations.
//!
//! Also serves as the Postgres-backed [`UserDirectory`] that expense
//! submission uses to resolve the submitter and their manager.

use std::collections::HashSet;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QuerySelect, Set,
};
use uuid::Uuid;

use claimflow_core::approval::{ApprovalError, UserDirectory};

use crate::entities::{sea_orm_active_enums::UserRole, users};

use super::convert::db_error;

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    /// Company the user belongs to.
    pub company_id: Uuid,
    /// Login email.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Company role.
    pub role: UserRole,
    /// Direct manager, if any.
    pub manager_id: Option<Uuid>,
}

/// User repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find_by_id(id).one(&self.db).await
    }

    /// Creates a new user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(&self, input: CreateUserInput) -> Result<users::Model, DbErr> {
        let now = chrono::Utc::now().into();
        let user = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(input.company_id),
            email: Set(input.email),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            role: Set(input.role),
            manager_id: Set(input.manager_id),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        user.insert(&self.db).await
    }

    /// Returns the subset of `user_ids` that belong to the company.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn members_among(
        &self,
        company_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, DbErr> {
        members_among(&self.db, company_id, user_ids).await
    }
}

/// Membership lookup usable inside a transaction.
pub(crate) async fn members_among<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    user_ids: &[Uuid],
) -> Result<HashSet<Uuid>, DbErr> {
    if user_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let ids: Vec<Uuid> = users::Entity::find()
        .select_only()
        .column(users::Column::Id)
        .filter(users::Column::CompanyId.eq(company_id))
        .filter(users::Column::Id.is_in(user_ids.iter().copied()))
        .into_tuple()
        .all(conn)
        .await?;

    Ok(ids.into_iter().collect())
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn manager_of(&self, employee_id: Uuid) -> Result<Option<Uuid>, ApprovalError> {
        let user = self.find_by_id(employee_id).await.map_err(db_error)?;
        Ok(user.and_then(|u| u.manager_id))
    }

    async fn is_company_member(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<bool, ApprovalError> {
        let count = users::Entity::find_by_id(user_id)
            .filter(users::Column::CompanyId.eq(company_id))
            .count(&self.db)
            .await
            .map_err(db_error)?;
        Ok(count > 0)
    }
}
