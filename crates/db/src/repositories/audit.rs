//! Audit log repository and the Postgres audit sink.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use tracing::warn;
use uuid::Uuid;

use claimflow_core::approval::{AuditEntry, AuditSink};

use crate::entities::audit_logs;

/// Append-only access to `audit_logs`.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    db: DatabaseConnection,
}

impl AuditLogRepository {
    /// Creates a new audit log repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn append(&self, entry: &AuditEntry) -> Result<audit_logs::Model, DbErr> {
        audit_logs::ActiveModel {
            id: Set(Uuid::new_v4()),
            expense_id: Set(entry.expense_id),
            user_id: Set(entry.actor_id),
            action: Set(entry.action.as_str().to_string()),
            details: Set(entry.details.clone()),
            created_at: Set(entry.timestamp.into()),
        }
        .insert(&self.db)
        .await
    }

    /// Audit trail of one expense, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_expense(&self, expense_id: Uuid) -> Result<Vec<audit_logs::Model>, DbErr> {
        audit_logs::Entity::find()
            .filter(audit_logs::Column::ExpenseId.eq(expense_id))
            .order_by_asc(audit_logs::Column::CreatedAt)
            .all(&self.db)
            .await
    }
}

/// Audit sink writing to Postgres in the background.
///
/// Each entry is inserted on a spawned task; failures are logged and dropped.
#[derive(Debug, Clone)]
pub struct DbAuditSink {
    repo: AuditLogRepository,
}

impl DbAuditSink {
    /// Creates a sink over the given connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self {
            repo: AuditLogRepository::new(db),
        }
    }
}

impl AuditSink for DbAuditSink {
    fn record(&self, entry: AuditEntry) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(
                expense_id = %entry.expense_id,
                action = entry.action.as_str(),
                "No runtime available, audit entry dropped"
            );
            return;
        };

        let repo = self.repo.clone();
        handle.spawn(async move {
            if let Err(e) = repo.append(&entry).await {
                warn!(
                    expense_id = %entry.expense_id,
                    action = entry.action.as_str(),
                    error = %e,
                    "Failed to write audit entry"
                );
            }
        });
    }
}
