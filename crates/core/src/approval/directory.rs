//! User directory collaborator.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::approval::error::ApprovalError;

/// Lookup of company membership and reporting lines.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Direct manager of an employee, if any.
    async fn manager_of(&self, employee_id: Uuid) -> Result<Option<Uuid>, ApprovalError>;

    /// Whether the user belongs to the company.
    async fn is_company_member(&self, user_id: Uuid, company_id: Uuid)
    -> Result<bool, ApprovalError>;
}

#[derive(Debug, Clone, Copy)]
struct DirectoryEntry {
    company_id: Uuid,
    manager_id: Option<Uuid>,
}

/// Directory held in memory.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    users: DashMap<Uuid, DirectoryEntry>,
}

impl MemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub fn add_user(&self, user_id: Uuid, company_id: Uuid, manager_id: Option<Uuid>) {
        self.users.insert(
            user_id,
            DirectoryEntry {
                company_id,
                manager_id,
            },
        );
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn manager_of(&self, employee_id: Uuid) -> Result<Option<Uuid>, ApprovalError> {
        Ok(self.users.get(&employee_id).and_then(|u| u.manager_id))
    }

    async fn is_company_member(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<bool, ApprovalError> {
        Ok(self
            .users
            .get(&user_id)
            .is_some_and(|u| u.company_id == company_id))
    }
}
