//! Append-only audit trail of expense actions.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::approval::types::Action;

/// What happened to an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    /// Expense submitted.
    Created,
    /// An approver approved.
    Approve,
    /// An approver rejected.
    Reject,
}

impl AuditAction {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
        }
    }

    /// Parses the stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(Self::Created),
            "APPROVE" => Some(Self::Approve),
            "REJECT" => Some(Self::Reject),
            _ => None,
        }
    }
}

impl From<Action> for AuditAction {
    fn from(action: Action) -> Self {
        match action {
            Action::Approve => Self::Approve,
            Action::Reject => Self::Reject,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// The expense acted on.
    pub expense_id: Uuid,
    /// Who acted.
    pub actor_id: Uuid,
    /// What they did.
    pub action: AuditAction,
    /// Comment or default description.
    pub details: String,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Entry for a submitted expense.
    #[must_use]
    pub fn created(expense_id: Uuid, actor_id: Uuid, category: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            expense_id,
            actor_id,
            action: AuditAction::Created,
            details: format!("Expense created for {category}"),
            timestamp,
        }
    }

    /// Entry for an approver decision; the comment wins over the default text.
    #[must_use]
    pub fn decision(
        expense_id: Uuid,
        actor_id: Uuid,
        action: Action,
        comment: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let details = comment
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map_or_else(
                || match action {
                    Action::Approve => "Expense approved".to_string(),
                    Action::Reject => "Expense rejected".to_string(),
                },
                ToString::to_string,
            );
        Self {
            expense_id,
            actor_id,
            action: action.into(),
            details,
            timestamp,
        }
    }
}

/// Destination for audit entries.
///
/// Recording is fire-and-forget: a failing sink must never undo or fail the
/// action it describes. Callers record only after their changes are durable.
pub trait AuditSink: Send + Sync {
    /// Records one entry.
    fn record(&self, entry: AuditEntry);
}

/// Audit sink that keeps entries in memory, grouped by expense.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    entries: Arc<DashMap<Uuid, Vec<AuditEntry>>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries of one expense, oldest first.
    #[must_use]
    pub fn entries_for(&self, expense_id: Uuid) -> Vec<AuditEntry> {
        self.entries
            .get(&expense_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: AuditEntry) {
        self.entries.entry(entry.expense_id).or_default().push(entry);
    }
}
