//! `Transaction`: one queued row mutation.

use chrono::{DateTime, Utc};

use crate::layout::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Inserted,
    Updated,
    Replaced,
    Deleted,
}

/// A tagged record of a row mutation destined for a backing table. `Delete`
/// carries no row payload — only the id is needed to apply it.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub kind: TransactionKind,
    pub id: i64,
    pub row: Option<Row>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn inserted(id: i64, row: Row) -> Self {
        Self {
            kind: TransactionKind::Inserted,
            id,
            row: Some(row),
            created_at: Utc::now(),
        }
    }

    pub fn updated(id: i64, row: Row) -> Self {
        Self {
            kind: TransactionKind::Updated,
            id,
            row: Some(row),
            created_at: Utc::now(),
        }
    }

    pub fn replaced(id: i64, row: Row) -> Self {
        Self {
            kind: TransactionKind::Replaced,
            id,
            row: Some(row),
            created_at: Utc::now(),
        }
    }

    pub fn deleted(id: i64) -> Self {
        Self {
            kind: TransactionKind::Deleted,
            id,
            row: None,
            created_at: Utc::now(),
        }
    }
}
