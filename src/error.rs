use std::fmt::Display;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Client,
    Project,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Client => write!(f, "Client"),
            EntityKind::Project => write!(f, "Project"),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Project references unknown client: {0}")]
    UnknownClient(String),

    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

impl StoreError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
