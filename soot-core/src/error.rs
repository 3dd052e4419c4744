//! Error types for the Soot household manager.
//!
//! Messages are user-facing and written in French, since they travel
//! unchanged to the JSON error body.

use thiserror::Error;

/// Message shown when a budget query hits a table that has not been created yet.
pub const BUDGET_NOT_MIGRATED_MESSAGE: &str = "Le module budget n'est pas encore disponible : \
     la base de données doit être mise à jour. Exécutez `soot migrate` puis réessayez.";

/// Errors that can occur in Soot operations.
#[derive(Error, Debug)]
pub enum SootError {
    #[error("{0}")]
    Validation(String),

    #[error("Authentification requise")]
    Unauthorized,

    #[error("Accès refusé")]
    AccessDenied,

    #[error("{0} introuvable")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{}", BUDGET_NOT_MIGRATED_MESSAGE)]
    BudgetNotMigrated,

    #[error("Une génération d'image est déjà en cours pour cet élément")]
    JobInProgress,

    #[error("Erreur de configuration : {0}")]
    Config(String),

    #[error("Règle de récurrence invalide : {0}")]
    Recurrence(String),

    #[error("Erreur d'entrée/sortie : {0}")]
    Io(#[from] std::io::Error),
}

impl SootError {
    pub fn validation(message: impl Into<String>) -> Self {
        SootError::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        SootError::NotFound(what.into())
    }
}

/// Result type alias for Soot operations.
pub type SootResult<T> = Result<T, SootError>;
