//! Domain error taxonomy shared by the lot, vehicle, report and analytics
//! services.
//!
//! Display strings are user-facing (pt-BR) for every variant except
//! `BackendUnavailable` and `Export`, whose details stay server-side.

use thiserror::Error;

use garagem_core::{Email, Plate};

use crate::db::RepositoryError;
use crate::export::ExportError;

/// Errors returned by the domain services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input rejected before touching the store.
    #[error("{0}")]
    ValidationFailure(String),

    /// The lot already has an open record for this plate.
    #[error("Este veículo ({0}) já está neste estacionamento!")]
    DuplicateEntry(Plate),

    /// An owner tried to share a lot with themselves.
    #[error("Não é possível compartilhar com o proprietário do estacionamento")]
    SelfShareRejected,

    /// No account exists for the email a lot was shared with.
    #[error("Usuário não encontrado. O email informado ({0}) precisa ter uma conta no sistema.")]
    UnknownUser(Email),

    /// The email is already on the lot's share list.
    #[error("Este estacionamento já está compartilhado com {0}")]
    AlreadyShared(Email),

    /// The named entity (e.g. `"Veículo"`) does not exist.
    #[error("{0} não encontrado")]
    NotFound(&'static str),

    /// The caller may not perform the action; carries the reason.
    #[error("{0}")]
    Forbidden(&'static str),

    /// The record store failed.
    #[error("Serviço indisponível: {0}")]
    BackendUnavailable(#[from] RepositoryError),

    /// A report renderer failed.
    #[error("Erro ao gerar relatório: {0}")]
    Export(#[from] ExportError),
}

impl ServiceError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailure(message.into())
    }
}
