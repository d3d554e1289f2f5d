//! Error types for `wortschatz-core`.

use thiserror::Error;

use crate::{annotate::AnnotateError, generate::GenerationError};

#[derive(Debug, Error)]
pub enum Error {
  #[error("text must not be blank")]
  EmptyInput,

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("score must be one of 1, 2, 3 or 4 (got {0})")]
  InvalidScore(i64),

  #[error("document not found: {0}")]
  DocumentNotFound(i64),

  /// Either the card does not exist or it belongs to another user.
  #[error("review card not found: {0}")]
  KnowledgeNotFound(i64),

  #[error("ingestion failed: {0}")]
  Ingestion(#[source] AnnotateError),

  #[error("persistence error: {0}")]
  Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("generation failed: {0}")]
  Generation(#[from] GenerationError),
}

/// Coarse classification of an [`Error`], used by outer layers to pick a
/// response without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Input,
  NotFound,
  Persistence,
  Generation,
}

impl Error {
  /// Wrap a storage backend error.
  pub fn persistence<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Persistence(Box::new(e))
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::EmptyInput | Self::InvalidInput(_) | Self::InvalidScore(_) => {
        ErrorKind::Input
      }
      Self::DocumentNotFound(_) | Self::KnowledgeNotFound(_) => {
        ErrorKind::NotFound
      }
      Self::Persistence(_) => ErrorKind::Persistence,
      // An unavailable annotator is an external-collaborator failure, same
      // as the generator.
      Self::Generation(_) | Self::Ingestion(_) => ErrorKind::Generation,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kinds_follow_taxonomy() {
    assert_eq!(Error::EmptyInput.kind(), ErrorKind::Input);
    assert_eq!(Error::InvalidScore(9).kind(), ErrorKind::Input);
    assert_eq!(Error::DocumentNotFound(1).kind(), ErrorKind::NotFound);
    assert_eq!(Error::KnowledgeNotFound(1).kind(), ErrorKind::NotFound);
    assert_eq!(
      Error::Generation(GenerationError::Timeout).kind(),
      ErrorKind::Generation
    );
    let io = std::io::Error::other("disk full");
    assert_eq!(Error::persistence(io).kind(), ErrorKind::Persistence);
  }
}
