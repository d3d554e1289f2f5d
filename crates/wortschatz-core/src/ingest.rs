//! Document ingestion: raw text → annotation → complexity score → one
//! transactional write of the document, new vocabulary and relations.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::{
  Error, Result,
  annotate::{Annotation, Annotator},
  document::{Document, NewDocument, TokenPayload, complexity_score},
  store::LearningStore,
  vocabulary::Signature,
};

/// Title used when the caller supplies none (or a blank one).
pub const DEFAULT_TITLE: &str = "Texto em alemão";

/// Retain word tokens only, normalise their lemmas and pair each with its
/// stream position. Tokens whose lemma is blank after trimming are dropped.
pub fn token_payloads(annotation: &Annotation) -> Vec<TokenPayload> {
  annotation
    .word_tokens()
    .filter_map(|tok| {
      let lemma = tok.lemma.trim().to_lowercase();
      if lemma.is_empty() {
        return None;
      }
      Some(TokenPayload {
        signature: Signature { lemma, pos: tok.pos, gender: tok.gender },
        position:  tok.position,
        case:      tok.case,
      })
    })
    .collect()
}

/// The distinct signatures among `payloads`, in a stable order.
pub fn distinct_signatures(payloads: &[TokenPayload]) -> BTreeSet<Signature> {
  payloads.iter().map(|p| p.signature.clone()).collect()
}

/// Ingest `raw_text` and return the persisted document.
///
/// Fails with [`Error::EmptyInput`] for blank text before anything else
/// happens, [`Error::Ingestion`] if the annotator fails, and
/// [`Error::Persistence`] if the transactional write fails (in which case
/// nothing was written).
pub async fn ingest<S, A>(
  store: &S,
  annotator: &A,
  owner: Option<i64>,
  raw_text: &str,
  title: Option<&str>,
) -> Result<Document>
where
  S: LearningStore,
  A: Annotator,
{
  let raw_text = raw_text.trim();
  if raw_text.is_empty() {
    return Err(Error::EmptyInput);
  }
  let title = title
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .unwrap_or(DEFAULT_TITLE);

  let annotation = annotator.annotate(raw_text).await.map_err(Error::Ingestion)?;
  let score = complexity_score(&annotation);
  let payloads = token_payloads(&annotation);
  debug!(
    tokens = annotation.tokens.len(),
    words = payloads.len(),
    signatures = distinct_signatures(&payloads).len(),
    "annotated document"
  );

  let relation_count = payloads.len();
  let document = store
    .persist_document(
      NewDocument {
        title: title.to_owned(),
        raw_text: raw_text.to_owned(),
        complexity_score: score,
        owner,
      },
      payloads,
    )
    .await
    .map_err(Error::persistence)?;

  info!(
    document_id = document.id,
    complexity = document.complexity_score,
    relations = relation_count,
    "ingested document"
  );
  Ok(document)
}
