//! Translation evaluation: the learner answers a `desafio` and the
//! generator grades the German attempt.

use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::{
  Error, Result,
  activity::{NewTranslationAttempt, TranslationAttempt},
  generate::{
    ContentGenerator, GenerationError, Prompt, TranslationVerdict, request_json,
  },
  store::LearningStore,
};

/// A learner's answer to a translation challenge.
#[derive(Debug, Clone)]
pub struct TranslationSubmission {
  pub challenge_pt:     String,
  pub attempt_de:       String,
  pub context_original: String,
}

#[derive(Serialize)]
struct EvaluationRequest<'a> {
  desafio_pt:        &'a str,
  tentativa_de:      &'a str,
  contexto_original: &'a str,
  required_keys:     [&'static str; 3],
}

fn evaluation_prompt(
  challenge: &str,
  attempt: &str,
  context: &str,
) -> Result<Prompt, GenerationError> {
  let system = format!(
    "Você é um preceptor médico suíço avaliando a tradução de um residente \
     do português para o alemão. O residente precisava traduzir: \
     '{challenge}'. A tentativa dele foi: '{attempt}'. Avalie a precisão \
     gramatical (declinações e ordem dos verbos) e o vocabulário clínico. \
     Retorne APENAS um JSON com 'correct' (boolean), 'feedback' (1 frase de \
     correção direta) e 'ideal_version' (a melhor forma nativa de dizer isso)."
  );
  Prompt::json(system, &EvaluationRequest {
    desafio_pt:        challenge,
    tentativa_de:      attempt,
    contexto_original: context,
    required_keys:     ["correct", "feedback", "ideal_version"],
  })
}

/// Grade a translation and append it to the user's attempt history.
///
/// Blank challenge or attempt text is rejected before the generator is
/// called. The generator call follows the same single-retry policy as study
/// content.
pub async fn evaluate_translation<S, G>(
  store: &S,
  generator: &G,
  user_id: i64,
  submission: TranslationSubmission,
  timeout: Duration,
) -> Result<(TranslationVerdict, TranslationAttempt)>
where
  S: LearningStore,
  G: ContentGenerator,
{
  let challenge = submission.challenge_pt.trim();
  if challenge.is_empty() {
    return Err(Error::InvalidInput("challenge_pt must not be blank".into()));
  }
  let attempt = submission.attempt_de.trim();
  if attempt.is_empty() {
    return Err(Error::InvalidInput("attempt_de must not be blank".into()));
  }
  let context = submission.context_original.trim();

  let prompt = evaluation_prompt(challenge, attempt, context)?;
  let verdict: TranslationVerdict =
    request_json(generator, &prompt, timeout).await?;
  let verdict = verdict.normalize();

  let record = store
    .record_translation_attempt(NewTranslationAttempt {
      user_id,
      challenge_pt: challenge.to_owned(),
      attempt_de: attempt.to_owned(),
      context_original: context.to_owned(),
      is_correct: verdict.correct,
      feedback: verdict.feedback.clone(),
      suggested_de: verdict.ideal_version.clone(),
    })
    .await
    .map_err(Error::persistence)?;

  info!(user_id, attempt_id = record.id, correct = verdict.correct, "translation evaluated");
  Ok((verdict, record))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn prompt_quotes_challenge_and_attempt() {
    let prompt = evaluation_prompt(
      "O paciente recebeu o analgésico.",
      "Der Patient bekam das Schmerzmittel.",
      "",
    )
    .unwrap();
    assert!(prompt.system.contains("O paciente recebeu o analgésico."));
    assert!(prompt.user.contains("Der Patient bekam das Schmerzmittel."));
    assert!(prompt.user.contains("ideal_version"));
  }
}
