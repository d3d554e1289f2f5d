//! The review scheduler and the due-card listing.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
  Error, ErrorKind, Result,
  annotate::Annotator,
  cache::StudyCache,
  generate::ContentGenerator,
  knowledge::{KnowledgeState, ReviewEvent, ReviewScore, Transition},
  planner::StudyPlanner,
  store::LearningStore,
};

/// Characters of raw document text shown when content generation fails.
pub const FALLBACK_CONTEXT_CHARS: usize = 280;

/// Challenge shown when content generation fails.
pub fn fallback_challenge(lemma: &str) -> String {
  format!("Traduza mentalmente uma frase médica com '{lemma}'.")
}

/// Apply a review score to one of `user_id`'s cards.
pub async fn submit_review<S: LearningStore>(
  store: &S,
  knowledge_id: i64,
  user_id: i64,
  score: i64,
) -> Result<(KnowledgeState, ReviewEvent)> {
  submit_review_at(store, knowledge_id, user_id, score, Utc::now()).await
}

/// [`submit_review`] with an explicit clock.
///
/// The score is validated before storage is touched. The state update and
/// its [`ReviewEvent`] are written in one transaction.
pub async fn submit_review_at<S: LearningStore>(
  store: &S,
  knowledge_id: i64,
  user_id: i64,
  score: i64,
  now: DateTime<Utc>,
) -> Result<(KnowledgeState, ReviewEvent)> {
  let score = ReviewScore::try_from(score)?;
  let transition = Transition::for_score(score, now.trunc_subsecs(6));

  let (state, event) = store
    .apply_review(knowledge_id, user_id, transition)
    .await
    .map_err(Error::persistence)?
    .ok_or(Error::KnowledgeNotFound(knowledge_id))?;

  info!(
    knowledge_id,
    user_id,
    %score,
    from = event.previous_retention_level,
    to = event.new_retention_level,
    "review applied"
  );
  Ok((state, event))
}

/// A due card with content for the review screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewCard {
  pub knowledge_id:     i64,
  pub vocabulary_id:    i64,
  pub word:             String,
  pub context_original: String,
  pub challenge_pt:     String,
  pub examples:         Vec<String>,
  pub useful_phrase:    String,
  pub next_review_at:   DateTime<Utc>,
  /// Set when generation failed and templated content was used.
  pub fallback:         bool,
}

/// Every due card of `user_id`, soonest first, with study content from the
/// latest document containing the word.
///
/// Cards whose word appears in no document are skipped. A generation failure
/// for one card degrades that card to templated content; other failures end
/// the listing.
pub async fn list_due_cards<S, A, G, C>(
  planner: &StudyPlanner<S, A, G, C>,
  user_id: i64,
  now: DateTime<Utc>,
) -> Result<Vec<ReviewCard>>
where
  S: LearningStore,
  A: Annotator,
  G: ContentGenerator,
  C: StudyCache,
{
  let store = planner.store();
  let due = store.due_cards(user_id, now).await.map_err(Error::persistence)?;

  let mut cards = Vec::with_capacity(due.len());
  for card in due {
    let Some(document) = store
      .latest_document_with(card.word.id)
      .await
      .map_err(Error::persistence)?
    else {
      continue;
    };

    let mut review_card = ReviewCard {
      knowledge_id:     card.knowledge.id,
      vocabulary_id:    card.word.id,
      word:             card.word.lemma.clone(),
      context_original: String::new(),
      challenge_pt:     String::new(),
      examples:         Vec::new(),
      useful_phrase:    String::new(),
      next_review_at:   card.knowledge.next_review_at,
      fallback:         false,
    };

    match planner
      .plan_at(user_id, document.id, Some(card.word.id), now, false)
      .await
    {
      Ok(plan) => {
        if let Some(item) = plan.items.into_iter().next() {
          review_card.context_original = item.context_sentence;
        }
        if let Some(content) = plan.content {
          review_card.challenge_pt = content.desafio;
          review_card.examples = content.examples;
          review_card.useful_phrase = content.useful_phrase;
        }
      }
      Err(e) if e.kind() == ErrorKind::Generation => {
        warn!(
          knowledge_id = card.knowledge.id,
          error = %e,
          "study content unavailable, using fallback card"
        );
        review_card.context_original =
          document.raw_text.chars().take(FALLBACK_CONTEXT_CHARS).collect();
        review_card.challenge_pt = fallback_challenge(&card.word.lemma);
        review_card.fallback = true;
      }
      Err(e) => return Err(e),
    }
    cards.push(review_card);
  }
  Ok(cards)
}
