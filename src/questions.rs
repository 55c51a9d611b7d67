//! Daily question cache-or-generate.
//!
//! One question exists per (date, category, level). The first request for a
//! key generates it through the text generator and stores it; every later
//! request is served from the store untouched. The daily batch pre-fills all
//! configured (category, level) pairs for a date.
//!
//! The existence check and the write are not atomic: two callers racing on
//! the same missing key may both generate and the later write wins.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{AppConfig, Prompts};
use crate::domain::{QuestionKey, QuestionRecord, QUESTIONS_COLLECTION};
use crate::error::{AppError, GenerationError, Result};
use crate::generator::TextGenerator;
use crate::store::{get_as, to_document, Document, DocumentStore};
use crate::util::{fill_template, preview};

/// Chunk size for logging backfill progress.
const BACKFILL_CHUNK: usize = 500;

/// System and user instructions for one (category, level).
pub fn build_instructions(prompts: &Prompts, category: &str, level: u32) -> (String, String) {
  let level = level.to_string();
  let pairs = [("category", category), ("level", level.as_str())];
  (
    fill_template(&prompts.question_system, &pairs),
    fill_template(&prompts.question_user_template, &pairs),
  )
}

/// Parse model output strictly: a JSON object with a non-empty `prompt` and an
/// `explanation` (which may be empty).
pub fn parse_generated(text: &str) -> Result<QuestionRecord, GenerationError> {
  #[derive(Deserialize)]
  struct Gen {
    prompt: String,
    explanation: String,
  }

  let gen: Gen = serde_json::from_str(text)
    .map_err(|e| GenerationError::Parse(format!("{e} (output: {})", preview(text, 60))))?;
  if gen.prompt.trim().is_empty() {
    return Err(GenerationError::Parse("empty prompt".into()));
  }
  Ok(QuestionRecord { prompt: gen.prompt, explanation: gen.explanation, date: None })
}

/// Return the stored question for `key`, generating and storing it on a miss.
///
/// A hit performs no writes and no generation. A miss performs exactly one
/// generation call and, only if the output parses, exactly one write.
#[instrument(level = "info", skip(store, generator, prompts), fields(id = %key.doc_id()))]
pub async fn get_or_create_question(
  store: &dyn DocumentStore,
  generator: Option<&dyn TextGenerator>,
  prompts: &Prompts,
  key: &QuestionKey,
) -> Result<QuestionRecord> {
  let id = key.doc_id();
  if let Some(existing) = get_as::<QuestionRecord>(store, QUESTIONS_COLLECTION, &id).await? {
    debug!(target: "question", %id, "Cache hit");
    return Ok(existing);
  }

  let generator = generator
    .ok_or_else(|| GenerationError::Unavailable("no text generator configured".into()))?;
  let (system, user) = build_instructions(prompts, &key.category, key.level);
  let text = generator.generate(&system, &user, prompts.temperature).await?;
  let record = parse_generated(&text)?;

  store.set(QUESTIONS_COLLECTION, &id, to_document(&record)?).await?;
  info!(
    target: "question",
    %id,
    prompt_preview = %preview(&record.prompt, 30),
    "Generated and stored question"
  );
  Ok(record)
}

/// Outcome of one daily batch run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatchReport {
  pub date: Option<NaiveDate>,
  pub created: usize,
  pub cached: usize,
  pub skipped: usize,
}

/// Pre-generate every configured (category, level) for `date`, sequentially.
/// A failing key is logged and skipped; it is retried by the next on-demand
/// request for it.
#[instrument(level = "info", skip(store, generator, cfg), fields(%date))]
pub async fn generate_daily_batch(
  store: &dyn DocumentStore,
  generator: Option<&dyn TextGenerator>,
  cfg: &AppConfig,
  date: NaiveDate,
) -> BatchReport {
  let mut report = BatchReport { date: Some(date), ..Default::default() };

  for category in &cfg.categories {
    for &level in &cfg.levels {
      let key = QuestionKey::new(date, category.clone(), level);
      let id = key.doc_id();
      match store.get(QUESTIONS_COLLECTION, &id).await {
        Ok(Some(_)) => {
          report.cached += 1;
          continue;
        }
        Ok(None) => {}
        Err(e) => {
          error!(target: "question", %id, error = %e, "Batch: store read failed; skipping");
          report.skipped += 1;
          continue;
        }
      }
      match get_or_create_question(store, generator, &cfg.prompts, &key).await {
        Ok(_) => report.created += 1,
        Err(AppError::Generation(GenerationError::Parse(msg))) => {
          warn!(target: "question", %id, error = %msg, "Batch: unparsable generation; skipping");
          report.skipped += 1;
        }
        Err(e) => {
          error!(target: "question", %id, error = %e, "Batch: generation failed; skipping");
          report.skipped += 1;
        }
      }
    }
  }

  info!(
    target: "question",
    %date,
    created = report.created,
    cached = report.cached,
    skipped = report.skipped,
    "Daily batch finished"
  );
  report
}

/// Ids of all stored daily questions, sorted.
pub async fn list_question_ids(store: &dyn DocumentStore) -> Result<Vec<String>> {
  Ok(store.list_ids(QUESTIONS_COLLECTION).await?)
}

/// One stored question by composite id.
pub async fn get_question_by_id(store: &dyn DocumentStore, id: &str) -> Result<QuestionRecord> {
  get_as::<QuestionRecord>(store, QUESTIONS_COLLECTION, id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("question {id}")))
}

/// Administrative migration: set `date` on every stored question from the
/// first ten characters of its id. Ids without a date prefix are left alone.
/// Returns the number of documents updated.
#[instrument(level = "info", skip(store))]
pub async fn backfill_question_dates(store: &dyn DocumentStore) -> Result<usize> {
  let ids = store.list_ids(QUESTIONS_COLLECTION).await?;
  let total = ids.len();
  let mut updated = 0;

  for (chunk_no, chunk) in ids.chunks(BACKFILL_CHUNK).enumerate() {
    for id in chunk {
      let date = id
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok());
      let Some(date) = date else {
        warn!(target: "question", %id, "Backfill: id has no date prefix; skipping");
        continue;
      };
      let mut fields = Document::new();
      fields.insert("date".into(), Value::String(date.format("%Y-%m-%d").to_string()));
      store.update(QUESTIONS_COLLECTION, id, fields).await?;
      updated += 1;
    }
    let processed = (chunk_no * BACKFILL_CHUNK + chunk.len()).min(total);
    info!(target: "question", processed, total, "Backfill progress");
  }

  info!(target: "question", updated, "Backfill complete");
  Ok(updated)
}
