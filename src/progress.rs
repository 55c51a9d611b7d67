//! Per-user progress: learning streaks and category/level completion.
//!
//! All operations are read-modify-write against the store without isolation;
//! two concurrent completions for one user can lose an update.
//!
//! Anonymous callers (`user_id == None`) are a silent no-op for every
//! mutation: the functions return `Ok(None)` without touching the store.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::AppConfig;
use crate::domain::{
  CompletionSummary, ProgressRecord, CONFIG_COLLECTION, LEVELS_CONFIG_DOC, PROGRESS_COLLECTION,
};
use crate::error::Result;
use crate::store::{get_as, to_document, Document, DocumentStore};

/// Streak after a completion on `today`.
///
/// Continues the streak when the previous completion was yesterday, keeps it
/// when something was already completed today, and restarts at 1 otherwise.
pub fn next_streak(prior_last: Option<NaiveDate>, prior_streak: u32, today: NaiveDate) -> u32 {
  match prior_last {
    Some(last) if last == today => prior_streak.max(1),
    Some(last) if today.pred_opt() == Some(last) => prior_streak.saturating_add(1),
    _ => 1,
  }
}

/// Apply one quiz completion to a progress record.
///
/// The category counts as completed once the number of levels marked `true`
/// equals `max_levels`. This is a count, not a check of specific level
/// numbers.
pub fn apply_completion(
  mut record: ProgressRecord,
  category: &str,
  level: u32,
  max_levels: u32,
  today: NaiveDate,
) -> ProgressRecord {
  record.streak_count = next_streak(record.last_completed, record.streak_count, today);
  record.last_completed = Some(today);

  record
    .completed_levels
    .entry(category.to_string())
    .or_default()
    .insert(level, true);
  let done = record.completed_level_count(category) == max_levels as usize;
  record.completed_categories.insert(category.to_string(), done);
  record
}

/// Read a user's progress; zero-valued when no record exists yet.
pub async fn get_progress(store: &dyn DocumentStore, user_id: &str) -> Result<ProgressRecord> {
  Ok(get_as::<ProgressRecord>(store, PROGRESS_COLLECTION, user_id).await?.unwrap_or_default())
}

fn fields_of(record: &ProgressRecord, names: &[&str]) -> Result<Document> {
  let mut doc = to_document(record)?;
  doc.retain(|k, _| names.contains(&k.as_str()));
  Ok(doc)
}

/// Record a completed quiz for `user_id` and merge-write the new state.
#[instrument(level = "info", skip(store), fields(user = user_id.unwrap_or("-")))]
pub async fn record_completion(
  store: &dyn DocumentStore,
  user_id: Option<&str>,
  category: &str,
  level: u32,
  max_levels: u32,
  today: NaiveDate,
) -> Result<Option<CompletionSummary>> {
  let Some(user_id) = user_id else {
    debug!(target: "progress", "Anonymous completion ignored");
    return Ok(None);
  };

  let prior = get_progress(store, user_id).await?;
  let prior_streak = prior.streak_count;
  let updated = apply_completion(prior, category, level, max_levels, today);

  let fields = fields_of(
    &updated,
    &["lastCompleted", "streakCount", "completedCategories", "completedLevels"],
  )?;
  store.update(PROGRESS_COLLECTION, user_id, fields).await?;

  info!(
    target: "progress",
    %user_id,
    %category,
    level,
    prior_streak,
    streak = updated.streak_count,
    category_done = updated.completed_categories.get(category).copied().unwrap_or(false),
    "Completion recorded"
  );
  Ok(Some(CompletionSummary { streak_count: updated.streak_count, last_completed: today }))
}

/// Flip `completedCategories[category]`. Never touches the streak.
#[instrument(level = "info", skip(store), fields(user = user_id.unwrap_or("-")))]
pub async fn toggle_category(
  store: &dyn DocumentStore,
  user_id: Option<&str>,
  category: &str,
) -> Result<Option<bool>> {
  let Some(user_id) = user_id else { return Ok(None) };

  let mut record = get_progress(store, user_id).await?;
  let new_state = !record.completed_categories.get(category).copied().unwrap_or(false);
  record.completed_categories.insert(category.to_string(), new_state);

  store
    .update(PROGRESS_COLLECTION, user_id, fields_of(&record, &["completedCategories"])?)
    .await?;
  info!(target: "progress", %user_id, %category, new_state, "Category toggled");
  Ok(Some(new_state))
}

/// Flip `completedLevels[category][level]`. Never touches the streak or the
/// category flag.
#[instrument(level = "info", skip(store), fields(user = user_id.unwrap_or("-")))]
pub async fn toggle_level(
  store: &dyn DocumentStore,
  user_id: Option<&str>,
  category: &str,
  level: u32,
) -> Result<Option<bool>> {
  let Some(user_id) = user_id else { return Ok(None) };

  let mut record = get_progress(store, user_id).await?;
  let levels = record.completed_levels.entry(category.to_string()).or_default();
  let new_state = !levels.get(&level).copied().unwrap_or(false);
  levels.insert(level, new_state);

  store
    .update(PROGRESS_COLLECTION, user_id, fields_of(&record, &["completedLevels"])?)
    .await?;
  info!(target: "progress", %user_id, %category, level, new_state, "Level toggled");
  Ok(Some(new_state))
}

/// Interpret a configured level count: a number (or numeric string) that is at
/// least one after truncation.
fn positive_count(raw: &Value) -> Option<u32> {
  let n = match raw {
    Value::Number(n) => n.as_f64()?,
    Value::String(s) => s.trim().parse::<f64>().ok()?,
    _ => return None,
  };
  if n.is_finite() && n >= 1.0 && n <= u32::MAX as f64 {
    Some(n.trunc() as u32)
  } else {
    None
  }
}

/// How many levels `category` has: the `config/levels` store document first,
/// then the static config, then the default.
pub async fn resolve_max_levels(store: &dyn DocumentStore, cfg: &AppConfig, category: &str) -> u32 {
  let from_store = match store.get(CONFIG_COLLECTION, LEVELS_CONFIG_DOC).await {
    Ok(doc) => doc
      .as_ref()
      .and_then(|d| d.get("maxLevels"))
      .and_then(|m| m.get(category))
      .and_then(positive_count),
    Err(e) => {
      warn!(target: "progress", %category, error = %e, "Level count lookup failed; using static config");
      None
    }
  };

  from_store
    .or_else(|| cfg.level_counts.get(category).copied().filter(|n| *n > 0))
    .unwrap_or(cfg.default_max_levels.max(1))
}
