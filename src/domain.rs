//! Domain models: daily question keys/records and per-user progress.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Store collection holding generated daily questions.
pub const QUESTIONS_COLLECTION: &str = "dailyQuestions";
/// Store collection holding one progress document per user id.
pub const PROGRESS_COLLECTION: &str = "progress";
/// Store collection holding runtime configuration documents.
pub const CONFIG_COLLECTION: &str = "config";
/// Document in `config` with `{ "maxLevels": { category: n } }`.
pub const LEVELS_CONFIG_DOC: &str = "levels";

/// Identifies one daily question: (date, category, level).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QuestionKey {
  pub date: NaiveDate,
  pub category: String,
  pub level: u32,
}

impl QuestionKey {
  pub fn new(date: NaiveDate, category: impl Into<String>, level: u32) -> Self {
    Self { date, category: category.into(), level }
  }

  /// Composite store id, e.g. `2024-06-01-IT-1`.
  /// Category names carry no hyphens, so the join is unambiguous.
  pub fn doc_id(&self) -> String {
    format!("{}-{}-{}", self.date.format("%Y-%m-%d"), self.category, self.level)
  }
}

/// One generated quiz question. Immutable once written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
  pub prompt: String,
  #[serde(default)]
  pub explanation: String,
  /// Backfilled from the id prefix by the date migration.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date: Option<NaiveDate>,
}

/// Per-user learning progress, stored under the user id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_completed: Option<NaiveDate>,
  #[serde(default)]
  pub streak_count: u32,
  #[serde(default)]
  pub completed_categories: BTreeMap<String, bool>,
  #[serde(default)]
  pub completed_levels: BTreeMap<String, BTreeMap<u32, bool>>,
}

impl ProgressRecord {
  /// Number of levels marked `true` for a category.
  pub fn completed_level_count(&self, category: &str) -> usize {
    self
      .completed_levels
      .get(category)
      .map(|levels| levels.values().filter(|done| **done).count())
      .unwrap_or(0)
  }
}

/// The part of a completion surfaced back to the caller for display.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
  pub streak_count: u32,
  pub last_completed: NaiveDate,
}
