//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontends independently.

use serde::{Deserialize, Serialize};

//
// Questions
//

#[derive(Debug, Deserialize)]
pub struct GenerateQuestionIn {
  pub category: String,
  pub level: u32,
}

#[derive(Serialize)]
pub struct QuestionIdsOut {
  pub ids: Vec<String>,
}

#[derive(Serialize)]
pub struct QuestionByIdOut {
  pub id: String,
  #[serde(flatten)]
  pub question: crate::domain::QuestionRecord,
}

//
// Categories
//

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryOut {
  pub name: String,
  pub max_levels: u32,
}

#[derive(Serialize)]
pub struct CategoriesOut {
  pub categories: Vec<CategoryOut>,
}

//
// Progress
//

#[derive(Debug, Deserialize)]
pub struct CompleteIn {
  pub category: String,
  pub level: u32,
}

/// Toggles the level when `level` is present, the category otherwise.
#[derive(Debug, Deserialize)]
pub struct ToggleIn {
  pub category: String,
  #[serde(default)]
  pub level: Option<u32>,
}

#[derive(Serialize)]
pub struct ToggleOut {
  pub completed: bool,
}

//
// Admin
//

#[derive(Serialize)]
pub struct BackfillOut {
  pub updated: usize,
}

//
// Misc
//

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
  pub generator: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
  pub error: String,
}
