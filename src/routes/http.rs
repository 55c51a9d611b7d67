//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs its parameters and basic result info.

use axum::{
  extract::{FromRequest, Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument};

use crate::auth::Caller;
use crate::domain::{QuestionKey, QuestionRecord};
use crate::error::{AppError, Result};
use crate::progress::{
  get_progress, record_completion, resolve_max_levels, toggle_category, toggle_level,
};
use crate::protocol::*;
use crate::questions::{
  backfill_question_dates, generate_daily_batch, get_or_create_question, get_question_by_id,
  list_question_ids, BatchReport,
};
use crate::state::AppState;

/// `Json` whose rejection renders as a 400 `{ "error": .. }` payload.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

fn require_level(level: u32) -> Result<u32> {
  if level == 0 {
    return Err(AppError::BadRequest("level must be a positive integer".into()));
  }
  Ok(level)
}

fn require_category(category: &str) -> Result<&str> {
  if category.trim().is_empty() {
    return Err(AppError::BadRequest("category must not be empty".into()));
  }
  Ok(category)
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<AppState>) -> impl IntoResponse {
  Json(HealthOut { ok: true, generator: state.generator.is_some() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_categories(State(state): State<AppState>) -> impl IntoResponse {
  let mut categories = Vec::with_capacity(state.config.categories.len());
  for name in &state.config.categories {
    let max_levels = resolve_max_levels(state.store.as_ref(), &state.config, name).await;
    categories.push(CategoryOut { name: name.clone(), max_levels });
  }
  Json(CategoriesOut { categories })
}

/// On-demand entry point: today's question for (category, level).
#[instrument(level = "info", skip(state), fields(category = %body.category, level = body.level))]
pub async fn http_post_generate_question(
  State(state): State<AppState>,
  ApiJson(body): ApiJson<GenerateQuestionIn>,
) -> Result<Json<QuestionRecord>> {
  let level = require_level(body.level)?;
  let category = require_category(&body.category)?;
  let key = QuestionKey::new(state.today(), category, level);
  let question =
    get_or_create_question(state.store.as_ref(), state.generator(), &state.config.prompts, &key)
      .await?;
  info!(target: "question", id = %key.doc_id(), "HTTP question served");
  Ok(Json(question))
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_questions(State(state): State<AppState>) -> Result<Json<QuestionIdsOut>> {
  let ids = list_question_ids(state.store.as_ref()).await?;
  Ok(Json(QuestionIdsOut { ids }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_question(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> Result<Json<QuestionByIdOut>> {
  let question = get_question_by_id(state.store.as_ref(), &id).await?;
  Ok(Json(QuestionByIdOut { id, question }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_progress(
  State(state): State<AppState>,
  caller: Caller,
) -> Result<Json<crate::domain::ProgressRecord>> {
  let user_id = caller.user_id().ok_or(AppError::Unauthenticated)?;
  let record = get_progress(state.store.as_ref(), user_id).await?;
  Ok(Json(record))
}

/// Quiz completion. Anonymous callers get 204 and nothing is recorded.
#[instrument(level = "info", skip(state), fields(category = %body.category, level = body.level))]
pub async fn http_post_complete(
  State(state): State<AppState>,
  caller: Caller,
  ApiJson(body): ApiJson<CompleteIn>,
) -> Result<Response> {
  let level = require_level(body.level)?;
  let category = require_category(&body.category)?;
  let Some(user_id) = caller.user_id() else {
    return Ok(StatusCode::NO_CONTENT.into_response());
  };
  let max_levels = resolve_max_levels(state.store.as_ref(), &state.config, category).await;
  let summary = record_completion(
    state.store.as_ref(),
    Some(user_id),
    category,
    level,
    max_levels,
    state.today(),
  )
  .await?;
  Ok(match summary {
    Some(s) => Json(s).into_response(),
    None => StatusCode::NO_CONTENT.into_response(),
  })
}

#[instrument(level = "info", skip(state), fields(category = %body.category, level = ?body.level))]
pub async fn http_post_toggle(
  State(state): State<AppState>,
  caller: Caller,
  ApiJson(body): ApiJson<ToggleIn>,
) -> Result<Response> {
  let category = require_category(&body.category)?;
  let store = state.store.as_ref();
  let new_state = match body.level {
    Some(level) => toggle_level(store, caller.user_id(), category, require_level(level)?).await?,
    None => toggle_category(store, caller.user_id(), category).await?,
  };
  Ok(match new_state {
    Some(completed) => Json(ToggleOut { completed }).into_response(),
    None => StatusCode::NO_CONTENT.into_response(),
  })
}

/// Manual run of the daily batch for today.
#[instrument(level = "info", skip(state))]
pub async fn http_post_generate_daily(State(state): State<AppState>) -> Json<BatchReport> {
  let report =
    generate_daily_batch(state.store.as_ref(), state.generator(), &state.config, state.today())
      .await;
  Json(report)
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_backfill_dates(State(state): State<AppState>) -> Result<Json<BackfillOut>> {
  let updated = backfill_question_dates(state.store.as_ref()).await?;
  Ok(Json(BackfillOut { updated }))
}
