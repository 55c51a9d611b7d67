//! Loading service configuration (prompts, categories, level counts, schedule)
//! from TOML.
//!
//! Every section is optional; missing values fall back to the defaults below,
//! which match the production deployment (nine categories, Asia/Tokyo).

use std::{collections::BTreeMap, path::PathBuf};

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde::Deserialize;
use tracing::{error, info, warn};

pub const DEFAULT_MAX_LEVELS: u32 = 30;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub prompts: Prompts,
  /// Fixed enumerated category list.
  pub categories: Vec<String>,
  /// Levels pre-generated by the daily batch.
  pub levels: Vec<u32>,
  /// Static per-category level counts; the `config/levels` store document
  /// takes precedence when it holds a valid value.
  pub level_counts: BTreeMap<String, u32>,
  pub default_max_levels: u32,
  pub schedule: ScheduleCfg,
  pub store: StoreCfg,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      prompts: Prompts::default(),
      categories: [
        "ビジネストレンド",
        "IT",
        "健康",
        "経済・金融",
        "国際情勢・時事",
        "マーケティング・消費者行動",
        "プレゼンテーション・論理思考",
        "組織行動論・人間関係",
        "法務・ビジネス法基礎",
      ]
      .into_iter()
      .map(String::from)
      .collect(),
      levels: vec![1, 2, 3],
      level_counts: BTreeMap::new(),
      default_max_levels: DEFAULT_MAX_LEVELS,
      schedule: ScheduleCfg::default(),
      store: StoreCfg::default(),
    }
  }
}

/// Prompts used for question generation. Placeholders: `{category}`, `{level}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub question_system: String,
  pub question_user_template: String,
  pub temperature: f32,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      question_system: "あなたはクイズ問題の作成アシスタントです。".into(),
      question_user_template: "以下のカテゴリとレベルに応じて日本語の一問を生成してください。\n- カテゴリ: {category}\n- レベル: {level}\n\n出力は JSON 形式で、キーを \"prompt\"（問題文）、\"explanation\"（解説文）として返してください。".into(),
      // Repeated generation across categories/levels should not converge on
      // the same phrasing.
      temperature: 0.7,
    }
  }
}

/// Daily batch trigger: local wall-clock time at a fixed UTC offset.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScheduleCfg {
  pub enabled: bool,
  pub hour: u32,
  pub minute: u32,
  pub utc_offset_minutes: i32,
}

impl Default for ScheduleCfg {
  fn default() -> Self {
    Self { enabled: true, hour: 0, minute: 0, utc_offset_minutes: 9 * 60 }
  }
}

impl ScheduleCfg {
  /// Configured offset; out-of-range values fall back to UTC.
  pub fn offset(&self) -> FixedOffset {
    self
      .utc_offset_minutes
      .checked_mul(60)
      .and_then(FixedOffset::east_opt)
      .unwrap_or_else(|| {
        warn!(target: "skillboost_backend", offset = self.utc_offset_minutes, "Invalid utc_offset_minutes; using UTC");
        Utc.fix()
      })
  }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoreCfg {
  /// When set, documents are mirrored to this JSON file.
  pub snapshot_path: Option<PathBuf>,
}

impl AppConfig {
  /// Today's calendar date in the configured offset.
  pub fn today(&self) -> NaiveDate {
    Utc::now().with_timezone(&self.schedule.offset()).date_naive()
  }
}

/// Load `AppConfig` from SKILLBOOST_CONFIG_PATH. On any IO/parse error, or
/// when unset, defaults are used.
pub fn load_config_from_env() -> AppConfig {
  let Ok(path) = std::env::var("SKILLBOOST_CONFIG_PATH") else {
    info!(target: "skillboost_backend", "SKILLBOOST_CONFIG_PATH not set; using default config");
    return AppConfig::default();
  };
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "skillboost_backend", %path, categories = cfg.categories.len(), "Loaded config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "skillboost_backend", %path, error = %e, "Failed to parse TOML config");
        AppConfig::default()
      }
    },
    Err(e) => {
      error!(target: "skillboost_backend", %path, error = %e, "Failed to read TOML config file");
      AppConfig::default()
    }
  }
}
