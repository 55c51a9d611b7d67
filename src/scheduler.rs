//! Daily trigger for the question batch.
//!
//! Fires once per day at the configured wall-clock time in a fixed UTC offset
//! and runs `generate_daily_batch` for that day. A failed run is not retried;
//! missing keys get generated on demand.

use std::time::Duration;

use chrono::{DateTime, Days, FixedOffset, NaiveTime, Utc};
use tracing::{info, instrument, warn};

use crate::config::ScheduleCfg;
use crate::questions::generate_daily_batch;
use crate::state::AppState;

/// Next firing instant strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>, sched: &ScheduleCfg) -> DateTime<FixedOffset> {
  let offset = sched.offset();
  let local_now = now.with_timezone(&offset);
  let at = NaiveTime::from_hms_opt(sched.hour, sched.minute, 0).unwrap_or_else(|| {
    warn!(target: "scheduler", hour = sched.hour, minute = sched.minute, "Invalid schedule time; using 00:00");
    NaiveTime::MIN
  });

  let today_at = local_now.date_naive().and_time(at);
  let candidate = if today_at > local_now.naive_local() {
    today_at
  } else {
    today_at.checked_add_days(Days::new(1)).unwrap_or(today_at)
  };
  // Fixed offsets have no gaps or folds.
  candidate
    .and_local_timezone(offset)
    .single()
    .unwrap_or_else(|| local_now + chrono::Duration::days(1))
}

/// Run forever, firing the daily batch at each scheduled instant.
#[instrument(level = "info", skip_all)]
pub async fn run(state: AppState) {
  let sched = state.config.schedule.clone();
  info!(target: "scheduler", hour = sched.hour, minute = sched.minute, utc_offset_minutes = sched.utc_offset_minutes, "Daily question scheduler started");

  loop {
    let now = Utc::now();
    let next = next_run_after(now, &sched);
    let wait = (next.with_timezone(&Utc) - now).to_std().unwrap_or(Duration::ZERO);
    info!(target: "scheduler", next = %next, wait_secs = wait.as_secs(), "Sleeping until next batch");
    tokio::time::sleep(wait).await;

    let date = next.date_naive();
    let report = generate_daily_batch(state.store.as_ref(), state.generator(), &state.config, date).await;
    info!(target: "scheduler", %date, created = report.created, skipped = report.skipped, "Scheduled batch done");
  }
}
