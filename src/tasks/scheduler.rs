//! Periodic ingestion. A tick is skipped while a run is in progress or while
//! the newest `last_fetched` is still inside the interval.

use std::time::Duration;

use log::{error, info};
use time::OffsetDateTime;

use super::ingest::{IngestReport, run_ingestion};
use crate::{db, queries::news::latest_fetch, types::AppState, utils::now_utc};

/// Slack so a run stamped at the end of the previous tick doesn't make this
/// one look fresh.
const CHECK_BUFFER_IN_MINUTES: i64 = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    AlreadyRunning,
    Fresh { last_fetched: OffsetDateTime },
    Ran(IngestReport),
    Failed(String),
}

pub fn is_due(last_fetched: Option<OffsetDateTime>, now: OffsetDateTime, interval: Duration) -> bool {
    let Some(last) = last_fetched else {
        return true;
    };

    let interval = time::Duration::try_from(interval).unwrap_or(time::Duration::MAX);
    let window = interval.saturating_sub(time::Duration::minutes(CHECK_BUFFER_IN_MINUTES));

    now - last >= window
}

pub async fn run_tick(state: &AppState) -> TickOutcome {
    let Ok(_guard) = state.ingest_lock.try_lock() else {
        info!("[Scheduler] Ingestion already running, skipping tick");
        return TickOutcome::AlreadyRunning;
    };

    let last_fetched = match db::connect(&state.db).await {
        Ok(conn) => latest_fetch(&conn).await,
        Err(e) => Err(e),
    };

    match last_fetched {
        Ok(last) if !is_due(last, now_utc(), state.config.ingest_interval) => {
            let last_fetched = last.unwrap_or_else(now_utc);
            info!("[Scheduler] Sources fetched at {last_fetched}, skipping tick");
            TickOutcome::Fresh { last_fetched }
        }
        Ok(_) => TickOutcome::Ran(run_ingestion(state, None, state.config.scheduled_item_limit).await),
        Err(e) => TickOutcome::Failed(e.to_string()),
    }
}

fn log_tick(outcome: &TickOutcome) {
    match outcome {
        TickOutcome::Ran(report) => info!(
            "[Scheduler] Tick saved {} items and {} questions",
            report.items(),
            report.questions()
        ),
        TickOutcome::Failed(reason) => error!("[Scheduler] Tick failed: {reason}"),
        TickOutcome::AlreadyRunning | TickOutcome::Fresh { .. } => {}
    }
}

#[cfg(feature = "scheduler")]
pub use handle::{IngestScheduler, start_scheduler, stop_scheduler};

#[cfg(feature = "scheduler")]
mod handle {
    use actix_web::web;
    use log::info;
    use tokio_cron_scheduler::{Job, JobScheduler};

    use super::{log_tick, run_tick};
    use crate::types::AppData;

    /// Owned by `main`, stopped at shutdown.
    pub struct IngestScheduler {
        scheduler: JobScheduler,
    }

    /// Registers the repeating job and fires one tick right away.
    pub async fn start_scheduler(data: AppData) -> anyhow::Result<IngestScheduler> {
        let interval = data.config.ingest_interval;
        let tmp_data = data.clone();

        let scheduler = JobScheduler::new().await?;
        scheduler
            .add(Job::new_repeated_async(interval, move |_uuid, _l| {
                let sched_data = web::Data::clone(&tmp_data);
                Box::pin(async move {
                    log_tick(&run_tick(&sched_data).await);
                })
            })?)
            .await?;
        info!("[Scheduler] Initialized with interval {interval:?}");
        scheduler.start().await?;
        info!("[Scheduler] Started");

        tokio::spawn(async move {
            log_tick(&run_tick(&data).await);
        });

        Ok(IngestScheduler { scheduler })
    }

    pub async fn stop_scheduler(mut handle: IngestScheduler) -> anyhow::Result<()> {
        handle.scheduler.shutdown().await?;
        info!("[Scheduler] Stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    const FOUR_HOURS: Duration = Duration::from_secs(4 * 60 * 60);
    const NOW: OffsetDateTime = datetime!(2025-03-01 12:00 UTC);

    #[test]
    fn never_fetched_is_due() {
        assert!(is_due(None, NOW, FOUR_HOURS));
    }

    #[test]
    fn recent_fetch_is_not_due() {
        assert!(!is_due(Some(datetime!(2025-03-01 11:00 UTC)), NOW, FOUR_HOURS));
    }

    #[test]
    fn grace_window_applies() {
        // 3h56m ago: inside the 5 minute buffer of a 4h interval
        assert!(is_due(Some(datetime!(2025-03-01 08:04 UTC)), NOW, FOUR_HOURS));
        assert!(!is_due(Some(datetime!(2025-03-01 08:06 UTC)), NOW, FOUR_HOURS));
    }
}
