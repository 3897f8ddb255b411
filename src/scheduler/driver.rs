// Scheduler driver - fires the materializer once per calendar day at a
// fixed local time in the reference timezone.
//
// Best-effort: there is no persisted last-run checkpoint. If the process
// is down at trigger time that day's run is missed; the idempotence guard
// in the materializer bounds duplicate risk, it does not guarantee
// eventual execution.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::info;

use crate::scheduler::materializer::{Materializer, SchedulerStore};

/// Daily trigger configuration
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Local hour (0-23) of the daily run
    pub hour: u32,
    /// Local minute (0-59) of the daily run
    pub minute: u32,
    /// Reference timezone offset
    pub offset: FixedOffset,
}

/// Owns the repeating daily timer. One instance per process; runs never
/// overlap since the next trigger is computed only after a run completes.
pub struct SchedulerDriver<S> {
    config: ScheduleConfig,
    materializer: Arc<Materializer<S>>,
}

impl<S: SchedulerStore + 'static> SchedulerDriver<S> {
    pub fn new(config: ScheduleConfig, materializer: Arc<Materializer<S>>) -> Self {
        Self {
            config,
            materializer,
        }
    }

    /// Start the daily loop in the background
    pub fn start(&self) -> JoinHandle<()> {
        let config = self.config.clone();
        let materializer = self.materializer.clone();

        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next = next_trigger(now, &config);
                let wait = next.signed_duration_since(now);

                if wait.num_seconds() > 0 {
                    info!(
                        "next recurring-transaction run scheduled for {}",
                        next.with_timezone(&config.offset)
                            .format("%Y-%m-%d %H:%M:%S")
                    );
                    tokio::time::sleep(Duration::from_secs(wait.num_seconds() as u64)).await;
                }

                info!("starting daily recurring-transaction run");
                materializer.run(Utc::now()).await;
            }
        })
    }
}

/// Next wall-clock trigger at the configured hour:minute in the reference
/// timezone. If today's trigger time has already passed, schedule tomorrow.
fn next_trigger(now: DateTime<Utc>, config: &ScheduleConfig) -> DateTime<Utc> {
    let local_now = now.with_timezone(&config.offset);

    let today = local_now
        .date_naive()
        .and_hms_opt(config.hour, config.minute, 0)
        .unwrap();
    let candidate = config.offset.from_local_datetime(&today).unwrap();

    let next = if candidate <= local_now {
        let tomorrow = (local_now.date_naive() + chrono::Duration::days(1))
            .and_hms_opt(config.hour, config.minute, 0)
            .unwrap();
        config.offset.from_local_datetime(&tomorrow).unwrap()
    } else {
        candidate
    };

    next.with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn config(hour: u32, minute: u32) -> ScheduleConfig {
        ScheduleConfig {
            hour,
            minute,
            offset: FixedOffset::west_opt(3 * 3600).unwrap(),
        }
    }

    #[test]
    fn test_next_trigger_later_today() {
        // 10:00 UTC is 07:00 local; a 14:00 trigger is still ahead today
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let next = next_trigger(now, &config(14, 0));

        let local = next.with_timezone(&config(14, 0).offset);
        assert_eq!(local.day(), 1);
        assert_eq!(local.hour(), 14);
        assert_eq!(local.minute(), 0);
    }

    #[test]
    fn test_next_trigger_rolls_to_tomorrow() {
        // 07:00 local is past the 02:05 trigger, so tomorrow
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let next = next_trigger(now, &config(2, 5));

        let local = next.with_timezone(&config(2, 5).offset);
        assert_eq!(local.day(), 2);
        assert_eq!(local.hour(), 2);
        assert_eq!(local.minute(), 5);
    }

    #[test]
    fn test_next_trigger_across_utc_day_boundary() {
        // 01:00 UTC on Jan 2 is 22:00 local on Jan 1: the trigger is
        // 02:05 local on Jan 2, i.e. 05:05 UTC the same UTC day
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 1, 0, 0).unwrap();
        let next = next_trigger(now, &config(2, 5));

        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 2, 5, 5, 0).unwrap());
    }

    #[test]
    fn test_trigger_exactly_now_schedules_tomorrow() {
        // at the trigger instant itself the next run is a day out
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 5, 5, 0).unwrap();
        let next = next_trigger(now, &config(2, 5));

        let local = next.with_timezone(&config(2, 5).offset);
        assert_eq!(local.day(), 2);
    }
}
