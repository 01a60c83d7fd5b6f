//! Time-based event scheduler.
//!
//! Turns time signals into bus events. Jobs fire on a fixed interval, a
//! five-field cron expression (`minute hour day month day_of_week`), or
//! the daily/weekly shorthands. When a job fires the scheduler publishes
//! its event type with the job payload plus `scheduled_at`, sourced as
//! `scheduler:<job_id>`.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::event_bus::EventBus;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{event_types, Event, SchedulerConfig};

const WEEKDAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

/// When a job fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobTrigger {
    /// Every `minutes`, first run one interval after registration.
    Interval { minutes: u64 },
    /// Five-field cron expression.
    Cron { expression: String },
    Daily { hour: u32, minute: u32 },
    /// `day_of_week` is a three-letter day name, e.g. `mon`.
    Weekly { day_of_week: String, hour: u32, minute: u32 },
}

impl JobTrigger {
    /// Six-field expression for the `cron` crate, or `None` for intervals.
    fn cron_expression(&self) -> Result<Option<String>, String> {
        let expression = match self {
            Self::Interval { .. } => return Ok(None),
            Self::Cron { expression } => {
                let fields: Vec<&str> = expression.split_whitespace().collect();
                let [minute, hour, day, month, day_of_week] = fields.as_slice() else {
                    return Err(format!("expected 5 cron fields, found {}", fields.len()));
                };
                format!("0 {minute} {hour} {day} {month} {}", day_of_week_field(day_of_week)?)
            }
            Self::Daily { hour, minute } => format!("0 {minute} {hour} * * *"),
            Self::Weekly {
                day_of_week,
                hour,
                minute,
            } => format!("0 {minute} {hour} * * {}", title_case(day_of_week)),
        };
        Ok(Some(expression))
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Interval { minutes: 0 } => Err("interval must be at least one minute".to_string()),
            Self::Interval { .. } => Ok(()),
            Self::Cron { expression } => {
                let fields = expression.split_whitespace().count();
                if fields == 5 {
                    Ok(())
                } else {
                    Err(format!("expected 5 cron fields, found {fields}"))
                }
            }
            Self::Daily { hour, minute } => validate_time(*hour, *minute),
            Self::Weekly {
                day_of_week,
                hour,
                minute,
            } => {
                if !WEEKDAYS.contains(&day_of_week.to_lowercase().as_str()) {
                    return Err(format!("unknown day of week '{day_of_week}'"));
                }
                validate_time(*hour, *minute)
            }
        }
    }
}

impl fmt::Display for JobTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interval { minutes } => write!(f, "interval[{minutes}m]"),
            Self::Cron { expression } => write!(f, "cron[{expression}]"),
            Self::Daily { hour, minute } => write!(f, "daily[{hour:02}:{minute:02}]"),
            Self::Weekly {
                day_of_week,
                hour,
                minute,
            } => write!(f, "weekly[{} {hour:02}:{minute:02}]", day_of_week.to_lowercase()),
        }
    }
}

fn validate_time(hour: u32, minute: u32) -> Result<(), String> {
    if hour > 23 || minute > 59 {
        return Err(format!("invalid time {hour:02}:{minute:02}"));
    }
    Ok(())
}

/// Day of week as crontab numbers it (0-7, Sunday is 0 and 7) or by
/// three-letter name.
fn crontab_day(token: &str) -> Result<u32, String> {
    if let Ok(n) = token.parse::<u32>() {
        return if n <= 7 {
            Ok(n)
        } else {
            Err(format!("day of week {n} out of range 0-7"))
        };
    }
    let lower = token.to_lowercase();
    WEEKDAYS
        .iter()
        .position(|d| *d == lower)
        .and_then(|i| u32::try_from(i + 1).ok())
        .ok_or_else(|| format!("unknown day of week '{token}'"))
}

/// Rewrite a crontab day-of-week field into the `cron` crate's numbering
/// (Sunday = 1 .. Saturday = 7) as an explicit list.
fn day_of_week_field(field: &str) -> Result<String, String> {
    if field == "*" || field == "?" {
        return Ok("*".to_string());
    }

    let mut days = BTreeSet::new();
    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step: usize = step.parse().map_err(|_| format!("invalid step in '{item}'"))?;
                if step == 0 {
                    return Err(format!("invalid step in '{item}'"));
                }
                (range, Some(step))
            }
            None => (item, None),
        };

        let (start, end) = match range.split_once('-') {
            _ if range == "*" => (0, 6),
            Some((start, end)) => (crontab_day(start)?, crontab_day(end)?),
            // `5/2` runs from 5 to the end of the week
            None if step.is_some() => (crontab_day(range)?, 6),
            None => {
                let day = crontab_day(range)?;
                (day, day)
            }
        };
        if start > end {
            return Err(format!("day of week range '{range}' runs backwards"));
        }

        for day in (start..=end).step_by(step.unwrap_or(1)) {
            days.insert(day % 7 + 1);
        }
    }

    Ok(days.iter().map(u32::to_string).collect::<Vec<_>>().join(","))
}

fn title_case(day: &str) -> String {
    let lower = day.to_lowercase();
    let mut chars = lower.chars();
    chars
        .next()
        .map(|c| c.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

/// A registered job.
#[derive(Debug, Clone)]
struct ScheduledJob {
    id: String,
    event_type: String,
    trigger: JobTrigger,
    payload: Map<String, Value>,
    schedule: Option<cron::Schedule>,
    next_run: Option<DateTime<Utc>>,
    fire_count: u64,
}

impl ScheduledJob {
    fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match (&self.trigger, &self.schedule) {
            (JobTrigger::Interval { minutes }, _) => {
                let step = TimeDelta::try_minutes(i64::try_from(*minutes).ok()?)?;
                let mut next = self.next_run.unwrap_or(after).checked_add_signed(step)?;
                // Missed runs coalesce into one
                while next <= after {
                    next = next.checked_add_signed(step)?;
                }
                Some(next)
            }
            (_, Some(schedule)) => schedule.after(&after).next(),
            (_, None) => None,
        }
    }
}

/// Listing record for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobInfo {
    pub id: String,
    pub event_type: String,
    pub next_run: Option<DateTime<Utc>>,
    pub trigger: String,
    pub fire_count: u64,
}

/// Time-based event scheduler.
pub struct EventScheduler {
    event_bus: Arc<EventBus>,
    config: SchedulerConfig,
    jobs: RwLock<Vec<ScheduledJob>>,
    running: AtomicBool,
}

impl EventScheduler {
    pub fn new(event_bus: Arc<EventBus>, config: SchedulerConfig) -> Self {
        Self {
            event_bus,
            config,
            jobs: RwLock::new(Vec::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Register a job. A job with the same id is replaced.
    pub async fn add_job(
        &self,
        job_id: impl Into<String>,
        event_type: impl Into<String>,
        trigger: JobTrigger,
        payload: Option<Map<String, Value>>,
    ) -> DomainResult<()> {
        let job_id = job_id.into();
        let invalid = |reason: String| DomainError::InvalidSchedule {
            job_id: job_id.clone(),
            reason,
        };

        trigger.validate().map_err(invalid)?;
        let schedule = match trigger.cron_expression().map_err(invalid)? {
            Some(expr) => Some(cron::Schedule::from_str(&expr).map_err(|e| invalid(e.to_string()))?),
            None => None,
        };

        let mut job = ScheduledJob {
            id: job_id.clone(),
            event_type: event_type.into(),
            trigger,
            payload: payload.unwrap_or_default(),
            schedule,
            next_run: None,
            fire_count: 0,
        };
        job.next_run = job.next_after(Utc::now());
        if job.next_run.is_none() {
            return Err(invalid("schedule never fires".to_string()));
        }

        let mut jobs = self.jobs.write().await;
        if let Some(existing) = jobs.iter_mut().find(|j| j.id == job.id) {
            tracing::info!(job_id = %job.id, trigger = %job.trigger, "replaced scheduled job");
            *existing = job;
            return Ok(());
        }
        if jobs.len() >= self.config.max_jobs {
            return Err(invalid(format!("max jobs ({}) reached", self.config.max_jobs)));
        }

        tracing::info!(job_id = %job.id, trigger = %job.trigger, "added scheduled job");
        jobs.push(job);
        Ok(())
    }

    pub async fn add_interval_job(
        &self,
        job_id: &str,
        event_type: &str,
        interval_minutes: u64,
        payload: Option<Map<String, Value>>,
    ) -> DomainResult<()> {
        self.add_job(job_id, event_type, JobTrigger::Interval { minutes: interval_minutes }, payload)
            .await
    }

    pub async fn add_cron_job(
        &self,
        job_id: &str,
        event_type: &str,
        expression: &str,
        payload: Option<Map<String, Value>>,
    ) -> DomainResult<()> {
        let trigger = JobTrigger::Cron {
            expression: expression.trim().to_string(),
        };
        self.add_job(job_id, event_type, trigger, payload).await
    }

    pub async fn add_daily_job(
        &self,
        job_id: &str,
        event_type: &str,
        hour: u32,
        minute: u32,
        payload: Option<Map<String, Value>>,
    ) -> DomainResult<()> {
        self.add_job(job_id, event_type, JobTrigger::Daily { hour, minute }, payload)
            .await
    }

    pub async fn add_weekly_job(
        &self,
        job_id: &str,
        event_type: &str,
        day_of_week: &str,
        hour: u32,
        minute: u32,
        payload: Option<Map<String, Value>>,
    ) -> DomainResult<()> {
        let trigger = JobTrigger::Weekly {
            day_of_week: day_of_week.to_string(),
            hour,
            minute,
        };
        self.add_job(job_id, event_type, trigger, payload).await
    }

    /// Remove a job. Returns true if it existed.
    pub async fn remove_job(&self, job_id: &str) -> bool {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|j| j.id != job_id);
        before != jobs.len()
    }

    pub async fn list_jobs(&self) -> Vec<JobInfo> {
        self.jobs
            .read()
            .await
            .iter()
            .map(|j| JobInfo {
                id: j.id.clone(),
                event_type: j.event_type.clone(),
                next_run: j.next_run,
                trigger: j.trigger.to_string(),
                fire_count: j.fire_count,
            })
            .collect()
    }

    /// Publish every job due at `now` and advance its next run.
    /// Returns the number of events published.
    pub async fn fire_due(&self, now: DateTime<Utc>) -> usize {
        let mut due = Vec::new();
        {
            let mut jobs = self.jobs.write().await;
            for job in jobs.iter_mut() {
                if !job.next_run.is_some_and(|next| next <= now) {
                    continue;
                }

                let mut payload = job.payload.clone();
                payload.insert("scheduled_at".to_string(), Value::String(now.to_rfc3339()));
                due.push(Event::new(job.event_type.clone(), payload, format!("scheduler:{}", job.id)));

                job.fire_count += 1;
                job.next_run = job.next_after(now);
            }
        }

        let fired = due.len();
        for event in due {
            tracing::debug!(event_type = %event.event_type, source = %event.source, "scheduled job fired");
            self.event_bus.publish(event);
        }
        fired
    }

    /// Start the tick loop on a tokio task.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        let tick_interval = Duration::from_millis(self.config.tick_interval_ms);

        tokio::spawn(async move {
            tracing::info!("scheduler started");
            while self.running.load(Ordering::SeqCst) {
                tokio::time::sleep(tick_interval).await;
                self.fire_due(Utc::now()).await;
            }
            tracing::info!("scheduler stopped");
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Install the built-in schedules.
pub async fn setup_default_schedules(scheduler: &EventScheduler) -> DomainResult<()> {
    scheduler
        .add_interval_job("monitor_health_check", event_types::SCHEDULE_HEALTH_CHECK, 5, None)
        .await?;
    scheduler
        .add_interval_job("ads_optimization", event_types::SCHEDULE_ADS_OPTIMIZATION, 360, None)
        .await?;
    scheduler
        .add_daily_job("daily_revenue_report", event_types::SCHEDULE_DAILY_REVENUE, 9, 0, None)
        .await?;
    scheduler
        .add_weekly_job("weekly_content_calendar", event_types::SCHEDULE_WEEKLY_CONTENT, "mon", 9, 0, None)
        .await?;
    scheduler
        .add_weekly_job("weekly_seo_audit", event_types::SCHEDULE_WEEKLY_SEO, "tue", 10, 0, None)
        .await?;
    tracing::info!("default schedules configured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::EventBusConfig;
    use crate::services::event_bus::FnEventHandler;
    use chrono::{Datelike, Timelike, Weekday};
    use tokio::sync::mpsc;

    fn scheduler() -> EventScheduler {
        EventScheduler::new(Arc::new(EventBus::default()), SchedulerConfig::default())
    }

    #[tokio::test]
    async fn test_interval_job_next_run() {
        let s = scheduler();
        let before = Utc::now();
        s.add_interval_job("hc", "schedule.health_check", 5, None).await.unwrap();

        let jobs = s.list_jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].trigger, "interval[5m]");
        let next = jobs[0].next_run.unwrap();
        assert!(next >= before + TimeDelta::minutes(5));
        assert!(next <= Utc::now() + TimeDelta::minutes(5));
    }

    #[tokio::test]
    async fn test_same_id_replaces() {
        let s = scheduler();
        s.add_interval_job("job", "a", 5, None).await.unwrap();
        s.add_daily_job("job", "b", 9, 0, None).await.unwrap();

        let jobs = s.list_jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].event_type, "b");
        assert_eq!(jobs[0].trigger, "daily[09:00]");
    }

    #[tokio::test]
    async fn test_invalid_schedules_rejected() {
        let s = scheduler();
        for result in [
            s.add_cron_job("c1", "x", "not a cron", None).await,
            s.add_cron_job("c2", "x", "99 * * * *", None).await,
            s.add_interval_job("i", "x", 0, None).await,
            s.add_daily_job("d", "x", 24, 0, None).await,
            s.add_weekly_job("w", "x", "someday", 9, 0, None).await,
        ] {
            assert!(matches!(result, Err(DomainError::InvalidSchedule { .. })));
        }
        assert!(s.list_jobs().await.is_empty());
    }

    #[tokio::test]
    async fn test_weekly_job_lands_on_day() {
        let s = scheduler();
        s.add_weekly_job("seo", "schedule.weekly_seo", "tue", 10, 0, None).await.unwrap();
        let next = s.list_jobs().await[0].next_run.unwrap();
        assert_eq!(next.weekday(), Weekday::Tue);
        assert_eq!((next.hour(), next.minute()), (10, 0));
    }

    #[tokio::test]
    async fn test_cron_numeric_day_of_week_follows_crontab() {
        let s = scheduler();
        s.add_cron_job("sun", "x", "0 9 * * 0", None).await.unwrap();
        s.add_cron_job("sun7", "x", "0 9 * * 7", None).await.unwrap();
        s.add_cron_job("mon", "x", "30 8 * * 1", None).await.unwrap();
        s.add_cron_job("sat", "x", "0 9 * * 6", None).await.unwrap();

        let days: Vec<(String, Weekday)> = s
            .list_jobs()
            .await
            .into_iter()
            .map(|j| (j.id, j.next_run.unwrap().weekday()))
            .collect();
        assert_eq!(
            days,
            vec![
                ("sun".to_string(), Weekday::Sun),
                ("sun7".to_string(), Weekday::Sun),
                ("mon".to_string(), Weekday::Mon),
                ("sat".to_string(), Weekday::Sat),
            ]
        );
    }

    #[test]
    fn test_day_of_week_field_translation() {
        assert_eq!(day_of_week_field("*").unwrap(), "*");
        assert_eq!(day_of_week_field("0").unwrap(), "1");
        assert_eq!(day_of_week_field("1-5").unwrap(), "2,3,4,5,6");
        assert_eq!(day_of_week_field("5-7").unwrap(), "1,6,7");
        assert_eq!(day_of_week_field("*/2").unwrap(), "1,3,5,7");
        assert_eq!(day_of_week_field("mon,FRI").unwrap(), "2,6");
        assert!(day_of_week_field("8").is_err());
        assert!(day_of_week_field("5-1").is_err());
        assert!(day_of_week_field("*/0").is_err());
    }

    #[tokio::test]
    async fn test_cron_weekday_range_skips_weekend() {
        let s = scheduler();
        s.add_cron_job("weekdays", "x", "0 9 * * 1-5", None).await.unwrap();
        let next = s.list_jobs().await[0].next_run.unwrap();
        assert!(!matches!(next.weekday(), Weekday::Sat | Weekday::Sun));
    }

    #[tokio::test]
    async fn test_interval_past_calendar_end_rejected() {
        let s = scheduler();
        let result = s.add_interval_job("far", "x", 100_000_000_000_000, None).await;
        assert!(matches!(result, Err(DomainError::InvalidSchedule { .. })));
        assert!(s.list_jobs().await.is_empty());
    }

    #[tokio::test]
    async fn test_max_jobs() {
        let s = EventScheduler::new(
            Arc::new(EventBus::default()),
            SchedulerConfig {
                max_jobs: 1,
                ..Default::default()
            },
        );
        s.add_interval_job("a", "x", 5, None).await.unwrap();
        assert!(s.add_interval_job("b", "x", 5, None).await.is_err());
        // Replacing an existing id is still allowed
        s.add_interval_job("a", "y", 10, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_job() {
        let s = scheduler();
        s.add_interval_job("a", "x", 5, None).await.unwrap();
        assert!(s.remove_job("a").await);
        assert!(!s.remove_job("a").await);
    }

    #[tokio::test]
    async fn test_fire_due_publishes_event() {
        let bus = Arc::new(EventBus::new(EventBusConfig { poll_interval_ms: 20 }));
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.subscribe(
            "schedule.health_check",
            Arc::new(FnEventHandler::new("collect", move |event: &Event| {
                let _ = tx.send(event.clone());
                Ok(Value::Null)
            })),
        )
        .await;
        let bus_task = bus.clone().spawn();

        let s = EventScheduler::new(bus.clone(), SchedulerConfig::default());
        let mut payload = Map::new();
        payload.insert("scope".to_string(), Value::String("all".to_string()));
        s.add_interval_job("monitor_health_check", "schedule.health_check", 5, Some(payload))
            .await
            .unwrap();

        // Nothing due yet
        assert_eq!(s.fire_due(Utc::now()).await, 0);

        let later = Utc::now() + TimeDelta::minutes(6);
        assert_eq!(s.fire_due(later).await, 1);

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.source, "scheduler:monitor_health_check");
        assert_eq!(event.payload_str("scope"), Some("all"));
        assert_eq!(event.payload_str("scheduled_at"), Some(later.to_rfc3339().as_str()));

        let jobs = s.list_jobs().await;
        let job = &jobs[0];
        assert_eq!(job.fire_count, 1);
        assert!(job.next_run.unwrap() > later);

        bus.stop();
        bus_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_default_schedules() {
        let s = scheduler();
        setup_default_schedules(&s).await.unwrap();
        let jobs = s.list_jobs().await;
        let summary: Vec<_> = jobs.iter().map(|j| (j.id.as_str(), j.trigger.as_str())).collect();
        assert_eq!(
            summary,
            vec![
                ("monitor_health_check", "interval[5m]"),
                ("ads_optimization", "interval[360m]"),
                ("daily_revenue_report", "daily[09:00]"),
                ("weekly_content_calendar", "weekly[mon 09:00]"),
                ("weekly_seo_audit", "weekly[tue 10:00]"),
            ]
        );
    }
}
