//! Daily symptom, flow and mood logs.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::debug;

use crate::client::ApiClient;
use crate::state::{RequestStatus, StateCell};
use crate::types::{DailyLog, FlowLevel};

use super::replace_by_id;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogsState {
    pub daily_logs: Vec<DailyLog>,
    pub status: RequestStatus,
}

tracked_state!(LogsState);

pub struct LogsService {
    api: Arc<ApiClient>,
    state: StateCell<LogsState>,
}

impl LogsService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            state: StateCell::new(LogsState::default()),
        }
    }

    pub fn state(&self) -> LogsState {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<LogsState> {
        self.state.subscribe()
    }

    /// Replace the cached logs, optionally bounded by inclusive dates.
    pub async fn fetch_daily_logs(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        let path = logs_path(start, end);

        self.state.begin();
        match self.api.get::<Vec<DailyLog>>(&path).await {
            Ok(logs) => self.state.succeed(|s| s.daily_logs = logs),
            Err(err) => self.state.fail(&err),
        }
    }

    /// Look up one day's log on the server. Any failure reads as "no log".
    pub async fn fetch_daily_log(&self, date: NaiveDate) -> Option<DailyLog> {
        match self.api.get::<DailyLog>(&format!("/daily-logs/{date}")).await {
            Ok(log) => Some(log),
            Err(err) => {
                debug!(%date, error = %err, "no daily log");
                None
            }
        }
    }

    pub async fn create_daily_log(&self, log: DailyLog) {
        self.state.begin();
        match self.api.post::<DailyLog, DailyLog>("/daily-logs", Some(&log)).await {
            Ok(created) => self.state.succeed(|s| {
                s.daily_logs.insert(0, created);
                // Stable: same-day entries keep their relative order.
                s.daily_logs.sort_by(|a, b| b.date.cmp(&a.date));
            }),
            Err(err) => self.state.fail(&err),
        }
    }

    pub async fn update_daily_log(&self, log: DailyLog) {
        self.state.begin();
        let Some(id) = log.id.clone() else {
            self.state.fail_with("Invalid log ID");
            return;
        };

        match self
            .api
            .put::<DailyLog, DailyLog>(&format!("/daily-logs/{id}"), Some(&log))
            .await
        {
            Ok(updated) => self
                .state
                .succeed(|s| replace_by_id(&mut s.daily_logs, &id, updated, |l| l.id.as_deref())),
            Err(err) => self.state.fail(&err),
        }
    }

    pub async fn delete_daily_log(&self, id: &str) {
        self.state.begin();
        match self.api.delete(&format!("/daily-logs/{id}")).await {
            Ok(()) => self
                .state
                .succeed(|s| s.daily_logs.retain(|l| l.id.as_deref() != Some(id))),
            Err(err) => self.state.fail(&err),
        }
    }

    /// Cached log for `date`, if loaded.
    pub fn log_for(&self, date: NaiveDate) -> Option<DailyLog> {
        self.state
            .read(|s| s.daily_logs.iter().find(|l| l.date == date).cloned())
    }

    pub fn logs_in_range(&self, from: NaiveDate, to: NaiveDate) -> Vec<DailyLog> {
        self.state.read(|s| {
            s.daily_logs
                .iter()
                .filter(|l| from <= l.date && l.date <= to)
                .cloned()
                .collect()
        })
    }

    pub fn symptom_frequency(&self) -> BTreeMap<String, usize> {
        self.state.read(|s| symptom_frequency(&s.daily_logs))
    }

    pub fn flow_level_distribution(&self) -> BTreeMap<FlowLevel, usize> {
        self.state.read(|s| flow_level_distribution(&s.daily_logs))
    }

    pub fn mood_frequency(&self) -> BTreeMap<String, usize> {
        self.state.read(|s| mood_frequency(&s.daily_logs))
    }
}

fn logs_path(start: Option<NaiveDate>, end: Option<NaiveDate>) -> String {
    let mut params = Vec::new();
    if let Some(start) = start {
        params.push(format!("startDate={start}"));
    }
    if let Some(end) = end {
        params.push(format!("endDate={end}"));
    }
    if params.is_empty() {
        "/daily-logs".to_string()
    } else {
        format!("/daily-logs?{}", params.join("&"))
    }
}

pub fn symptom_frequency(logs: &[DailyLog]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for symptom in logs.iter().flat_map(|l| l.symptoms.iter().flatten()) {
        *counts.entry(symptom.clone()).or_insert(0) += 1;
    }
    counts
}

pub fn flow_level_distribution(logs: &[DailyLog]) -> BTreeMap<FlowLevel, usize> {
    let mut counts = BTreeMap::new();
    for level in logs.iter().filter_map(|l| l.flow_level) {
        *counts.entry(level).or_insert(0) += 1;
    }
    counts
}

pub fn mood_frequency(logs: &[DailyLog]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for mood in logs.iter().filter_map(|l| l.mood.as_ref()) {
        *counts.entry(mood.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    fn log(d: u32, flow: Option<FlowLevel>, symptoms: &[&str], mood: Option<&str>) -> DailyLog {
        DailyLog {
            flow_level: flow,
            symptoms: if symptoms.is_empty() {
                None
            } else {
                Some(symptoms.iter().map(|s| s.to_string()).collect())
            },
            mood: mood.map(str::to_string),
            ..DailyLog::new(day(d))
        }
    }

    #[test]
    fn logs_path_without_bounds() {
        assert_eq!(logs_path(None, None), "/daily-logs");
    }

    #[test]
    fn logs_path_with_bounds() {
        assert_eq!(
            logs_path(Some(day(1)), Some(day(30))),
            "/daily-logs?startDate=2025-09-01&endDate=2025-09-30"
        );
        assert_eq!(logs_path(None, Some(day(2))), "/daily-logs?endDate=2025-09-02");
    }

    #[test]
    fn symptom_counts_across_logs() {
        let logs = vec![
            log(1, None, &["cramps", "headache"], None),
            log(2, None, &["cramps"], None),
            log(3, None, &[], None),
        ];
        let counts = symptom_frequency(&logs);
        assert_eq!(counts.get("cramps"), Some(&2));
        assert_eq!(counts.get("headache"), Some(&1));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn flow_distribution_skips_unset() {
        let logs = vec![
            log(1, Some(FlowLevel::Heavy), &[], None),
            log(2, Some(FlowLevel::Heavy), &[], None),
            log(3, Some(FlowLevel::Light), &[], None),
            log(4, None, &[], None),
        ];
        let dist = flow_level_distribution(&logs);
        assert_eq!(dist.get(&FlowLevel::Heavy), Some(&2));
        assert_eq!(dist.get(&FlowLevel::Light), Some(&1));
        assert!(!dist.contains_key(&FlowLevel::None));
    }

    #[test]
    fn mood_counts() {
        let logs = vec![
            log(1, None, &[], Some("calm")),
            log(2, None, &[], Some("calm")),
            log(3, None, &[], Some("irritable")),
        ];
        let counts = mood_frequency(&logs);
        assert_eq!(counts.get("calm"), Some(&2));
        assert_eq!(counts.get("irritable"), Some(&1));
    }
}
