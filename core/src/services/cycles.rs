//! Cycle history and the current cycle.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::debug;

use crate::client::ApiClient;
use crate::state::{RequestStatus, StateCell};
use crate::types::{Cycle, DEFAULT_CYCLE_LENGTH, DEFAULT_PERIOD_LENGTH};

use super::replace_by_id;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CyclesState {
    /// Newest first.
    pub cycles: Vec<Cycle>,
    pub current_cycle: Option<Cycle>,
    pub status: RequestStatus,
}

tracked_state!(CyclesState);

pub struct CyclesService {
    api: Arc<ApiClient>,
    state: StateCell<CyclesState>,
}

impl CyclesService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            state: StateCell::new(CyclesState::default()),
        }
    }

    pub fn state(&self) -> CyclesState {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<CyclesState> {
        self.state.subscribe()
    }

    pub async fn fetch_cycles(&self) {
        self.state.begin();
        match self.api.get::<Vec<Cycle>>("/cycles").await {
            Ok(cycles) => self.state.succeed(|s| s.cycles = cycles),
            Err(err) => self.state.fail(&err),
        }
    }

    /// Load the open cycle. A 404 means none is open and is not an error.
    pub async fn fetch_current_cycle(&self) {
        self.state.begin();
        match self.api.get::<Cycle>("/cycles/current").await {
            Ok(cycle) => self.state.succeed(|s| s.current_cycle = Some(cycle)),
            Err(err) if err.is_not_found() => {
                debug!("no current cycle");
                self.state.succeed(|s| s.current_cycle = None);
            }
            Err(err) => self.state.fail(&err),
        }
    }

    /// Start a cycle; it becomes both the newest entry and the current cycle.
    pub async fn create_cycle(&self, start_date: NaiveDate, end_date: Option<NaiveDate>) {
        let draft = Cycle::new(start_date, end_date);

        self.state.begin();
        match self.api.post::<Cycle, Cycle>("/cycles", Some(&draft)).await {
            Ok(created) => self.state.succeed(|s| {
                s.cycles.insert(0, created.clone());
                s.current_cycle = Some(created);
            }),
            Err(err) => self.state.fail(&err),
        }
    }

    pub async fn update_cycle(&self, cycle: Cycle) {
        self.state.begin();
        let Some(id) = cycle.id.clone() else {
            self.state.fail_with("Invalid cycle ID");
            return;
        };

        match self
            .api
            .put::<Cycle, Cycle>(&format!("/cycles/{id}"), Some(&cycle))
            .await
        {
            Ok(updated) => self.state.succeed(|s| {
                if s.current_cycle.as_ref().and_then(|c| c.id.as_deref()) == Some(id.as_str()) {
                    s.current_cycle = Some(updated.clone());
                }
                replace_by_id(&mut s.cycles, &id, updated, |c| c.id.as_deref());
            }),
            Err(err) => self.state.fail(&err),
        }
    }

    pub async fn delete_cycle(&self, id: &str) {
        self.state.begin();
        match self.api.delete(&format!("/cycles/{id}")).await {
            Ok(()) => self.state.succeed(|s| {
                s.cycles.retain(|c| c.id.as_deref() != Some(id));
                if s.current_cycle.as_ref().and_then(|c| c.id.as_deref()) == Some(id) {
                    s.current_cycle = None;
                }
            }),
            Err(err) => self.state.fail(&err),
        }
    }

    pub fn average_cycle_length(&self) -> f64 {
        self.state.read(|s| average_cycle_length(&s.cycles))
    }

    pub fn average_period_length(&self) -> f64 {
        self.state.read(|s| average_period_length(&s.cycles))
    }
}

/// Mean length of completed cycles that report one; 28 when there are none.
pub fn average_cycle_length(cycles: &[Cycle]) -> f64 {
    let lengths: Vec<u32> = cycles
        .iter()
        .filter(|c| c.is_complete == Some(true))
        .filter_map(|c| c.cycle_length)
        .collect();
    mean(&lengths).unwrap_or(f64::from(DEFAULT_CYCLE_LENGTH))
}

/// Mean recorded period length; 5 when none are recorded.
pub fn average_period_length(cycles: &[Cycle]) -> f64 {
    let lengths: Vec<u32> = cycles.iter().filter_map(|c| c.period_length).collect();
    mean(&lengths).unwrap_or(f64::from(DEFAULT_PERIOD_LENGTH))
}

fn mean(values: &[u32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let total: u64 = values.iter().map(|&v| u64::from(v)).sum();
    Some(total as f64 / values.len() as f64)
}
