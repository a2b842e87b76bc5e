//! Period and ovulation predictions, plus phase and fertility readouts
//! derived from the latest one.
//!
//! Every derived value takes `today` explicitly; the service never reads the
//! wall clock.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::debug;

use crate::client::ApiClient;
use crate::state::{RequestStatus, StateCell};
use crate::types::{FertilityWindow, Prediction};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictionsState {
    pub latest_prediction: Option<Prediction>,
    pub status: RequestStatus,
}

tracked_state!(PredictionsState);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CyclePhase {
    Menstrual,
    Follicular,
    Ovulation,
    Luteal,
    Unknown,
}

impl CyclePhase {
    pub fn display_name(self) -> &'static str {
        match self {
            CyclePhase::Menstrual => "Menstrual",
            CyclePhase::Follicular => "Follicular",
            CyclePhase::Ovulation => "Ovulation",
            CyclePhase::Luteal => "Luteal",
            CyclePhase::Unknown => "Unknown",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            CyclePhase::Menstrual => "Your period is here. Focus on rest and self-care.",
            CyclePhase::Follicular => "Your energy is building. Great time for new activities.",
            CyclePhase::Ovulation => "Peak fertility window. Your energy is at its highest.",
            CyclePhase::Luteal => "Pre-menstrual phase. Listen to your body's needs.",
            CyclePhase::Unknown => "Keep tracking to get personalized insights.",
        }
    }
}

pub struct PredictionsService {
    api: Arc<ApiClient>,
    state: StateCell<PredictionsState>,
}

impl PredictionsService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            state: StateCell::new(PredictionsState::default()),
        }
    }

    pub fn state(&self) -> PredictionsState {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<PredictionsState> {
        self.state.subscribe()
    }

    /// Load the newest prediction. A 404 means none has been generated yet.
    pub async fn fetch_latest_prediction(&self) {
        self.state.begin();
        match self.api.get::<Prediction>("/predictions/latest").await {
            Ok(prediction) => self.state.succeed(|s| s.latest_prediction = Some(prediction)),
            Err(err) if err.is_not_found() => {
                debug!("no prediction generated yet");
                self.state.succeed(|s| s.latest_prediction = None);
            }
            Err(err) => self.state.fail(&err),
        }
    }

    pub async fn generate_prediction(&self) {
        self.state.begin();
        match self.api.post_empty::<Prediction>("/predictions/generate").await {
            Ok(prediction) => self.state.succeed(|s| s.latest_prediction = Some(prediction)),
            Err(err) => self.state.fail(&err),
        }
    }

    pub fn latest_prediction(&self) -> Option<Prediction> {
        self.state.read(|s| s.latest_prediction.clone())
    }

    pub fn next_period_date(&self) -> Option<NaiveDate> {
        self.state
            .read(|s| s.latest_prediction.as_ref().and_then(|p| p.next_period_date))
    }

    pub fn ovulation_date(&self) -> Option<NaiveDate> {
        self.state
            .read(|s| s.latest_prediction.as_ref().and_then(|p| p.ovulation_date))
    }

    pub fn fertility_window(&self) -> Option<FertilityWindow> {
        self.state
            .read(|s| s.latest_prediction.as_ref().and_then(|p| p.fertility_window))
    }

    pub fn confidence_level(&self) -> u8 {
        self.state
            .read(|s| s.latest_prediction.as_ref().and_then(|p| p.confidence))
            .unwrap_or(0)
    }

    pub fn days_until_next_period(&self, today: NaiveDate) -> Option<i64> {
        self.next_period_date().map(|d| days_between(today, d))
    }

    pub fn days_until_ovulation(&self, today: NaiveDate) -> Option<i64> {
        self.ovulation_date().map(|d| days_between(today, d))
    }

    pub fn current_phase(&self, today: NaiveDate) -> CyclePhase {
        self.state
            .read(|s| current_phase(s.latest_prediction.as_ref(), today))
    }

    pub fn is_in_fertile_window(&self, today: NaiveDate) -> bool {
        self.fertility_window().is_some_and(|w| w.contains(today))
    }

    pub fn fertility_status(&self, today: NaiveDate) -> &'static str {
        self.state
            .read(|s| fertility_status(s.latest_prediction.as_ref(), today))
    }
}

fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Phase for `today` given the latest prediction.
///
/// Ovulation date takes precedence: within a day of it is ovulation, more
/// than five days before is follicular, more than a day after is luteal.
/// Otherwise a next period within five days reads as menstrual.
pub fn current_phase(prediction: Option<&Prediction>, today: NaiveDate) -> CyclePhase {
    let Some(prediction) = prediction else {
        return CyclePhase::Unknown;
    };

    if let Some(ovulation) = prediction.ovulation_date {
        let since_ovulation = days_between(ovulation, today);
        if since_ovulation.abs() <= 1 {
            return CyclePhase::Ovulation;
        }
        if since_ovulation < -5 {
            return CyclePhase::Follicular;
        }
        if since_ovulation > 1 {
            return CyclePhase::Luteal;
        }
    }

    if let Some(next_period) = prediction.next_period_date {
        if (0..=5).contains(&days_between(today, next_period)) {
            return CyclePhase::Menstrual;
        }
    }

    CyclePhase::Unknown
}

pub fn fertility_status(prediction: Option<&Prediction>, today: NaiveDate) -> &'static str {
    let Some(prediction) = prediction else {
        return "Unknown";
    };
    if prediction.fertility_window.is_some_and(|w| w.contains(today)) {
        return "High fertility";
    }
    match prediction.ovulation_date.map(|d| days_between(today, d)) {
        Some(1..=5) => "Approaching fertile window",
        Some(-14..=-1) => "Low fertility",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn prediction(next_period: Option<NaiveDate>, ovulation: Option<NaiveDate>) -> Prediction {
        Prediction {
            id: Some("p1".to_string()),
            user_id: "u1".to_string(),
            next_period_date: next_period,
            ovulation_date: ovulation,
            fertility_window: ovulation.map(|o| FertilityWindow {
                start: o - chrono::Days::new(5),
                end: o + chrono::Days::new(1),
            }),
            confidence: Some(80),
            generated_at: None,
        }
    }

    #[test]
    fn phase_is_unknown_without_prediction() {
        assert_eq!(current_phase(None, day(9, 1)), CyclePhase::Unknown);
    }

    #[test]
    fn phase_around_ovulation() {
        let p = prediction(Some(day(9, 28)), Some(day(9, 14)));
        assert_eq!(current_phase(Some(&p), day(9, 13)), CyclePhase::Ovulation);
        assert_eq!(current_phase(Some(&p), day(9, 14)), CyclePhase::Ovulation);
        assert_eq!(current_phase(Some(&p), day(9, 15)), CyclePhase::Ovulation);
        assert_eq!(current_phase(Some(&p), day(9, 16)), CyclePhase::Luteal);
        assert_eq!(current_phase(Some(&p), day(9, 8)), CyclePhase::Follicular);
    }

    #[test]
    fn phase_gap_before_ovulation_falls_through_to_period_check() {
        // Two to five days before ovulation is neither follicular nor ovulation.
        let p = prediction(Some(day(9, 28)), Some(day(9, 14)));
        assert_eq!(current_phase(Some(&p), day(9, 10)), CyclePhase::Unknown);
    }

    #[test]
    fn phase_menstrual_when_period_is_close() {
        let p = prediction(Some(day(9, 28)), None);
        assert_eq!(current_phase(Some(&p), day(9, 25)), CyclePhase::Menstrual);
        assert_eq!(current_phase(Some(&p), day(9, 28)), CyclePhase::Menstrual);
        assert_eq!(current_phase(Some(&p), day(9, 20)), CyclePhase::Unknown);
        assert_eq!(current_phase(Some(&p), day(9, 29)), CyclePhase::Unknown);
    }

    #[test]
    fn fertility_status_by_distance_to_ovulation() {
        let p = prediction(None, Some(day(9, 14)));
        assert_eq!(fertility_status(Some(&p), day(9, 12)), "High fertility");
        let windowless = Prediction {
            fertility_window: None,
            ..p.clone()
        };
        assert_eq!(
            fertility_status(Some(&windowless), day(9, 10)),
            "Approaching fertile window"
        );
        assert_eq!(fertility_status(Some(&p), day(9, 20)), "Low fertility");
        assert_eq!(fertility_status(Some(&p), day(10, 20)), "Unknown");
        assert_eq!(fertility_status(None, day(9, 14)), "Unknown");
    }

    #[test]
    fn phase_copy() {
        assert_eq!(CyclePhase::Luteal.display_name(), "Luteal");
        assert!(CyclePhase::Unknown.description().contains("tracking"));
    }
}
