//! Per-user preferences.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::client::ApiClient;
use crate::state::{RequestStatus, StateCell};
use crate::types::{ReminderSettings, UserSettings, DEFAULT_CYCLE_LENGTH, DEFAULT_PERIOD_LENGTH};

const SETTINGS_PATH: &str = "/settings";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsState {
    pub user_settings: Option<UserSettings>,
    pub status: RequestStatus,
}

tracked_state!(SettingsState);

pub struct SettingsService {
    api: Arc<ApiClient>,
    state: StateCell<SettingsState>,
}

impl SettingsService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            state: StateCell::new(SettingsState::default()),
        }
    }

    pub fn state(&self) -> SettingsState {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SettingsState> {
        self.state.subscribe()
    }

    /// Load settings, creating the defaults on the server the first time.
    pub async fn fetch_settings(&self) {
        self.state.begin();
        match self.api.get::<UserSettings>(SETTINGS_PATH).await {
            Ok(settings) => self.state.succeed(|s| s.user_settings = Some(settings)),
            Err(err) if err.is_not_found() => {
                info!("no settings stored yet, creating defaults");
                self.create_default_settings().await;
            }
            Err(err) => self.state.fail(&err),
        }
    }

    pub async fn create_default_settings(&self) {
        self.update_settings(UserSettings::default()).await;
    }

    pub async fn update_settings(&self, settings: UserSettings) {
        self.state.begin();
        match self
            .api
            .put::<UserSettings, UserSettings>(SETTINGS_PATH, Some(&settings))
            .await
        {
            Ok(updated) => self.state.succeed(|s| s.user_settings = Some(updated)),
            Err(err) => self.state.fail(&err),
        }
    }

    pub async fn update_cycle_length(&self, length: u32) {
        self.modify(|s| s.cycle_length = Some(length)).await;
    }

    pub async fn update_period_length(&self, length: u32) {
        self.modify(|s| s.period_length = Some(length)).await;
    }

    pub async fn update_reminder_settings(&self, reminders: ReminderSettings) {
        self.modify(|s| s.reminder_settings = Some(reminders)).await;
    }

    pub async fn update_dark_mode(&self, enabled: bool) {
        self.modify(|s| s.dark_mode = Some(enabled)).await;
    }

    pub async fn update_notifications(&self, enabled: bool) {
        self.modify(|s| s.notifications = Some(enabled)).await;
    }

    /// Copy, change and save the loaded settings. Does nothing before they load.
    async fn modify(&self, change: impl FnOnce(&mut UserSettings)) {
        let Some(mut settings) = self.state.read(|s| s.user_settings.clone()) else {
            return;
        };
        change(&mut settings);
        self.update_settings(settings).await;
    }

    pub fn cycle_length(&self) -> u32 {
        self.field(|s| s.cycle_length).unwrap_or(DEFAULT_CYCLE_LENGTH)
    }

    pub fn period_length(&self) -> u32 {
        self.field(|s| s.period_length).unwrap_or(DEFAULT_PERIOD_LENGTH)
    }

    pub fn is_dark_mode_enabled(&self) -> bool {
        self.field(|s| s.dark_mode).unwrap_or(false)
    }

    pub fn are_notifications_enabled(&self) -> bool {
        self.field(|s| s.notifications).unwrap_or(true)
    }

    pub fn reminder_settings(&self) -> ReminderSettings {
        self.field(|s| s.reminder_settings).unwrap_or_default()
    }

    fn field<T>(&self, get: impl FnOnce(&UserSettings) -> Option<T>) -> Option<T> {
        self.state.read(|s| s.user_settings.as_ref().and_then(get))
    }
}
