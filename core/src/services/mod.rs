//! Domain services over the shared `ApiClient`.
//!
//! Each service owns a `StateCell` with its cached records plus a
//! `RequestStatus`, and exposes one async method per backend operation.
//! Failures never escape: they become the user-facing message in
//! `error_message`, except where a service absorbs a specific status
//! (404 meaning "nothing yet", 401 during startup meaning "log out").

/// Implement `Tracked` for a state struct with a `status` field.
macro_rules! tracked_state {
    ($ty:ty) => {
        impl $crate::state::Tracked for $ty {
            fn status(&self) -> &$crate::state::RequestStatus {
                &self.status
            }

            fn status_mut(&mut self) -> &mut $crate::state::RequestStatus {
                &mut self.status
            }
        }
    };
}

pub mod auth;
pub mod cycles;
pub mod insights;
pub mod logs;
pub mod predictions;
pub mod settings;

pub use auth::{AuthService, AuthState};
pub use cycles::{CyclesService, CyclesState};
pub use insights::{InsightsService, InsightsState};
pub use logs::{LogsService, LogsState};
pub use predictions::{CyclePhase, PredictionsService, PredictionsState};
pub use settings::{SettingsService, SettingsState};

/// Replace the element whose id matches `id`; no-op if absent.
pub(crate) fn replace_by_id<T>(items: &mut [T], id: &str, value: T, id_of: impl Fn(&T) -> Option<&str>) {
    if let Some(slot) = items.iter_mut().find(|item| id_of(item) == Some(id)) {
        *slot = value;
    }
}
