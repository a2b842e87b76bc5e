//! Process-wide wiring: one client, one token store, all services.

use std::sync::Arc;

use tracing::info;

use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::services::{
    AuthService, CyclesService, InsightsService, LogsService, PredictionsService, SettingsService,
};
use crate::token_store::TokenStore;
use crate::transport::{ReqwestTransport, Transport, TransportError};

/// Everything a front end needs, created once at startup.
pub struct AppEnvironment {
    pub api: Arc<ApiClient>,
    pub auth: AuthService,
    pub cycles: CyclesService,
    pub logs: LogsService,
    pub insights: InsightsService,
    pub predictions: PredictionsService,
    pub settings: SettingsService,
}

impl AppEnvironment {
    /// Wire services over `transport`, restoring any stored token onto the
    /// client so early requests are already authenticated.
    pub fn new(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        token_store: Arc<dyn TokenStore>,
    ) -> Self {
        let api = Arc::new(ApiClient::new(&config.base_url, transport));
        api.set_auth_token(token_store.retrieve_token());

        Self {
            auth: AuthService::new(api.clone(), token_store),
            cycles: CyclesService::new(api.clone()),
            logs: LogsService::new(api.clone()),
            insights: InsightsService::new(api.clone()),
            predictions: PredictionsService::new(api.clone()),
            settings: SettingsService::new(api.clone()),
            api,
        }
    }

    /// `new` with the production `reqwest` transport.
    pub fn from_config(
        config: &ClientConfig,
        token_store: Arc<dyn TokenStore>,
    ) -> Result<Self, TransportError> {
        let transport = Arc::new(ReqwestTransport::new(config)?);
        Ok(Self::new(config, transport, token_store))
    }

    /// Verify the restored session, if any.
    pub async fn start(&self) {
        info!(base_url = %self.api.base_url(), "starting cycle client");
        self.auth.check_authentication_status().await;
    }
}
