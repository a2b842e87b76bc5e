//! Session management: login, registration, startup token verification.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::state::{RequestStatus, StateCell};
use crate::token_store::TokenStore;
use crate::types::{AuthResponse, LoginRequest, RegisterRequest, User};

const PROFILE_PATH: &str = "/user/profile";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub current_user: Option<User>,
    pub status: RequestStatus,
}

tracked_state!(AuthState);

pub struct AuthService {
    api: Arc<ApiClient>,
    token_store: Arc<dyn TokenStore>,
    state: StateCell<AuthState>,
}

impl AuthService {
    pub fn new(api: Arc<ApiClient>, token_store: Arc<dyn TokenStore>) -> Self {
        Self {
            api,
            token_store,
            state: StateCell::new(AuthState::default()),
        }
    }

    pub fn state(&self) -> AuthState {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read(|s| s.is_authenticated)
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.read(|s| s.current_user.clone())
    }

    /// Restore a stored token and verify it against the profile endpoint.
    ///
    /// A 401 ends the session; any other failure leaves the token in place
    /// so the next call can retry with it.
    pub async fn check_authentication_status(&self) {
        let Some(token) = self.token_store.retrieve_token() else {
            return;
        };
        self.api.set_auth_token(Some(token));

        match self.api.get::<User>(PROFILE_PATH).await {
            Ok(user) => self.state.update(|s| {
                s.current_user = Some(user);
                s.is_authenticated = true;
            }),
            Err(ApiError::Unauthorized) => {
                info!("stored token rejected, logging out");
                self.logout().await;
            }
            Err(err) => warn!(error = %err, "failed to verify auth token"),
        }
    }

    pub async fn login(&self, email: &str, password: &str) {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.authenticate("/auth/login", &request).await;
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) {
        let request = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            first_name,
            last_name,
        };
        self.authenticate("/auth/register", &request).await;
    }

    async fn authenticate<B>(&self, path: &str, body: &B)
    where
        B: serde::Serialize + Sync,
    {
        self.state.begin();
        match self.api.post::<B, AuthResponse>(path, Some(body)).await {
            Ok(AuthResponse { user, token }) => {
                if let Err(e) = self.token_store.store_token(&token) {
                    warn!(error = %e, "failed to persist auth token");
                }
                self.api.set_auth_token(Some(token));
                self.state.succeed(|s| {
                    s.current_user = Some(user);
                    s.is_authenticated = true;
                });
            }
            Err(err) => self.state.fail(&err),
        }
    }

    pub async fn logout(&self) {
        if let Err(e) = self.token_store.delete_token() {
            warn!(error = %e, "failed to delete stored auth token");
        }
        self.api.set_auth_token(None);
        self.state.update(|s| {
            s.current_user = None;
            s.is_authenticated = false;
            s.status.error_message = None;
        });
    }

    /// Update the current user's names. Does nothing when logged out.
    pub async fn update_profile(&self, first_name: Option<String>, last_name: Option<String>) {
        let Some(mut user) = self.current_user() else {
            return;
        };
        user.first_name = first_name;
        user.last_name = last_name;

        self.state.begin();
        match self.api.put::<User, User>(PROFILE_PATH, Some(&user)).await {
            Ok(updated) => self.state.succeed(|s| s.current_user = Some(updated)),
            Err(err) => self.state.fail(&err),
        }
    }
}
