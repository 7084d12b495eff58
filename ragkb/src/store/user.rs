//! The signed-in user and their credentials.
//!
//! Memory mirrors client storage: every change to the token pair or the
//! cached profile is written through, and construction reads it back.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::Loading;
use crate::api::auth::{self, LoginForm};
use crate::error::ApiError;
use crate::http::HttpClient;
use crate::models::{LoginResponse, Role, User};
use crate::router::{AuthSnapshot, Navigator, LOGIN_PATH};
use crate::storage::{ClientStorage, ACCESS_TOKEN, REFRESH_TOKEN, USER_INFO};

#[derive(Debug, Default)]
struct UserState {
    token: Option<String>,
    refresh_token: Option<String>,
    user_info: Option<User>,
}

impl UserState {
    fn load(storage: &dyn ClientStorage) -> Self {
        let read = |key: &str| match storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "failed to read storage");
                None
            }
        };

        let user_info = read(USER_INFO).and_then(|raw| match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "ignoring malformed cached profile");
                None
            }
        });

        Self {
            token: read(ACCESS_TOKEN),
            refresh_token: read(REFRESH_TOKEN),
            user_info,
        }
    }
}

pub struct UserStore {
    client: Arc<HttpClient>,
    storage: Arc<dyn ClientStorage>,
    navigator: Arc<dyn Navigator>,
    state: RwLock<UserState>,
    loading: Loading,
}

impl UserStore {
    pub fn new(
        client: Arc<HttpClient>,
        storage: Arc<dyn ClientStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let state = UserState::load(storage.as_ref());
        Self {
            client,
            storage,
            navigator,
            state: RwLock::new(state),
            loading: Loading::default(),
        }
    }

    /// Re-read credentials from storage, picking up changes made elsewhere
    /// such as the client dropping them after a 401.
    pub async fn reload(&self) {
        *self.state.write().await = UserState::load(self.storage.as_ref());
    }

    /// Exchange credentials for tokens and persist them with the profile.
    pub async fn login(&self, form: &LoginForm) -> Result<User, ApiError> {
        let _loading = self.loading.start();
        let response = self
            .client
            .call(auth::login(form))
            .await
            .and_then(|r| r.require_data())
            .inspect_err(|e| error!(username = %form.username, error = %e, "login failed"))?;

        let user = self.persist(response).await?;
        info!(username = %user.username, "logged in");
        Ok(user)
    }

    /// End the session. Local state is cleared even when the server call fails.
    pub async fn logout(&self) {
        let _loading = self.loading.start();
        if let Err(e) = self.client.call(auth::logout()).await {
            warn!(error = %e, "server logout failed; clearing local session anyway");
        }

        self.clear_user_info().await;
        self.navigator.push(LOGIN_PATH);
        info!("logged out");
    }

    /// Refresh the cached profile from the server.
    pub async fn fetch_current_user(&self) -> Result<User, ApiError> {
        let _loading = self.loading.start();
        let user = self
            .client
            .call(auth::current_user())
            .await
            .and_then(|r| r.require_data())
            .inspect_err(|e| error!(error = %e, "failed to fetch current user"))?;

        self.store_user_info(&user)?;
        self.state.write().await.user_info = Some(user.clone());
        Ok(user)
    }

    /// Trade the stored refresh token for a new token pair.
    pub async fn refresh_session(&self) -> Result<User, ApiError> {
        let Some(refresh_token) = self.state.read().await.refresh_token.clone() else {
            return Err(ApiError::InvalidRequest("no refresh token stored".to_string()));
        };

        let _loading = self.loading.start();
        let response = self
            .client
            .call(auth::refresh_token(&refresh_token))
            .await
            .and_then(|r| r.require_data())
            .inspect_err(|e| error!(error = %e, "token refresh failed"))?;

        let user = self.persist(response).await?;
        debug!("session refreshed");
        Ok(user)
    }

    /// Drop the token pair and cached profile from memory and storage.
    /// No server call and no navigation.
    pub async fn clear_user_info(&self) {
        *self.state.write().await = UserState::default();
        if let Err(e) = self.storage.clear_credentials() {
            warn!(error = %e, "failed to clear stored credentials");
        }
    }

    async fn persist(&self, response: LoginResponse) -> Result<User, ApiError> {
        self.storage.set(ACCESS_TOKEN, &response.access_token)?;
        self.storage.set(REFRESH_TOKEN, &response.refresh_token)?;
        self.store_user_info(&response.user)?;

        let mut state = self.state.write().await;
        state.token = Some(response.access_token);
        state.refresh_token = Some(response.refresh_token);
        state.user_info = Some(response.user.clone());
        Ok(response.user)
    }

    fn store_user_info(&self, user: &User) -> Result<(), ApiError> {
        let encoded = serde_json::to_string(user).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.storage.set(USER_INFO, &encoded)?;
        Ok(())
    }

    pub async fn token(&self) -> Option<String> {
        self.state.read().await.token.clone()
    }

    pub async fn user_info(&self) -> Option<User> {
        self.state.read().await.user_info.clone()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.state
            .read()
            .await
            .token
            .as_deref()
            .is_some_and(|t| !t.is_empty())
    }

    pub async fn username(&self) -> Option<String> {
        self.state
            .read()
            .await
            .user_info
            .as_ref()
            .map(|u| u.username.clone())
    }

    /// Real name when set, otherwise the username.
    pub async fn display_name(&self) -> Option<String> {
        self.state
            .read()
            .await
            .user_info
            .as_ref()
            .map(|u| u.display_name().to_string())
    }

    pub async fn avatar(&self) -> Option<String> {
        self.state
            .read()
            .await
            .user_info
            .as_ref()
            .map(|u| u.avatar.clone())
            .filter(|a| !a.is_empty())
    }

    pub async fn roles(&self) -> Vec<Role> {
        self.state
            .read()
            .await
            .user_info
            .as_ref()
            .map(|u| u.roles.clone())
            .unwrap_or_default()
    }

    /// Whether the cached profile holds the admin role.
    pub async fn is_admin(&self) -> bool {
        self.state
            .read()
            .await
            .user_info
            .as_ref()
            .is_some_and(User::has_admin_role)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    /// The flags the navigation guard decides on.
    pub async fn snapshot(&self) -> AuthSnapshot {
        AuthSnapshot {
            logged_in: self.is_logged_in().await,
            admin: self.is_admin().await,
        }
    }
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}
