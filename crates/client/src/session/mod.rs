//! Authentication state, token expiry, preferences and session metadata.
//!
//! # State machine
//!
//! ```text
//! Unauthenticated --begin_login--> Authenticating --login--> Authenticated
//!        ^                               |                        |
//!        +---------abort_login-----------+                        |
//!        +-------------------logout / expiry----------------------+
//! ```
//!
//! The manager owns the in-memory copy; every mutation is written through
//! to the [`Store`].

mod activity;
mod history;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use kisan_setu_core::{
    Language, LoginRecord, Preferences, PreferencesUpdate, SessionInfo, SessionUpdate, User,
    UserUpdate,
};
use tokio::sync::RwLock;

use crate::store::{Store, keys};

pub use activity::{ACTIVITY_WINDOW, ActivityDebouncer, ActivityKind, ActivityMonitor};
pub use history::{LoginHistory, MAX_LOGIN_HISTORY};

/// Token lifetime when "remember me" is checked.
pub const REMEMBER_ME_TTL: Duration = Duration::days(30);

/// Token lifetime otherwise.
pub const SESSION_TTL: Duration = Duration::days(1);

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}

/// How a login came about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOptions {
    pub remember_me: bool,
    /// `password`, `demo`, `register`, ...
    pub method: String,
    /// Free-form device descriptor.
    pub device: String,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            remember_me: false,
            method: "password".to_string(),
            device: default_device(),
        }
    }
}

/// `"<os>/<arch>"` for the running process.
#[must_use]
pub fn default_device() -> String {
    format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH)
}

#[derive(Debug, Default)]
struct SessionState {
    auth: AuthState,
    user: Option<User>,
    preferences: Preferences,
    session: Option<SessionInfo>,
}

/// Owns the signed-in user and everything scoped to them.
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct AuthManager {
    inner: Arc<AuthManagerInner>,
}

#[derive(Debug)]
struct AuthManagerInner {
    store: Store,
    history: LoginHistory,
    state: RwLock<SessionState>,
}

impl AuthManager {
    /// A manager in the `Unauthenticated` state. Call [`restore`](Self::restore)
    /// to pick up a persisted session.
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self {
            inner: Arc::new(AuthManagerInner {
                history: LoginHistory::new(store.clone()),
                store,
                state: RwLock::new(SessionState::default()),
            }),
        }
    }

    /// Load the persisted session.
    ///
    /// A user whose token has expired is purged along with the rest of the
    /// session keys. Unreadable data counts as no session.
    pub async fn restore(&self) -> AuthState {
        self.restore_at(Utc::now()).await
    }

    async fn restore_at(&self, now: DateTime<Utc>) -> AuthState {
        let store = &self.inner.store;
        let mut state = self.inner.state.write().await;

        let Some(user) = store.get::<User>(keys::CURRENT_USER) else {
            *state = SessionState::default();
            return AuthState::Unauthenticated;
        };

        if user.is_expired_at(now) {
            tracing::info!(username = %user.username, "Persisted session expired");
            store.clear(keys::SESSION_KEYS);
            *state = SessionState::default();
            return AuthState::Unauthenticated;
        }

        tracing::debug!(username = %user.username, "Restored session");
        *state = SessionState {
            auth: AuthState::Authenticated,
            preferences: store.get(keys::PREFERENCES).unwrap_or_default(),
            session: store.get(keys::SESSION),
            user: Some(user),
        };
        AuthState::Authenticated
    }

    /// Move to `Authenticating` ahead of a network login.
    ///
    /// Returns `false` (and changes nothing) unless currently
    /// `Unauthenticated`.
    pub async fn begin_login(&self) -> bool {
        let mut state = self.inner.state.write().await;
        if state.auth != AuthState::Unauthenticated {
            return false;
        }
        state.auth = AuthState::Authenticating;
        true
    }

    /// Return to `Unauthenticated` after a failed login attempt.
    pub async fn abort_login(&self) {
        let mut state = self.inner.state.write().await;
        if state.auth == AuthState::Authenticating {
            state.auth = AuthState::Unauthenticated;
        }
    }

    /// Establish a session for `user`.
    ///
    /// Stamps login time, last activity and token expiry, resets preferences
    /// to defaults (keeping the saved language), records the login in the
    /// local history, and persists everything. Returns the stamped user.
    pub async fn login(&self, user: User, options: LoginOptions) -> User {
        self.login_at(user, options, Utc::now()).await
    }

    async fn login_at(&self, mut user: User, options: LoginOptions, now: DateTime<Utc>) -> User {
        let ttl = if options.remember_me {
            REMEMBER_ME_TTL
        } else {
            SESSION_TTL
        };
        user.login_time = Some(now);
        user.last_activity = Some(now);
        user.token_expiry = Some(now + ttl);

        let preferences = Preferences {
            language: self.language(),
            ..Preferences::default()
        };
        let session = SessionInfo {
            session_id: uuid::Uuid::new_v4().to_string(),
            login_method: options.method,
            device: options.device,
            login_time: now,
            remember_me: options.remember_me,
        };

        // Held across the writes so a concurrent logout cannot interleave
        let mut state = self.inner.state.write().await;

        let store = &self.inner.store;
        store.set(keys::CURRENT_USER, &user);
        store.set(keys::PREFERENCES, &preferences);
        store.set(keys::SESSION, &session);

        self.inner.history.record(LoginRecord {
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            login_time: now,
            session_id: session.session_id.clone(),
            device: session.device.clone(),
        });

        tracing::info!(
            username = %user.username,
            role = %user.role,
            method = %session.login_method,
            remember_me = session.remember_me,
            "User logged in"
        );

        *state = SessionState {
            auth: AuthState::Authenticated,
            user: Some(user.clone()),
            preferences,
            session: Some(session),
        };
        user
    }

    /// End the session and purge user, preferences, session and cart.
    pub async fn logout(&self) {
        let mut state = self.inner.state.write().await;
        if let Some(user) = &state.user {
            tracing::info!(username = %user.username, "User logged out");
        }
        self.inner.store.clear(keys::SESSION_KEYS);
        *state = SessionState::default();
    }

    /// Expire the session if its token has lapsed or the persisted user was
    /// removed (for example after a 401).
    ///
    /// Returns `true` if the session was live and has now ended.
    pub async fn check_expiry(&self) -> bool {
        self.check_expiry_at(Utc::now()).await
    }

    async fn check_expiry_at(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.inner.state.write().await;
        if state.auth != AuthState::Authenticated {
            return false;
        }

        let expired = state.user.as_ref().is_none_or(|u| u.is_expired_at(now));
        let revoked = !self.inner.store.contains(keys::CURRENT_USER);
        if !expired && !revoked {
            return false;
        }

        tracing::info!(expired, revoked, "Session ended");
        self.inner.store.clear(keys::SESSION_KEYS);
        *state = SessionState::default();
        true
    }

    /// Shallow-merge profile fields into the current user.
    ///
    /// Returns the updated user, or `None` when nobody is signed in.
    pub async fn update_user(&self, update: UserUpdate) -> Option<User> {
        let mut state = self.inner.state.write().await;
        let user = state.user.as_mut()?;
        user.apply(update);
        self.inner.store.set(keys::CURRENT_USER, user);
        Some(user.clone())
    }

    /// Shallow-merge preferences and persist them.
    pub async fn update_preferences(&self, update: PreferencesUpdate) -> Preferences {
        let mut state = self.inner.state.write().await;
        if let Some(language) = update.language {
            self.inner.store.set(keys::LANGUAGE, &language);
        }
        state.preferences.apply(update);
        self.inner.store.set(keys::PREFERENCES, &state.preferences);
        state.preferences.clone()
    }

    /// Shallow-merge session metadata. No-op without a session.
    pub async fn update_session(&self, update: SessionUpdate) -> Option<SessionInfo> {
        let mut state = self.inner.state.write().await;
        let session = state.session.as_mut()?;
        session.apply(update);
        self.inner.store.set(keys::SESSION, session);
        Some(session.clone())
    }

    /// Refresh the user's last-activity timestamp.
    pub async fn update_activity(&self) {
        let mut state = self.inner.state.write().await;
        if let Some(user) = state.user.as_mut() {
            user.last_activity = Some(Utc::now());
            self.inner.store.set(keys::CURRENT_USER, user);
        }
    }

    /// Persist the display language. Survives logout.
    pub async fn set_language(&self, language: Language) {
        self.update_preferences(PreferencesUpdate {
            language: Some(language),
            ..PreferencesUpdate::default()
        })
        .await;
    }

    /// The saved display language (Hindi by default).
    #[must_use]
    pub fn language(&self) -> Language {
        self.inner.store.get(keys::LANGUAGE).unwrap_or_default()
    }

    pub async fn state(&self) -> AuthState {
        self.inner.state.read().await.auth
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state().await == AuthState::Authenticated
    }

    pub async fn current_user(&self) -> Option<User> {
        self.inner.state.read().await.user.clone()
    }

    pub async fn preferences(&self) -> Preferences {
        self.inner.state.read().await.preferences.clone()
    }

    pub async fn session_info(&self) -> Option<SessionInfo> {
        self.inner.state.read().await.session.clone()
    }

    /// Local login bookkeeping.
    #[must_use]
    pub fn history(&self) -> &LoginHistory {
        &self.inner.history
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kisan_setu_core::{Role, Theme, UserId};

    use super::*;

    fn farmer() -> User {
        serde_json::from_value(serde_json::json!({
            "id": 2,
            "username": "farmer1",
            "full_name": "Demo Farmer",
            "role": "farmer",
            "access_token": "tok",
            "token_type": "bearer"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_login_sets_expiry() {
        let auth = AuthManager::new(Store::in_memory());
        let now = Utc::now();

        let user = auth.login_at(farmer(), LoginOptions::default(), now).await;
        assert_eq!(user.token_expiry, Some(now + Duration::days(1)));
        assert_eq!(user.login_time, Some(now));

        let user = auth
            .login_at(
                farmer(),
                LoginOptions {
                    remember_me: true,
                    ..LoginOptions::default()
                },
                now,
            )
            .await;
        assert_eq!(user.token_expiry, Some(now + Duration::days(30)));
        assert!(auth.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_login_persists_and_records_history() {
        let store = Store::in_memory();
        let auth = AuthManager::new(store.clone());
        auth.login(farmer(), LoginOptions::default()).await;

        assert_eq!(
            store.get::<User>(keys::CURRENT_USER).unwrap().id,
            UserId::from(2)
        );
        assert_eq!(
            store.get::<Preferences>(keys::PREFERENCES),
            Some(Preferences::default())
        );
        let session = store.get::<SessionInfo>(keys::SESSION).unwrap();
        assert_eq!(session.login_method, "password");
        assert_eq!(auth.history().entries().len(), 1);
        assert_eq!(auth.history().entries()[0].role, Role::Farmer);
    }

    #[tokio::test]
    async fn test_restore_live_session() {
        let store = Store::in_memory();
        AuthManager::new(store.clone())
            .login(farmer(), LoginOptions::default())
            .await;

        let auth = AuthManager::new(store);
        assert_eq!(auth.restore().await, AuthState::Authenticated);
        assert_eq!(auth.current_user().await.unwrap().username, "farmer1");
        assert!(auth.session_info().await.is_some());
    }

    #[tokio::test]
    async fn test_restore_expired_session_purges_store() {
        let store = Store::in_memory();
        let past = Utc::now() - Duration::days(2);
        AuthManager::new(store.clone())
            .login_at(farmer(), LoginOptions::default(), past)
            .await;
        store.set(keys::CART, &Vec::<u8>::new());
        store.set(keys::LANGUAGE, &Language::En);

        let auth = AuthManager::new(store.clone());
        assert_eq!(auth.restore().await, AuthState::Unauthenticated);
        for key in keys::SESSION_KEYS {
            assert!(!store.contains(key), "{key} should be purged");
        }
        // Language and login history outlive the session.
        assert!(store.contains(keys::LANGUAGE));
        assert!(store.contains(keys::LOGIN_HISTORY));
    }

    #[tokio::test]
    async fn test_restore_without_expiry_is_unauthenticated() {
        let store = Store::in_memory();
        store.set(keys::CURRENT_USER, &farmer());
        let auth = AuthManager::new(store.clone());
        assert_eq!(auth.restore().await, AuthState::Unauthenticated);
        assert!(!store.contains(keys::CURRENT_USER));
    }

    #[tokio::test]
    async fn test_logout_purges_session_keys() {
        let store = Store::in_memory();
        let auth = AuthManager::new(store.clone());
        auth.login(farmer(), LoginOptions::default()).await;
        store.set(keys::CART, &Vec::<u8>::new());

        auth.logout().await;
        assert_eq!(auth.state().await, AuthState::Unauthenticated);
        assert!(auth.current_user().await.is_none());
        for key in keys::SESSION_KEYS {
            assert!(!store.contains(key));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_login_and_logout_agree_with_store() {
        for _ in 0..50 {
            let store = Store::in_memory();
            let auth = AuthManager::new(store.clone());
            let (a, b) = (auth.clone(), auth.clone());

            let login = tokio::spawn(async move {
                a.login(farmer(), LoginOptions::default()).await;
            });
            let logout = tokio::spawn(async move { b.logout().await });
            login.await.unwrap();
            logout.await.unwrap();

            assert_eq!(
                auth.is_authenticated().await,
                store.contains(keys::CURRENT_USER)
            );
            assert_eq!(
                auth.session_info().await.is_some(),
                store.contains(keys::SESSION)
            );
        }
    }

    #[tokio::test]
    async fn test_login_state_transitions() {
        let auth = AuthManager::new(Store::in_memory());
        assert!(auth.begin_login().await);
        assert_eq!(auth.state().await, AuthState::Authenticating);
        assert!(!auth.begin_login().await);
        auth.abort_login().await;
        assert_eq!(auth.state().await, AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_check_expiry() {
        let auth = AuthManager::new(Store::in_memory());
        let now = Utc::now();
        auth.login_at(farmer(), LoginOptions::default(), now).await;

        assert!(!auth.check_expiry_at(now + Duration::hours(23)).await);
        assert!(auth.check_expiry_at(now + Duration::hours(25)).await);
        assert_eq!(auth.state().await, AuthState::Unauthenticated);
        assert!(!auth.check_expiry_at(now + Duration::hours(26)).await);
    }

    #[tokio::test]
    async fn test_check_expiry_after_user_revoked() {
        let store = Store::in_memory();
        let auth = AuthManager::new(store.clone());
        auth.login(farmer(), LoginOptions::default()).await;

        store.remove(keys::CURRENT_USER);
        assert!(auth.check_expiry().await);
        assert!(!auth.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_updates_merge_and_persist() {
        let store = Store::in_memory();
        let auth = AuthManager::new(store.clone());
        assert!(auth.update_user(UserUpdate::default()).await.is_none());

        auth.login(farmer(), LoginOptions::default()).await;
        auth.update_user(UserUpdate {
            phone: Some("9876543210".to_string()),
            ..UserUpdate::default()
        })
        .await;
        let saved = store.get::<User>(keys::CURRENT_USER).unwrap();
        assert_eq!(saved.phone.as_deref(), Some("9876543210"));
        assert_eq!(saved.full_name, "Demo Farmer");

        auth.update_preferences(PreferencesUpdate {
            theme: Some(Theme::Dark),
            ..PreferencesUpdate::default()
        })
        .await;
        let prefs = store.get::<Preferences>(keys::PREFERENCES).unwrap();
        assert_eq!(prefs.theme, Theme::Dark);
        assert!(prefs.notifications);

        let session = auth
            .update_session(SessionUpdate {
                device: Some("kiosk".to_string()),
                ..SessionUpdate::default()
            })
            .await
            .unwrap();
        assert_eq!(session.device, "kiosk");
        assert_eq!(session.login_method, "password");
    }

    #[tokio::test]
    async fn test_language_survives_logout() {
        let store = Store::in_memory();
        let auth = AuthManager::new(store.clone());
        assert_eq!(auth.language(), Language::Hi);

        auth.set_language(Language::En).await;
        auth.login(farmer(), LoginOptions::default()).await;
        assert_eq!(auth.preferences().await.language, Language::En);

        auth.logout().await;
        assert_eq!(auth.language(), Language::En);
    }

    #[tokio::test]
    async fn test_update_activity() {
        let store = Store::in_memory();
        let auth = AuthManager::new(store.clone());
        let past = Utc::now() - Duration::hours(1);
        auth.login_at(farmer(), LoginOptions::default(), past).await;

        auth.update_activity().await;
        let saved = store.get::<User>(keys::CURRENT_USER).unwrap();
        assert!(saved.last_activity.unwrap() > past);
    }
}
