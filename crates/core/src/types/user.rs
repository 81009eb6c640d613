//! User, preference and session types.
//!
//! Field names follow the backend's JSON (`full_name`, `access_token`, ...)
//! so the same values can be persisted locally and sent over the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;
use super::status::{Language, Role, Theme};

/// The signed-in user.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, alias = "user_type")]
    pub role: Role,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default)]
    pub login_time: Option<DateTime<Utc>>,
    /// Bearer token for the Kisan Setu API.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub token_expiry: Option<DateTime<Utc>>,
}

const fn default_true() -> bool {
    true
}

/// Accept RFC 3339 timestamps as well as the naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// strings the backend emits for creation dates (interpreted as UTC).
/// Anything else becomes `None` rather than failing the whole profile.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(serde_json::Value::String(text)) = raw else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&text) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }

    Ok(
        chrono::NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc()),
    )
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("created_at", &self.created_at)
            .field("last_activity", &self.last_activity)
            .field("login_time", &self.login_time)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_type", &self.token_type)
            .field("token_expiry", &self.token_expiry)
            .finish()
    }
}

impl User {
    /// A user with only an id and username; everything else defaulted.
    #[must_use]
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            full_name: String::new(),
            email: None,
            phone: None,
            role: Role::default(),
            is_active: true,
            created_at: None,
            last_activity: None,
            login_time: None,
            access_token: None,
            token_type: None,
            token_expiry: None,
        }
    }

    /// Whether the token expiry has passed at `now`.
    ///
    /// A user without an expiry stamp is treated as expired: every login path
    /// sets one, so its absence means the record predates this client.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.token_expiry.is_none_or(|expiry| expiry <= now)
    }

    /// Apply a partial update (shallow merge).
    pub fn apply(&mut self, update: UserUpdate) {
        if let Some(full_name) = update.full_name {
            self.full_name = full_name;
        }
        if let Some(email) = update.email {
            self.email = Some(email);
        }
        if let Some(phone) = update.phone {
            self.phone = Some(phone);
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
    }
}

/// Partial update for [`User`] profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// User-scoped settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub language: Language,
    pub theme: Theme,
    pub notifications: bool,
    pub dashboard_layout: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            language: Language::default(),
            theme: Theme::default(),
            notifications: true,
            dashboard_layout: "default".to_string(),
        }
    }
}

impl Preferences {
    /// Apply a partial update (shallow merge).
    pub fn apply(&mut self, update: PreferencesUpdate) {
        if let Some(language) = update.language {
            self.language = language;
        }
        if let Some(theme) = update.theme {
            self.theme = theme;
        }
        if let Some(notifications) = update.notifications {
            self.notifications = notifications;
        }
        if let Some(layout) = update.dashboard_layout {
            self.dashboard_layout = layout;
        }
    }
}

/// Partial update for [`Preferences`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesUpdate {
    pub language: Option<Language>,
    pub theme: Option<Theme>,
    pub notifications: Option<bool>,
    pub dashboard_layout: Option<String>,
}

/// Ephemeral metadata about the current sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    /// How the user signed in (`password`, `demo`, `register`).
    pub login_method: String,
    /// Free-form device descriptor (user agent, hostname).
    pub device: String,
    pub login_time: DateTime<Utc>,
    /// Whether the long-lived expiry was requested.
    pub remember_me: bool,
}

impl SessionInfo {
    /// Apply a partial update (shallow merge).
    pub fn apply(&mut self, update: SessionUpdate) {
        if let Some(method) = update.login_method {
            self.login_method = method;
        }
        if let Some(device) = update.device {
            self.device = device;
        }
    }
}

/// Partial update for [`SessionInfo`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    pub login_method: Option<String>,
    pub device: Option<String>,
}

/// One entry in the local login history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRecord {
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub login_time: DateTime<Utc>,
    pub session_id: String,
    pub device: String,
}

/// Per-username login statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginStats {
    pub total_logins: u64,
    pub first_login: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl LoginStats {
    /// Statistics for a first login at `at`.
    #[must_use]
    pub const fn first(at: DateTime<Utc>) -> Self {
        Self {
            total_logins: 1,
            first_login: at,
            last_login: at,
        }
    }

    /// Record another login at `at`.
    pub fn record(&mut self, at: DateTime<Utc>) {
        self.total_logins += 1;
        self.last_login = at;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn user() -> User {
        serde_json::from_value(serde_json::json!({
            "id": "u1",
            "username": "farmer1",
            "full_name": "Demo Farmer",
            "user_type": "farmer",
            "access_token": "tok",
            "token_type": "bearer"
        }))
        .unwrap()
    }

    #[test]
    fn test_profile_user_type_maps_to_role() {
        assert_eq!(user().role, Role::Farmer);
        assert!(user().is_active);
    }

    #[test]
    fn test_naive_created_at_is_read_as_utc() {
        let u: User = serde_json::from_value(serde_json::json!({
            "id": "u2",
            "username": "consumer1",
            "created_at": "2024-01-15T10:30:00.123456"
        }))
        .unwrap();
        assert_eq!(
            u.created_at.unwrap().to_rfc3339(),
            "2024-01-15T10:30:00.123456+00:00"
        );
    }

    #[test]
    fn test_garbage_created_at_is_dropped() {
        let u: User = serde_json::from_value(serde_json::json!({
            "id": 3,
            "username": "vendor1",
            "created_at": "last tuesday"
        }))
        .unwrap();
        assert!(u.created_at.is_none());
    }

    #[test]
    fn test_missing_expiry_counts_as_expired() {
        assert!(user().is_expired_at(Utc::now()));
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let mut u = user();
        u.token_expiry = Some(now + Duration::seconds(1));
        assert!(!u.is_expired_at(now));
        u.token_expiry = Some(now);
        assert!(u.is_expired_at(now));
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", user());
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("\"tok\""));
    }

    #[test]
    fn test_user_update_is_shallow() {
        let mut u = user();
        u.apply(UserUpdate {
            phone: Some("9876543210".to_string()),
            ..UserUpdate::default()
        });
        assert_eq!(u.phone.as_deref(), Some("9876543210"));
        assert_eq!(u.full_name, "Demo Farmer");
    }

    #[test]
    fn test_preferences_merge() {
        let mut prefs = Preferences::default();
        prefs.apply(PreferencesUpdate {
            theme: Some(Theme::Dark),
            ..PreferencesUpdate::default()
        });
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.language, Language::Hi);
        assert!(prefs.notifications);
    }

    #[test]
    fn test_login_stats() {
        let t0 = Utc::now();
        let mut stats = LoginStats::first(t0);
        stats.record(t0 + Duration::hours(1));
        assert_eq!(stats.total_logins, 2);
        assert_eq!(stats.first_login, t0);
        assert_eq!(stats.last_login, t0 + Duration::hours(1));
    }
}
