//! `/auth` routes.

use chrono::Utc;
use kisan_setu_core::{User, UserId, UserUpdate};
use reqwest::Method;
use tracing::instrument;

use super::types::{Ack, RegisterRequest, Registration, TokenResponse};
use super::{Degradable, Fallback, Gateway, mock};
use crate::error::{ApiError, ApiResult};
use crate::store::keys;

impl Gateway {
    /// Sign in with a username and password.
    ///
    /// The backend only returns a token, so the profile is fetched with it
    /// to build the [`User`]. When the backend is unreachable the demo
    /// accounts still sign in, as a [`Fallback`]. The result is not
    /// persisted; hand it to the session manager.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for bad credentials and
    /// [`ApiError::Unreachable`] when offline with a non-demo account.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<Degradable<User>> {
        let request = self
            .anonymous(Method::POST, "/auth/login")
            .form(&[("username", username), ("password", password)]);

        match self.execute::<TokenResponse>(request).await {
            Ok(token) => Ok(Ok(self.user_for_token(username, token).await?)),
            Err(e) if e.is_unreachable() => match mock::demo_user(username, Utc::now()) {
                Some(user) => {
                    tracing::warn!(error = %e, "Backend unavailable, signing in demo account");
                    Ok(Err(Fallback::new(user, e.to_string())))
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Build the signed-in user for a fresh token.
    ///
    /// A profile that cannot be fetched leaves a minimal user carrying only
    /// the username and token.
    async fn user_for_token(&self, username: &str, token: TokenResponse) -> ApiResult<User> {
        let request = self
            .anonymous(Method::GET, "/auth/profile")
            .bearer_auth(&token.access_token);

        let mut user = match self.execute::<User>(request).await {
            Ok(user) => user,
            Err(ApiError::Cancelled) => return Err(ApiError::Cancelled),
            Err(e) => {
                tracing::warn!(error = %e, "Profile unavailable after login");
                User::new(UserId::from(username), username)
            }
        };
        user.access_token = Some(token.access_token);
        user.token_type = Some(token.token_type);
        Ok(user)
    }

    /// Create an account, then sign in with it.
    ///
    /// When the backend is unreachable a local account is minted and
    /// returned as a [`Fallback`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Api`] when the backend rejects the registration
    /// (username or email taken).
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<Degradable<User>> {
        if request.username.trim().is_empty() || request.password.is_empty() {
            return Err(ApiError::InvalidRequest(
                "username and password are required".to_string(),
            ));
        }

        let call = self
            .anonymous(Method::POST, "/auth/register")
            .json(request);

        match self.execute::<Registration>(call).await {
            Ok(registration) => {
                tracing::info!(user_id = ?registration.user_id, "Registered new account");
                self.login(&registration.username, &request.password).await
            }
            Err(e) if e.is_unreachable() => {
                tracing::warn!(error = %e, "Backend unavailable, registering locally");
                Ok(Err(Fallback::new(
                    mock::registered_user(request, Utc::now()),
                    e.to_string(),
                )))
            }
            Err(e) => Err(e),
        }
    }

    /// Tell the backend the session is over.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails; callers usually ignore it.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> ApiResult<()> {
        self.execute::<Option<Ack>>(self.request(Method::POST, "/auth/logout"))
            .await
            .map(|_| ())
    }

    /// Fetch the signed-in user's profile.
    ///
    /// The stored token is carried over onto the fresh profile. On failure
    /// the stored user is returned as a [`Fallback`].
    ///
    /// # Errors
    ///
    /// Returns the call's error when there is no stored user to fall back to
    /// (including after a 401, which purges it).
    #[instrument(skip(self))]
    pub async fn get_profile(&self) -> ApiResult<Degradable<User>> {
        let result = self
            .execute::<User>(self.request(Method::GET, "/auth/profile"))
            .await;
        let stored = self.store().get::<User>(keys::CURRENT_USER);

        match result {
            Ok(mut user) => {
                if let Some(stored) = stored {
                    user.access_token = stored.access_token;
                    user.token_type = stored.token_type;
                    user.token_expiry = stored.token_expiry;
                    user.login_time = stored.login_time;
                    user.last_activity = stored.last_activity;
                }
                Ok(Ok(user))
            }
            Err(ApiError::Cancelled) => Err(ApiError::Cancelled),
            Err(e) => match stored {
                Some(user) => {
                    tracing::warn!(error = %e, "Profile unavailable, using stored user");
                    Ok(Err(Fallback::new(user, e.to_string())))
                }
                None => Err(e),
            },
        }
    }

    /// Update the signed-in user's name and email.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self))]
    pub async fn update_profile(&self, update: &UserUpdate) -> ApiResult<Ack> {
        let mut params = Vec::new();
        if let Some(full_name) = &update.full_name {
            params.push(("full_name", full_name.as_str()));
        }
        if let Some(email) = &update.email {
            params.push(("email", email.as_str()));
        }
        self.execute(self.request(Method::PUT, "/auth/profile").query(&params))
            .await
    }

    /// List every account.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> ApiResult<Vec<User>> {
        self.execute(self.request(Method::GET, "/auth/users")).await
    }

    /// Fetch one account.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: &UserId) -> ApiResult<User> {
        self.execute(self.request(Method::GET, &format!("/auth/users/{id}")))
            .await
    }

    /// Apply a partial update to an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self))]
    pub async fn update_user(&self, id: &UserId, update: &UserUpdate) -> ApiResult<Ack> {
        self.execute::<Option<Ack>>(
            self.request(Method::PUT, &format!("/auth/users/{id}"))
                .json(update),
        )
        .await
        .map(Option::unwrap_or_default)
    }

    /// Delete an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: &UserId) -> ApiResult<Ack> {
        self.execute::<Option<Ack>>(self.request(Method::DELETE, &format!("/auth/users/{id}")))
            .await
            .map(Option::unwrap_or_default)
    }
}
