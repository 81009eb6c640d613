//! Sign-in, sign-out and session inspection.
//!
//! # Usage
//!
//! ```bash
//! ks-cli login farmer1 --remember-me
//! ks-cli register asha -e asha@example.in -n "Asha Devi" -r farmer
//! ks-cli whoami
//! ks-cli history --user farmer1
//! ks-cli logout
//! ```

use std::io::{BufRead, Write};

use kisan_setu_client::api::types::RegisterRequest;
use kisan_setu_client::{Degradable, DegradableExt};
use kisan_setu_core::{Role, User};

use super::{CommandError, Context};

/// Login history entries shown by `history`.
const HISTORY_LIMIT: usize = 10;

/// Details for a new account.
pub struct Registration {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub password: Option<String>,
    pub remember_me: bool,
}

/// Prompt for a password on stdin.
fn read_password() -> Result<String, CommandError> {
    print!("Password: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn display_name(user: &User) -> &str {
    if user.full_name.trim().is_empty() {
        &user.username
    } else {
        &user.full_name
    }
}

fn report_sign_in(result: &Degradable<User>) {
    let user = result.value();
    println!("Signed in as {} ({})", display_name(user), user.role);

    if let Err(fallback) = result {
        tracing::debug!(reason = %fallback.reason, "Signed in with offline account");
        println!("Backend unreachable: using the offline demo account.");
    }
    if let Some(expiry) = user.token_expiry {
        println!("Session valid until {}", expiry.format("%Y-%m-%d %H:%M UTC"));
    }
}

/// Sign in as `username`.
///
/// # Errors
///
/// Returns an error if already signed in or the credentials are rejected.
pub async fn login(
    ctx: &Context,
    username: &str,
    password: Option<String>,
    remember_me: bool,
) -> Result<(), CommandError> {
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };

    match ctx.state.sign_in(username, &password, remember_me).await {
        Ok(result) => {
            report_sign_in(&result);
            Ok(())
        }
        Err(e) => {
            println!("{}", e.user_message(ctx.language()));
            Err(e.into())
        }
    }
}

/// Create an account and sign in with it.
///
/// # Errors
///
/// Returns an error if already signed in or registration is rejected.
pub async fn register(ctx: &Context, registration: Registration) -> Result<(), CommandError> {
    let password = match registration.password {
        Some(password) => password,
        None => read_password()?,
    };

    let request = RegisterRequest {
        username: registration.username,
        email: registration.email,
        password,
        full_name: registration.full_name,
        phone: registration.phone,
        user_type: registration.role,
    };

    match ctx.state.sign_up(&request, registration.remember_me).await {
        Ok(result) => {
            report_sign_in(&result);
            Ok(())
        }
        Err(e) => {
            println!("{}", e.user_message(ctx.language()));
            Err(e.into())
        }
    }
}

/// Sign out. Succeeds even when no session exists.
pub async fn logout(ctx: &Context) {
    let was_signed_in = ctx.state.auth().is_authenticated().await;
    ctx.state.sign_out().await;

    if was_signed_in {
        println!("Signed out.");
    } else {
        println!("Not signed in.");
    }
}

/// Show the signed-in user, refreshed from the backend when reachable.
///
/// # Errors
///
/// Returns [`CommandError::NotSignedIn`] without a session.
pub async fn whoami(ctx: &Context) -> Result<(), CommandError> {
    ctx.require_session().await?;

    let user = match ctx.state.refresh_profile().await {
        Ok(profile) => {
            if profile.is_fallback() {
                println!("(offline: showing the saved profile)");
            }
            profile.into_value()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Profile refresh failed");
            ctx.state
                .auth()
                .current_user()
                .await
                .ok_or(CommandError::NotSignedIn)?
        }
    };

    println!("{} ({})", display_name(&user), user.username);
    println!("  Role:   {}", user.role);
    if let Some(email) = &user.email {
        println!("  Email:  {email}");
    }
    if let Some(phone) = &user.phone {
        println!("  Phone:  {phone}");
    }
    if let Some(expiry) = user.token_expiry {
        println!("  Expiry: {}", expiry.format("%Y-%m-%d %H:%M UTC"));
    }

    if let Some(session) = ctx.state.auth().session_info().await {
        println!(
            "  Signed in {} via {} on {}{}",
            session.login_time.format("%Y-%m-%d %H:%M UTC"),
            session.login_method,
            session.device,
            if session.remember_me { " (remembered)" } else { "" },
        );
    }
    Ok(())
}

/// Show recent logins on this device, newest first.
pub fn history(ctx: &Context, username: Option<&str>) {
    let login_history = ctx.state.auth().history();
    let entries: Vec<_> = login_history
        .entries()
        .into_iter()
        .rev()
        .filter(|entry| username.is_none_or(|name| entry.username == name))
        .take(HISTORY_LIMIT)
        .collect();

    if entries.is_empty() {
        println!("No logins recorded.");
        return;
    }

    for entry in &entries {
        println!(
            "{}  {:<12} {:<9} {}",
            entry.login_time.format("%Y-%m-%d %H:%M"),
            entry.username,
            entry.role,
            entry.device,
        );
    }

    println!();
    for (name, stats) in login_history.stats() {
        if username.is_some_and(|wanted| wanted != name) {
            continue;
        }
        println!(
            "{name}: {} logins, first {}, last {}",
            stats.total_logins,
            stats.first_login.format("%Y-%m-%d"),
            stats.last_login.format("%Y-%m-%d"),
        );
    }
}
