//! Saved location.

use kisan_setu_client::location::LocationResolver;
use kisan_setu_client::{Degradable, DegradableExt};
use kisan_setu_core::Location;

use super::{CommandError, Context};

fn print_location(location: &Location) {
    println!("{}", location.short_address());
    println!("  Country:     {}", location.country);
    if let Some(pincode) = &location.pincode {
        println!("  PIN code:    {pincode}");
    }
    println!(
        "  Coordinates: {:.4}, {:.4}",
        location.latitude, location.longitude
    );

    let nearest = LocationResolver::nearest_reference(location);
    if !nearest.city.eq_ignore_ascii_case(&location.city) {
        println!("  Nearest hub: {}", nearest.city);
    }
}

/// Show the resolved location, optionally re-detecting or setting it.
///
/// A changed location is sent to the backend when signed in.
///
/// # Errors
///
/// Returns [`CommandError::Location`] if `set` names an unknown city.
pub async fn location(ctx: &Context, refresh: bool, set: Option<&str>) -> Result<(), CommandError> {
    let resolver = ctx.state.location();

    let resolved: Degradable<Location> = match set {
        Some(city) => Ok(resolver.set_city(city).await?),
        None if refresh => resolver.refresh().await,
        None => resolver.resolve().await,
    };

    if let Err(fallback) = &resolved {
        tracing::debug!(reason = %fallback.reason, "Location detection failed");
        println!("(could not detect your location; showing the default)");
    }
    print_location(resolved.value());

    let changed = set.is_some() || refresh;
    if changed
        && !resolved.is_fallback()
        && ctx.state.auth().is_authenticated().await
        && let Err(e) = ctx.state.gateway().update_location(resolved.value()).await
    {
        tracing::warn!(error = %e, "Failed to sync location with the backend");
    }
    Ok(())
}
