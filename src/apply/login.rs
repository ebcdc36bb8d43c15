//! Site sign-in with env-sourced credentials.

use tracing::{info, warn};

use crate::browser::{locators, BrowserSession, ElementRef, SessionError};
use crate::core::config::Credentials;
use crate::core::wait::jitter_sleep;

const LOGIN_URL: &str = "https://www.linkedin.com/login";

/// Sign in through the login form. A missing form is not an error — the
/// browser profile may already carry an authenticated session.
pub async fn sign_in(
    session: &dyn BrowserSession,
    creds: &Credentials,
) -> Result<(), SessionError> {
    session.navigate(LOGIN_URL).await?;
    jitter_sleep(1500, 3000).await;

    let username = ElementRef::first(locators::LOGIN_USERNAME);
    let password = ElementRef::first(locators::LOGIN_PASSWORD);
    if session.count(&username).await == 0 || session.count(&password).await == 0 {
        warn!("login form not found — assuming the session is already authenticated");
        return Ok(());
    }

    session.clear_and_type(&username, &creds.username).await?;
    session.clear_and_type(&password, &creds.password).await?;
    session
        .click(&ElementRef::first(locators::LOGIN_BUTTON))
        .await?;

    // Give the redirect (and a possible 2FA challenge) time to settle.
    jitter_sleep(2500, 4500).await;

    match session.current_url().await {
        Ok(url) if url.contains("/login") || url.contains("/checkpoint") => {
            warn!(
                "still on {} after sign-in — the site may be asking for manual verification",
                url
            );
        }
        Ok(_) => info!("signed in as {}", creds.username),
        Err(e) => warn!("could not confirm the sign-in redirect: {}", e),
    }
    Ok(())
}
