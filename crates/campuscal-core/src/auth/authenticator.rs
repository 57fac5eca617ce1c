use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::REFRESH;
use tracing::{debug, info};
use url::Url;

use super::{Credentials, Session};
use crate::portal::client::{refresh_target, APP_NAME};
use crate::portal::{scan, AuthError, PortalConfig};

// ============================================================================
// Login form
// ============================================================================

const LOGIN_PROGRAM: &str = "LOGINCHECK";
const LOGIN_ARGUMENTS: &str = "clino,usrname,pass,menuno,menu_type,browser,platform";
const CLIENT_NUMBER: &str = "000000000000001";
const MENU_NUMBER: &str = "000000";
const MENU_TYPE: &str = "classic";

/// Cookie the portal sets on a successful login.
pub const SESSION_COOKIE: &str = "cnsc";

/// Logs in to the portal and extracts a usable [`Session`].
///
/// Every call starts from an empty cookie jar. There are no retries; a failed
/// login is reported to the caller, which decides when to try again.
pub struct SessionAuthenticator {
    portal: PortalConfig,
    credentials: Credentials,
}

impl SessionAuthenticator {
    pub fn new(portal: PortalConfig, credentials: Credentials) -> Self {
        Self {
            portal,
            credentials,
        }
    }

    /// Submit the login form and follow the portal to its start page.
    pub async fn authenticate(&self) -> Result<Session, AuthError> {
        let jar = Arc::new(Jar::default());
        let client = self.portal.build_client(Arc::clone(&jar))?;
        let entry_url = self.portal.entry_url();

        let form = [
            ("usrname", self.credentials.username()),
            ("pass", self.credentials.password()),
            ("APPNAME", APP_NAME),
            ("PRGNAME", LOGIN_PROGRAM),
            ("ARGUMENTS", LOGIN_ARGUMENTS),
            ("clino", CLIENT_NUMBER),
            ("menuno", MENU_NUMBER),
            ("menu_type", MENU_TYPE),
        ];

        debug!(url = %entry_url, "Submitting login form");
        let response = client.post(entry_url.clone()).form(&form).send().await?;

        let final_url = response.url().clone();
        let refresh = response
            .headers()
            .get(REFRESH)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        if scan::is_incorrect_login(&body) {
            return Err(AuthError::InvalidCredentials);
        }

        if !has_session_cookie(&jar, entry_url) {
            return Err(AuthError::NoSessionCookie(final_url.to_string()));
        }

        if final_url != *entry_url {
            return Err(AuthError::UnexpectedRedirect(final_url.to_string()));
        }

        let body = match refresh.as_deref().and_then(refresh_target) {
            Some(target) => {
                let url = self.portal.resolve(target)?;
                debug!(%url, "Following refresh header");
                client.get(url).send().await?.text().await?
            }
            None => body,
        };

        let id = scan::find_session_id(&body).ok_or(AuthError::NoSessionId)?;

        info!("Logged in to portal");
        Ok(Session::new(id, client))
    }
}

fn has_session_cookie(jar: &Jar, url: &Url) -> bool {
    let Some(header) = jar.cookies(url) else {
        return false;
    };
    header.to_str().is_ok_and(|cookies| {
        cookies
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .any(|(name, _)| name == SESSION_COOKIE)
    })
}
