//! Shared state for one command invocation.

use std::sync::Arc;

use anyhow::{bail, Result};
use salesdesk_core::auth::store;
use salesdesk_core::config::normalize_base_url;
use salesdesk_core::{ApiClient, Config, Session};
use tracing::{debug, warn};

pub struct App {
    pub config: Config,
    pub client: ApiClient,
    pub json: bool,
}

impl App {
    pub fn new(api_url: Option<&str>, ephemeral: bool, json: bool) -> Result<Self> {
        let config = Config::load().unwrap_or_else(|e| {
            warn!("Failed to load config, using defaults: {:#}", e);
            Config::default()
        });

        let session = if ephemeral {
            Session::in_memory()
        } else {
            Session::load(store::open(config.store, Config::config_dir()?))
        };
        let session = Arc::new(session);

        let client = match api_url {
            Some(url) => ApiClient::with_options(
                &normalize_base_url(url),
                session,
                config.request_timeout(),
                config.refresh_mode,
            )?,
            None => ApiClient::from_config(&config, session)?,
        };
        debug!(ephemeral, authenticated = client.is_authenticated(), "App ready");

        Ok(Self {
            config,
            client,
            json,
        })
    }

    /// Fail unless a valid access credential or a refresh credential is held.
    ///
    /// An expired access credential alone does not fail here: the first
    /// request is denied and the pipeline refreshes, or ends the session.
    pub fn require_login(&self) -> Result<()> {
        let session = self.client.session();
        if !session.is_authenticated() && session.current_refresh().is_none() {
            bail!("Not logged in. Run `salesdesk login` first.");
        }
        Ok(())
    }

    pub fn remember_username(&mut self, username: &str) {
        if self.config.last_username.as_deref() == Some(username) {
            return;
        }
        self.config.last_username = Some(username.to_string());
        if let Err(e) = self.config.save() {
            warn!("Failed to save config: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Payload `{"exp":1}`: long expired
    const EXPIRED_ACCESS: &str = "eyJhbGciOiJIUzI1NiJ9.eyJleHAiOjF9.sig";

    fn app_with(session: Session) -> App {
        let client = ApiClient::new("http://127.0.0.1:9/api", Arc::new(session)).unwrap();
        App {
            config: Config::default(),
            client,
            json: false,
        }
    }

    #[test]
    fn test_require_login_without_session() {
        let app = app_with(Session::in_memory());
        assert!(app.require_login().is_err());
    }

    #[test]
    fn test_require_login_with_expired_access_and_refresh() {
        let session = Session::in_memory();
        session.set_session(EXPIRED_ACCESS, "valid-refresh");
        assert!(!session.is_authenticated());

        let app = app_with(session);
        assert!(app.require_login().is_ok());
    }

    #[test]
    fn test_require_login_after_logout() {
        let session = Session::in_memory();
        session.set_session(EXPIRED_ACCESS, "valid-refresh");
        let app = app_with(session);
        app.client.logout();
        assert!(app.require_login().is_err());
    }
}
