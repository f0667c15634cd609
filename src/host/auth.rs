//! Credential exchange against the host's login service.

use super::HostHandle;
use crate::config::Credentials;
use crate::error::{CliError, Result};
use chrono::{DateTime, Utc};

/// Message for every rejected login.
const LOGIN_REJECTED: &str = "Can't login as admin";

/// An authenticated host session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub login: String,
    pub authenticated_at: DateTime<Utc>,
}

/// All-or-nothing authentication: no retry, no credential fallback.
pub struct AuthenticationGate;

impl AuthenticationGate {
    pub fn authenticate(host: &mut HostHandle, credentials: &Credentials) -> Result<Session> {
        let accepted = host.framework_mut().login(credentials).map_err(|e| {
            CliError::Auth(format!("{}: login service failed: {:#}", LOGIN_REJECTED, e))
        })?;

        if !accepted {
            return Err(CliError::Auth(LOGIN_REJECTED.to_string()));
        }

        tracing::debug!(login = %credentials.login, "authenticated against host");
        Ok(Session {
            login: credentials.login.clone(),
            authenticated_at: Utc::now(),
        })
    }
}
