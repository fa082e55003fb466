use hero_core::config::{AuthConfig, AuthMode};
use serde::Deserialize;

/// Query string on the upgrade request: `/ws?username=..&password=..`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectQuery {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Decide whether an upgrade is privileged.
///
/// `Ok(false)` for an ordinary participant, `Ok(true)` for a connection that
/// presented the configured credential, `Err` when credentials were offered
/// but do not match (the upgrade is refused).
pub fn verify_credentials(query: &ConnectQuery, auth: &AuthConfig) -> Result<bool, String> {
    let (username, password) = match (&query.username, &query.password) {
        (None, None) => return Ok(false),
        (Some(u), Some(p)) => (u, p),
        _ => return Err("username and password must be given together".to_string()),
    };

    match auth.mode {
        // everyone may already remove; credentials add nothing
        AuthMode::None => Ok(false),
        AuthMode::Credential => {
            let Some(expected) = auth.password.as_ref() else {
                return Err("no privileged credential configured".to_string());
            };
            if *username == auth.username && password == expected {
                Ok(true)
            } else {
                Err("invalid credentials".to_string())
            }
        }
    }
}
