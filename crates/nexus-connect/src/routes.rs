//! Post-logout redirect routes.

use nexus_broadcast::LogoutReason;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters escaped in a query-parameter value.
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'&')
    .add(b'=')
    .add(b'+');

/// Where the coordinator sends the user after a forced logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRoutes {
    /// Login page; forced logouts land here with a `reason` parameter.
    pub login: String,
}

impl Default for RedirectRoutes {
    fn default() -> Self {
        Self {
            login: "/connexion".to_string(),
        }
    }
}

impl RedirectRoutes {
    /// The login route carrying the logout reason, e.g.
    /// `/connexion?reason=idle_timeout`.
    pub fn login_with_reason(&self, reason: LogoutReason) -> String {
        let encoded =
            utf8_percent_encode(reason.as_str(), QUERY_VALUE);
        format!("{}?reason={encoded}", self.login)
    }
}

/// Parses a `reason` query-parameter value back into a reason.
pub fn parse_reason(value: &str) -> Option<LogoutReason> {
    match value {
        "idle_timeout" => Some(LogoutReason::IdleTimeout),
        "session_expired" => Some(LogoutReason::SessionExpired),
        "manual" => Some(LogoutReason::Manual),
        _ => None,
    }
}

/// The message the login page shows for a forced logout.
pub fn logout_message(reason: LogoutReason) -> &'static str {
    match reason {
        LogoutReason::IdleTimeout => {
            "Votre session a expiré après une période d'inactivité. \
             Veuillez vous reconnecter."
        }
        LogoutReason::SessionExpired => {
            "Votre session n'est plus valide. Veuillez vous reconnecter."
        }
        LogoutReason::Manual => "Vous avez été déconnecté.",
    }
}
