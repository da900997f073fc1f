//! Cookie-jar session state for the authenticated portal connection.
//!
//! The portal hands out session cookies across several responses (login page,
//! login POST, redirects). They accumulate here, merged last-write-wins per
//! cookie name, and every request attaches the merged `Cookie` header. The
//! context is owned by the client rather than living in process-wide state,
//! which keeps it trivially testable.

use cookie::Cookie;
use indexmap::IndexMap;
use reqwest::header::{HeaderMap, SET_COOKIE};

/// Accumulated cookies for one portal session.
#[derive(Debug, Default, Clone)]
pub struct SessionContext {
    cookies: IndexMap<String, String>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge every `Set-Cookie` header from a response. A cookie re-issued
    /// under an existing name overwrites the previous value.
    pub fn absorb(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            if let Ok(parsed) = Cookie::parse(raw.to_string()) {
                self.cookies
                    .insert(parsed.name().to_string(), parsed.value().to_string());
            }
        }
    }

    /// The merged `Cookie` request-header value, or `None` before any cookie
    /// has been seen.
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }
}
