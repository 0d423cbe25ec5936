//! Anti-bot challenge cookies plus the user's session cookie.
//!
//! One `CookieState` is shared by every worker. Session cookies are fixed at
//! construction; anti-bot cookies start from client-generated defaults and are
//! overwritten whenever a response issues a new value. A single mutex guards
//! the anti-bot map; readers get a snapshot copy, never a half-applied update.

mod generate;
mod parse;

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::CookieConfig;

pub use generate::{is_anti_bot_name, CLIENT_ADDR, OPAQUE_ID, OPAQUE_ID_2, TIME_SENSITIVE};
pub use parse::{parse_set_cookie, set_cookie_value, CookieParseError};

/// Name of the cookie carrying the user's session key.
pub const SESSION_COOKIE: &str = "session";

pub type CookieMap = BTreeMap<String, String>;

#[derive(Debug, Default)]
pub struct CookieState {
    session: CookieMap,
    anti_bot: Mutex<CookieMap>,
}

impl CookieState {
    /// State with the given session cookies and no anti-bot cookies yet.
    pub fn new(session: CookieMap) -> Self {
        Self {
            session,
            anti_bot: Mutex::new(CookieMap::new()),
        }
    }

    /// Build from `[cookies]`: session key, then configured anti-bot values,
    /// or generated defaults when none are configured.
    pub fn from_config(cfg: &CookieConfig) -> Self {
        let mut session = CookieMap::new();
        if let Some(key) = cfg.session_key.as_deref().filter(|k| !k.is_empty()) {
            session.insert(SESSION_COOKIE.to_string(), key.to_string());
        }
        let state = Self::new(session);
        if cfg.anti_bot.is_empty() {
            state.seed_defaults(cfg.client_ip.as_deref());
        } else {
            state.lock().extend(cfg.anti_bot.clone());
            tracing::debug!(count = cfg.anti_bot.len(), "using configured anti-bot cookies");
        }
        state
    }

    fn lock(&self) -> MutexGuard<'_, CookieMap> {
        self.anti_bot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Generate the baseline anti-bot set: random opaque identifiers, an
    /// IP-shaped client address, and a millisecond timestamp.
    pub fn seed_defaults(&self, client_ip: Option<&str>) {
        let generated = generate::default_cookies(client_ip);
        let names: Vec<&str> = generated.iter().map(|(n, _)| n.as_str()).collect();
        tracing::debug!(?names, "generated default anti-bot cookies");
        self.lock().extend(generated.iter().cloned());
    }

    pub fn session(&self) -> &CookieMap {
        &self.session
    }

    /// Snapshot of the current anti-bot cookies.
    pub fn anti_bot(&self) -> CookieMap {
        self.lock().clone()
    }

    /// Session cookies merged with anti-bot cookies (anti-bot wins on collision).
    /// `None` when there is nothing to send.
    pub fn build_request_cookies(&self) -> Option<CookieMap> {
        let anti_bot = self.anti_bot();
        if self.session.is_empty() && anti_bot.is_empty() {
            return None;
        }
        let mut merged = self.session.clone();
        merged.extend(anti_bot);
        Some(merged)
    }

    /// Request cookies formatted for a `Cookie:` header.
    pub fn cookie_header(&self) -> Option<String> {
        let cookies = self.build_request_cookies()?;
        Some(
            cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Absorb anti-bot cookies from raw response header lines. Non-cookie
    /// lines, other cookies and malformed values are ignored. Returns whether
    /// any stored value changed.
    pub fn update_from_response<S: AsRef<str>>(&self, header_lines: &[S]) -> bool {
        let mut parsed = Vec::new();
        for line in header_lines {
            let Some(value) = set_cookie_value(line.as_ref()) else {
                continue;
            };
            match parse_set_cookie(value) {
                Ok((name, value)) if is_anti_bot_name(&name) => parsed.push((name, value)),
                Ok(_) => {}
                Err(e) => tracing::debug!("skipping malformed Set-Cookie {:?}: {}", value, e),
            }
        }
        if parsed.is_empty() {
            return false;
        }

        let mut cookies = self.lock();
        let mut updated = false;
        for (name, value) in parsed {
            if cookies.get(&name) != Some(&value) {
                tracing::debug!(cookie = %name, "updated anti-bot cookie from response");
                cookies.insert(name, value);
                updated = true;
            }
        }
        updated
    }

    /// Regenerate the time-dependent cookie. Does nothing if it was never set.
    pub fn refresh_time_sensitive(&self) {
        let mut cookies = self.lock();
        let Some(old) = cookies.get(TIME_SENSITIVE) else {
            return;
        };
        // Never move backwards, even if the clock does.
        let previous = old.parse::<u128>().unwrap_or(0);
        let next = generate::now_millis().max(previous + 1).to_string();
        tracing::debug!("refreshed {} cookie: {} -> {}", TIME_SENSITIVE, old, next);
        cookies.insert(TIME_SENSITIVE.to_string(), next);
    }
}
