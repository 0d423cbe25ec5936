//! Client-side values for anti-bot challenge cookies.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Opaque identifier, any random value is accepted.
pub const OPAQUE_ID: &str = "__ddg1_";
/// Second opaque identifier.
pub const OPAQUE_ID_2: &str = "__ddg8_";
/// Encodes the client address; any IP-shaped value works.
pub const CLIENT_ADDR: &str = "__ddg9_";
/// Time-dependent value (milliseconds since the epoch).
pub const TIME_SENSITIVE: &str = "__ddg10_";

const OPAQUE_LEN: usize = 16;
const FALLBACK_IP: &str = "127.0.0.1";

/// True for names following the challenge convention: `__ddg` prefix, `_` suffix.
pub fn is_anti_bot_name(name: &str) -> bool {
    name.len() > "__ddg_".len() && name.starts_with("__ddg") && name.ends_with('_')
}

pub fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Value for a known cookie name; unknown names get an opaque random value.
pub fn cookie_value(name: &str, client_ip: Option<&str>) -> String {
    match name {
        CLIENT_ADDR => client_ip.unwrap_or(FALLBACK_IP).to_string(),
        TIME_SENSITIVE => now_millis().to_string(),
        _ => random_alphanumeric(OPAQUE_LEN),
    }
}

/// The baseline set sent before the server has issued anything.
pub fn default_cookies(client_ip: Option<&str>) -> Vec<(String, String)> {
    [OPAQUE_ID, OPAQUE_ID_2, CLIENT_ADDR, TIME_SENSITIVE]
        .iter()
        .map(|name| (name.to_string(), cookie_value(name, client_ip)))
        .collect()
}
