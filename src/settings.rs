//! Connection settings derived from binding properties.
//!
//! Property names follow the host's conventions (`redisHost`, `redisPassword`, ...). Shorter
//! aliases (`host`, `password`, ...) are accepted as well.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Default time allowed for establishing a connection.
const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);
/// Default time allowed for a single command to complete.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(3);

/// An error turning binding properties into [`Settings`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SettingsError {
    /// No host was configured.
    #[error("redisHost is required")]
    MissingHost,
    /// A property was present but could not be parsed.
    #[error("invalid value {value:?} for property {key}")]
    InvalidValue {
        /// The property name as it was supplied.
        key: String,
        /// The value that failed to parse.
        value: String,
    },
}

/// Settings used to connect to a store.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// Address of the store, as `host:port`.
    pub host: String,
    /// Username for ACL authentication, if any.
    pub username: Option<String>,
    /// Password for authentication, if any.
    pub password: Option<String>,
    /// Logical database to select after connecting.
    pub db: i64,
    /// Whether to connect over TLS.
    pub enable_tls: bool,
    /// Time allowed for establishing a connection. `None` waits indefinitely.
    pub dial_timeout: Option<Duration>,
    /// Time allowed for a read command to complete. `None` waits indefinitely.
    pub read_timeout: Option<Duration>,
    /// Time allowed for a write command to complete. `None` waits indefinitely.
    pub write_timeout: Option<Duration>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("db", &self.db)
            .field("enable_tls", &self.enable_tls)
            .field("dial_timeout", &self.dial_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .finish()
    }
}

impl Settings {
    /// Settings for the given host with every other option at its default.
    #[must_use]
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: None,
            password: None,
            db: 0,
            enable_tls: false,
            dial_timeout: Some(DEFAULT_DIAL_TIMEOUT),
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            write_timeout: Some(DEFAULT_READ_TIMEOUT),
        }
    }

    /// Parse settings from binding properties.
    ///
    /// Empty values are treated as absent. A timeout of zero selects the default, and a negative
    /// timeout removes the bound. `writeTimeout` defaults to `readTimeout`.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let props = Properties(properties);

        let host = props
            .get(&["redisHost", "host"])
            .ok_or(SettingsError::MissingHost)?;
        let mut settings = Self::for_host(host.1);

        settings.username = props
            .get(&["redisUsername", "username"])
            .map(|(_, v)| v.to_owned());
        settings.password = props
            .get(&["redisPassword", "password"])
            .map(|(_, v)| v.to_owned());

        if let Some((key, value)) = props.get(&["redisDB", "db"]) {
            settings.db = value.trim().parse().map_err(|_| invalid(key, value))?;
        }
        if let Some((key, value)) = props.get(&["enableTLS"]) {
            settings.enable_tls = parse_bool(value).ok_or_else(|| invalid(key, value))?;
        }
        if let Some((key, value)) = props.get(&["dialTimeout"]) {
            settings.dial_timeout = parse_timeout(value, settings.dial_timeout)
                .ok_or_else(|| invalid(key, value))?;
        }
        if let Some((key, value)) = props.get(&["readTimeout"]) {
            settings.read_timeout = parse_timeout(value, settings.read_timeout)
                .ok_or_else(|| invalid(key, value))?;
        }
        settings.write_timeout = match props.get(&["writeTimeout"]) {
            Some((key, value)) => parse_timeout(value, settings.read_timeout)
                .ok_or_else(|| invalid(key, value))?,
            None => settings.read_timeout,
        };

        Ok(settings)
    }
}

/// Lookup over a property map that honors aliases and ignores empty values.
struct Properties<'a>(&'a HashMap<String, String>);

impl<'a> Properties<'a> {
    /// The first non-empty value among `names`, along with the name it was found under.
    fn get(&self, names: &[&'static str]) -> Option<(&'static str, &'a str)> {
        names.iter().find_map(|&name| {
            self.0
                .get(name)
                .map(String::as_str)
                .filter(|value| !value.is_empty())
                .map(|value| (name, value))
        })
    }
}

/// Construct an [`SettingsError::InvalidValue`].
fn invalid(key: &str, value: &str) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
    }
}

/// Parse a boolean property. Accepts `true`/`false`/`1`/`0` in any case.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Parse a timeout property.
///
/// Zero selects `default`. A negative value, such as `-1`, means no timeout.
fn parse_timeout(value: &str, default: Option<Duration>) -> Option<Option<Duration>> {
    let value = value.trim();
    match value.strip_prefix('-') {
        Some(magnitude) => parse_duration(magnitude).map(|_| None),
        None => parse_duration(value).map(|timeout| {
            if timeout.is_zero() {
                default
            } else {
                Some(timeout)
            }
        }),
    }
}

/// Parse a duration.
///
/// A bare integer is a number of milliseconds. Otherwise the value is a sequence of decimal
/// numbers, each with an optional fraction and a unit, such as `300ms`, `1.5s` or `1h30m`. Valid
/// units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(millis) = value.parse() {
        return Some(Duration::from_millis(millis));
    }
    if value.is_empty() {
        return None;
    }

    let mut rest = value;
    let mut total = Duration::ZERO;
    while !rest.is_empty() {
        let split = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let (amount, tail) = rest.split_at(split);
        let split = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(split);

        let nanos_per_unit: u64 = match unit {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 60 * 60 * 1_000_000_000,
            _ => return None,
        };
        total = total.checked_add(scale(amount, nanos_per_unit)?)?;
        rest = tail;
    }
    Some(total)
}

/// Multiply a decimal `amount` such as `1.25` by a number of nanoseconds.
///
/// Digits of the fraction beyond nanosecond precision are truncated.
fn scale(amount: &str, nanos_per_unit: u64) -> Option<Duration> {
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    let fraction = &fraction[..fraction.len().min(18)];

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let numerator: u128 = if fraction.is_empty() {
        0
    } else {
        fraction.parse().ok()?
    };
    let denominator = 10_u128.checked_pow(u32::try_from(fraction.len()).ok()?)?;

    let per_unit = u128::from(nanos_per_unit);
    let nanos = whole
        .checked_mul(per_unit)?
        .checked_add(numerator * per_unit / denominator)?;
    Some(Duration::from_nanos(u64::try_from(nanos).ok()?))
}
