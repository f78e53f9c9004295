use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TransportError};

/// Default daemon host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default daemon port.
pub const DEFAULT_PORT: u16 = 5037;

/// Environment variable overriding the daemon host.
pub const ENV_SERVER_ADDRESS: &str = "ANDROID_ADB_SERVER_ADDRESS";

/// Environment variable overriding the daemon port.
pub const ENV_SERVER_PORT: &str = "ANDROID_ADB_SERVER_PORT";

/// Network address of the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DaemonAddr {
    /// Host name or IP literal (IPv6 without brackets).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl DaemonAddr {
    /// Create an address from its parts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Resolve the address from `ANDROID_ADB_SERVER_ADDRESS` and
    /// `ANDROID_ADB_SERVER_PORT`, falling back to the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve the address through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup(ENV_SERVER_ADDRESS)
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup(ENV_SERVER_PORT) {
            Some(raw) if !raw.trim().is_empty() => parse_port(raw.trim())?,
            _ => DEFAULT_PORT,
        };

        Ok(Self { host, port })
    }
}

impl Default for DaemonAddr {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for DaemonAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for DaemonAddr {
    type Err = TransportError;

    /// Accepts `host`, `host:port`, `[v6]` and `[v6]:port`.
    fn from_str(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid(input, "empty address"));
        }

        if let Some(rest) = trimmed.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| invalid(input, "unterminated '['"))?;
            if host.is_empty() {
                return Err(invalid(input, "empty host"));
            }
            let port = match tail {
                "" => DEFAULT_PORT,
                t => match t.strip_prefix(':') {
                    Some(p) => parse_port(p).map_err(|_| invalid(input, "invalid port"))?,
                    None => return Err(invalid(input, "unexpected text after ']'")),
                },
            };
            return Ok(Self::new(host, port));
        }

        match trimmed.rsplit_once(':') {
            // A bare IPv6 literal has more than one colon and no port.
            Some((host, _)) if host.contains(':') => Ok(Self::new(trimmed, DEFAULT_PORT)),
            Some((host, port)) => {
                if host.is_empty() {
                    return Err(invalid(input, "empty host"));
                }
                let port = parse_port(port).map_err(|_| invalid(input, "invalid port"))?;
                Ok(Self::new(host, port))
            }
            None => Ok(Self::new(trimmed, DEFAULT_PORT)),
        }
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    match raw.parse::<u16>() {
        Ok(0) => Err(invalid(raw, "port must be non-zero")),
        Ok(port) => Ok(port),
        Err(_) => Err(invalid(raw, "port is not a number in 1..=65535")),
    }
}

fn invalid(input: &str, reason: &'static str) -> TransportError {
    TransportError::InvalidAddress {
        input: input.to_string(),
        reason,
    }
}
