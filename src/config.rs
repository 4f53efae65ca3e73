//! Runtime configuration, read from the environment.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `JOINPOINT_ADDR` | `0.0.0.0:8080` | socket address to listen on |
//! | `JOINPOINT_MAX_BODY` | `65536` | largest accepted request body, in bytes |
//! | `RUST_LOG` | `info` | log filter, read by the binary's subscriber |

use std::env::VarError;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::Error;
use crate::server::DEFAULT_MAX_BODY;

pub const ADDR_VAR: &str = "JOINPOINT_ADDR";
pub const MAX_BODY_VAR: &str = "JOINPOINT_MAX_BODY";
pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub addr: SocketAddr,
    pub max_body: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env_var(key, std::env::var(key)))
    }

    /// Builds the config from an arbitrary variable source. The source
    /// returns `Ok(None)` for unset variables.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Result<Option<String>, Error>,
    ) -> Result<Self, Error> {
        let raw_addr = lookup(ADDR_VAR)?.unwrap_or_else(|| DEFAULT_ADDR.to_owned());
        let addr = parse(ADDR_VAR, &raw_addr)?;
        let max_body = lookup(MAX_BODY_VAR)?
            .map(|raw| parse(MAX_BODY_VAR, &raw))
            .transpose()?
            .unwrap_or(DEFAULT_MAX_BODY);
        Ok(Self { addr, max_body })
    }
}

/// Unset is `None`; set but not UTF-8 is an error rather than a silent default.
fn env_var(key: &str, value: Result<String, VarError>) -> Result<Option<String>, Error> {
    match value {
        Ok(v) => Ok(Some(v)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(raw)) => {
            Err(Error::Config(format!("{key}={raw:?}: not valid UTF-8")))
        }
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse()
        .map_err(|e| Error::Config(format!("{key}={raw:?}: {e}")))
}
