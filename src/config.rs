use crate::error::{Result, RosterError};
use serde::{Deserialize, Serialize};
use std::{env, net::SocketAddr};

const ENV_BIND_ADDR: &str = "DUTY_ROSTER_BIND_ADDR";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Where the HTTP surface listens.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let raw = match env::var(ENV_BIND_ADDR) {
            Ok(value) if !value.trim().is_empty() => value,
            Ok(_) | Err(env::VarError::NotPresent) => DEFAULT_BIND_ADDR.to_string(),
            Err(e) => return Err(e.into()),
        };
        let bind_addr = raw.trim().parse().map_err(|_| {
            RosterError::InvalidServerConfig(format!("{ENV_BIND_ADDR} is not a socket address: {raw}"))
        })?;
        Ok(Self { bind_addr })
    }
}

/// Options handed to the MIP backend for one solve attempt.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverSettings {
    /// Wall-clock budget in seconds; `None` lets the solver run to optimality.
    pub time_limit_secs: Option<f64>,
    pub threads: i32,
    pub random_seed: i32,
    pub log_to_console: bool,
    /// Rebuild single-day models when the month is infeasible.
    pub run_fallback: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            time_limit_secs: Some(60.0),
            threads: 1,
            random_seed: 1234,
            log_to_console: false,
            run_fallback: true,
        }
    }
}
