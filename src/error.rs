use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("Invalid configuration: {}", issues.join("; "))]
    Configuration { issues: Vec<String> },

    #[error("Invalid server configuration: {0}")]
    InvalidServerConfig(String),

    #[error(transparent)]
    EnvVar(#[from] std::env::VarError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl RosterError {
    pub fn configuration(issues: Vec<String>) -> Self {
        RosterError::Configuration { issues }
    }

    /// Validation issues, when this error came from input validation.
    pub fn issues(&self) -> &[String] {
        match self {
            RosterError::Configuration { issues } => issues,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, RosterError>;
