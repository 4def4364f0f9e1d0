use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure of a run. None of them are retried.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed unmarshalling parameters: {source}")]
    ConfigParse {
        #[source]
        source: serde_yaml_bw::Error,
    },

    #[error(
        "credentials of type kubernetes-engine are not injected; configure this extension as trusted and inject credentials of type kubernetes-engine"
    )]
    CredentialsNotInjected,

    #[error("failed unmarshalling injected credentials: {source}")]
    CredentialParse {
        #[source]
        source: serde_json::Error,
    },

    #[error("credential with name {name} does not exist")]
    CredentialNotFound { name: String },

    #[error("failed unmarshalling service account keyfile: {source}")]
    KeyFileParse {
        #[source]
        source: serde_json::Error,
    },

    #[error("field {field} missing from service account keyfile")]
    MissingField { field: &'static str },

    #[error("field {field} not of type string (found {found})")]
    WrongFieldType {
        field: &'static str,
        found: &'static str,
    },

    #[error("failed writing service account keyfile to {}: {source}", path.display())]
    KeyFilePersist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "credential {credential} has no zone or region; at least one of them has to be defined"
    )]
    NoLocationSpecified { credential: String },

    #[error("{message}")]
    BinaryNotFound { name: String, message: String },

    #[error("step {index} `{command}` failed: {source}")]
    SubprocessFailure {
        index: usize,
        command: String,
        #[source]
        source: StepError,
    },

    #[error("step {index} `{command}` interrupted by shutdown signal")]
    Interrupted { index: usize, command: String },

    #[error("{context}: {source}")]
    Runtime {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error("failed to spawn: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed waiting for process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("exited with {0}")]
    Exit(ExitStatus),
}
