//! Error types for the CLI

use nodeclaim_provisioner::ProvisionError;

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Common(#[from] nodeclaim_common::Error),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("failed to read workspace {namespace}/{name}: {source}")]
    WorkspaceFetch {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("validation error: {message}")]
    Validation { message: String },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }
}
