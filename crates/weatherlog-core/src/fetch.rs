//! The fetch contract between the scheduler and a provider.
//!
//! A [`Fetcher`] performs exactly one request per call and either returns a
//! normalized [`NewReading`] or a [`FetchError`]. It never retries: the
//! scheduler's next cycle is the retry.

use std::future::Future;

use weatherlog_types::NewReading;

use crate::error::ErrorKind;

/// Why a single fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Connection, DNS, or timeout failure. No response was received.
    #[error("provider unreachable: {message}")]
    Unreachable {
        /// Description of the transport failure.
        message: String,
    },

    /// The provider answered with a non-2xx status.
    #[error("provider returned HTTP {status}")]
    Http {
        /// The HTTP status code.
        status: u16,
    },

    /// The body was not JSON or lacked a required field.
    #[error("malformed provider response: {message}")]
    Malformed {
        /// What was wrong with the body.
        message: String,
    },
}

impl FetchError {
    /// Build an [`FetchError::Unreachable`] from any displayable cause.
    pub fn unreachable(cause: impl std::fmt::Display) -> Self {
        Self::Unreachable {
            message: cause.to_string(),
        }
    }

    /// Build a [`FetchError::Malformed`] from any displayable cause.
    pub fn malformed(cause: impl std::fmt::Display) -> Self {
        Self::Malformed {
            message: cause.to_string(),
        }
    }

    /// Taxonomy kind of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unreachable { .. } => ErrorKind::ProviderUnreachable,
            Self::Http { .. } => ErrorKind::ProviderHttp,
            Self::Malformed { .. } => ErrorKind::ProviderMalformed,
        }
    }
}

/// A source of readings.
///
/// Implementations hold no state between calls that affects the result;
/// each call is one outbound request.
pub trait Fetcher: Send + Sync + 'static {
    /// Perform one request and map the response into a reading.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the provider cannot be reached, answers
    /// with an error status, or sends a body without the expected fields.
    fn fetch(&self) -> impl Future<Output = Result<NewReading, FetchError>> + Send;
}
