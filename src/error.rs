use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Strava API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("No access token available; check STRAVA_CLIENT_ID, STRAVA_CLIENT_SECRET and STRAVA_REFRESH_TOKEN")]
    NoCredential,

    #[error("Rate limited by Strava")]
    RateLimited,

    #[error("Still rate limited after {attempts} retries")]
    RateLimitExhausted { attempts: u32 },

    #[error("Unsupported activity type: {0}. Supported types: Run, WeightTraining")]
    UnsupportedActivityType(String),

    #[error("Invalid date format: {0}. Expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not read env file: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error("Another sync is already running (lock held on {0})")]
    AlreadyRunning(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Process exit code for this failure, so scripts can tell failure
    /// classes apart.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::NoCredential | Error::Auth(_) => 2,
            Error::UnsupportedActivityType(_)
            | Error::InvalidDate(_)
            | Error::Config(_)
            | Error::EnvFile(_) => 3,
            Error::Http(_)
            | Error::Api { .. }
            | Error::RateLimited
            | Error::RateLimitExhausted { .. } => 4,
            Error::AlreadyRunning(_) => 5,
            Error::Json(_) | Error::Io(_) | Error::Other(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_type_message() {
        let err = Error::UnsupportedActivityType("Swim".into());
        assert!(err.to_string().contains("Swim"));
        assert!(err.to_string().contains("Run, WeightTraining"));
    }

    #[test]
    fn test_exit_codes_are_distinct_per_class() {
        assert_eq!(Error::NoCredential.exit_code(), 2);
        assert_eq!(Error::Auth("expired".into()).exit_code(), 2);
        assert_eq!(Error::UnsupportedActivityType("Swim".into()).exit_code(), 3);
        assert_eq!(
            Error::Api {
                status: 500,
                message: "boom".into()
            }
            .exit_code(),
            4
        );
        assert_eq!(Error::RateLimitExhausted { attempts: 3 }.exit_code(), 4);
        assert_eq!(Error::AlreadyRunning("x".into()).exit_code(), 5);
        assert_eq!(Error::Other("x".into()).exit_code(), 1);
    }
}
