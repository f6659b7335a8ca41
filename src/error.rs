use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReviewError>;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cannot build scan context for subscription {subscription_id}: {source}")]
    ContextBuild {
        subscription_id: String,
        #[source]
        source: Box<ReviewError>,
    },

    #[error("Scan cancelled")]
    Cancelled,

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Inventory error: {0}")]
    Inventory(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReviewError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Cancelled => 130,
            _ => 2,
        }
    }

    /// How the orchestrator should treat this error for one unit of work.
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Cancelled => Disposition::Fatal,
            Self::Api(api) => match api.class() {
                ErrorClass::Permission | ErrorClass::Unavailable => Disposition::Skip,
                _ => Disposition::Fault,
            },
            Self::ContextBuild { source, .. } if matches!(**source, Self::Cancelled) => {
                Disposition::Fatal
            }
            _ => Disposition::Fault,
        }
    }
}

/// Whether an error is a benign absence or permission gap rather than a
/// real fault.
pub fn should_skip_error(err: &ReviewError) -> bool {
    err.disposition() == Disposition::Skip
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Degrade to an empty result for the unit of work and warn.
    Skip,
    /// Record against the unit of work; siblings continue.
    Fault,
    /// Stop the whole run.
    Fatal,
}

/// Error returned by a cloud listing call.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{status} {code}: {message}")]
pub struct ApiError {
    pub status: u16,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Permission,
    Unavailable,
    Configuration,
    Transient,
    Other,
}

const PERMISSION_CODES: &[&str] = &[
    "AuthorizationFailed",
    "Forbidden",
    "LinkedAuthorizationFailed",
];

const UNAVAILABLE_CODES: &[&str] = &[
    "MissingSubscriptionRegistration",
    "SubscriptionNotRegistered",
    "NoRegisteredProviderFound",
    "FeatureNotSupported",
    "ResourceTypeNotSupported",
    "LocationNotAvailableForResourceType",
    "ResourceGroupNotFound",
];

const CONFIGURATION_CODES: &[&str] = &[
    "InvalidAuthenticationToken",
    "InvalidSubscriptionId",
    "SubscriptionNotFound",
];

const TRANSIENT_CODES: &[&str] = &["TooManyRequests", "GatewayTimeout", "RequestTimeout"];

impl ApiError {
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Classify by status and error code. Rows are checked top to bottom,
    /// the first match wins.
    pub fn class(&self) -> ErrorClass {
        let code_in = |codes: &[&str]| codes.iter().any(|c| c.eq_ignore_ascii_case(&self.code));

        if self.status == 403 || code_in(PERMISSION_CODES) {
            ErrorClass::Permission
        } else if code_in(UNAVAILABLE_CODES) {
            ErrorClass::Unavailable
        } else if self.status == 401 || code_in(CONFIGURATION_CODES) {
            ErrorClass::Configuration
        } else if matches!(self.status, 408 | 429 | 500..=599) || code_in(TRANSIENT_CODES) {
            ErrorClass::Transient
        } else {
            ErrorClass::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_is_skipped() {
        let err = ReviewError::from(ApiError::new(403, "", "denied"));
        assert!(should_skip_error(&err));
        let err = ReviewError::from(ApiError::new(400, "authorizationfailed", "denied"));
        assert!(should_skip_error(&err));
    }

    #[test]
    fn unregistered_provider_is_skipped() {
        let err = ReviewError::from(ApiError::new(409, "MissingSubscriptionRegistration", ""));
        assert_eq!(err.disposition(), Disposition::Skip);
    }

    #[test]
    fn throttling_is_a_fault() {
        let api = ApiError::new(429, "TooManyRequests", "slow down");
        assert_eq!(api.class(), ErrorClass::Transient);
        assert_eq!(ReviewError::from(api).disposition(), Disposition::Fault);
    }

    #[test]
    fn bad_credentials_are_a_fault() {
        let api = ApiError::new(401, "InvalidAuthenticationToken", "expired");
        assert_eq!(api.class(), ErrorClass::Configuration);
        assert!(!should_skip_error(&ReviewError::from(api)));
    }

    #[test]
    fn cancellation_is_fatal() {
        assert_eq!(ReviewError::Cancelled.disposition(), Disposition::Fatal);
        let wrapped = ReviewError::ContextBuild {
            subscription_id: "sub".into(),
            source: Box::new(ReviewError::Cancelled),
        };
        assert_eq!(wrapped.disposition(), Disposition::Fatal);
    }

    #[test]
    fn unknown_error_is_a_fault() {
        let api = ApiError::new(400, "BadRequest", "nope");
        assert_eq!(api.class(), ErrorClass::Other);
        assert_eq!(ReviewError::from(api).disposition(), Disposition::Fault);
    }
}
