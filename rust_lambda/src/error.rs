//! Error types for the notification resource handler

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// A malformed lifecycle request. Raised before the bucket is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required property {0}")]
    MissingProperty(String),

    #[error("Property {0} cannot be changed")]
    ImmutableProperty(String),

    #[error("Invalid resource properties: {0}")]
    InvalidProperties(String),
}

impl ValidationError {
    /// Property path the violation refers to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::MissingProperty(field) | ValidationError::ImmutableProperty(field) => {
                field
            }
            ValidationError::InvalidProperties(_) => "ResourceProperties",
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to fetch notification configuration of bucket {bucket}: {message}")]
    StoreFetch { bucket: String, message: String },

    #[error("Failed to persist notification configuration of bucket {bucket}: {message}")]
    StorePersist { bucket: String, message: String },
}

impl Error {
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "ValidationError",
            Error::StoreFetch { .. } => "StoreFetchError",
            Error::StorePersist { .. } => "StorePersistError",
        }
    }

    pub(crate) fn fetch(bucket: &str, message: impl Into<String>) -> Self {
        Error::StoreFetch {
            bucket: bucket.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn persist(bucket: &str, message: impl Into<String>) -> Self {
        Error::StorePersist {
            bucket: bucket.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        let err = ValidationError::MissingProperty("QueueConfigurations.QueueArn".to_string());
        assert_eq!(err.to_string(), "Missing required property QueueConfigurations.QueueArn");
        assert_eq!(err.field(), "QueueConfigurations.QueueArn");

        let err = ValidationError::ImmutableProperty("Bucket".to_string());
        assert_eq!(err.to_string(), "Property Bucket cannot be changed");
    }

    #[test]
    fn test_error_kinds() {
        let err: Error = ValidationError::MissingProperty("Bucket".to_string()).into();
        assert_eq!(err.kind(), "ValidationError");
        assert_eq!(err.to_string(), "Missing required property Bucket");

        let err = Error::fetch("b", "AccessDenied");
        assert_eq!(err.kind(), "StoreFetchError");
        assert!(err.to_string().contains("bucket b"));

        assert_eq!(Error::persist("b", "boom").kind(), "StorePersistError");
    }
}
