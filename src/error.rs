use thiserror::Error;

/// The input gate that rejected a run. Checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingInput {
    Credentials,
    Sites,
    Regex,
}

impl std::fmt::Display for MissingInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            MissingInput::Credentials => "Upload a GA4 service account JSON (--credentials)",
            MissingInput::Sites => "Select at least one site (--site)",
            MissingInput::Regex => "Enter at least one regex (--regex or --regex-file)",
        };
        f.write_str(message)
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{0}")]
    MissingInput(MissingInput),

    #[error("Invalid service account credentials: {0}")]
    Authentication(String),

    #[error("Unknown property id '{0}'")]
    UnknownProperty(String),

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("Report request failed for property {property_id}: {message}")]
    ServiceCall {
        property_id: String,
        message: String,
    },

    #[error("Metric {metric} value '{value}' for property {property_id} is not an integer")]
    MalformedMetric {
        property_id: String,
        metric: &'static str,
        value: String,
    },

    #[error("Malformed report row for property {property_id}: {reason}")]
    MalformedResponse {
        property_id: String,
        reason: String,
    },

    #[error("Failed to start worker pool: {0}")]
    WorkerPool(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl ReportError {
    pub fn service_call(property_id: &str, message: impl Into<String>) -> Self {
        Self::ServiceCall {
            property_id: property_id.to_string(),
            message: message.into(),
        }
    }

    pub fn is_missing_input(&self) -> bool {
        matches!(self, ReportError::MissingInput(_))
    }
}

pub type ReportResult<T> = Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_messages_name_the_flag() {
        let err = ReportError::MissingInput(MissingInput::Credentials);
        assert!(err.to_string().contains("--credentials"));
        assert!(err.is_missing_input());
        assert!(!ReportError::UnknownProperty("1".into()).is_missing_input());
    }

    #[test]
    fn http_client_failure_is_not_an_authentication_error() {
        let err = ReportError::HttpClient("no TLS backend".into());
        assert_eq!(err.to_string(), "Failed to build HTTP client: no TLS backend");
        assert!(!matches!(err, ReportError::Authentication(_)));
    }
}
