//! From trait implementations for DispatchError conversions

use super::types::DispatchError;

impl From<std::io::Error> for DispatchError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(error: serde_json::Error) -> Self {
        Self::json(error.to_string())
    }
}

impl From<reqwest::Error> for DispatchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::http(format!("request timed out: {}", error));
        }
        Self::http(error.to_string())
    }
}
