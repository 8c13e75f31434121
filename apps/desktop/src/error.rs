//! # API Error Type
//!
//! Error type for calls that come in through the widget bridge.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow at the Bridge                             │
//! │                                                                         │
//! │  widget ──► publish_from_widget("PRODUCT_SELECTED", {...}, "Search")   │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │  unknown event type? ───── BusError::ContractViolation ──┐             │
//! │  payload mismatch?   ───── BusError::ContractViolation ──┤             │
//! │  queue full / closed ───── BusError::HostLoop*  ─────────┼─► ApiError  │
//! │                                                          │             │
//! │  listener failures never come back here; the bus logs them.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The widget receives `{"code": "CONTRACT_VIOLATION", "message": "..."}`.

use serde::Serialize;

use inventory_events::BusError;

/// Error returned from bridge calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for bridge responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Unknown event type or payload that breaks its contract
    ContractViolation,

    /// Host loop queue is full; the widget may retry
    Busy,

    /// Host loop is gone (shutting down)
    Unavailable,

    /// Configuration or catalog could not be loaded
    ConfigError,

    /// Anything else
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<BusError> for ApiError {
    fn from(err: BusError) -> Self {
        let code = match &err {
            BusError::ContractViolation(_) => ErrorCode::ContractViolation,
            BusError::HostLoopSaturated { .. } => ErrorCode::Busy,
            BusError::HostLoopClosed => ErrorCode::Unavailable,
            BusError::InvalidConfig(_)
            | BusError::ConfigLoadFailed(_)
            | BusError::ConfigSaveFailed(_) => ErrorCode::ConfigError,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::config(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::config(format!("Invalid JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_error_codes() {
        let err: ApiError = BusError::contract("unknown event type 'NOPE'").into();
        assert_eq!(err.code, ErrorCode::ContractViolation);
        assert!(err.message.contains("NOPE"));

        let err: ApiError = BusError::HostLoopSaturated { capacity: 4 }.into();
        assert_eq!(err.code, ErrorCode::Busy);

        let err: ApiError = BusError::HostLoopClosed.into();
        assert_eq!(err.code, ErrorCode::Unavailable);
    }

    #[test]
    fn test_serialization() {
        let err = ApiError::new(ErrorCode::ContractViolation, "bad payload");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "CONTRACT_VIOLATION");
        assert_eq!(json["message"], "bad payload");
    }
}
