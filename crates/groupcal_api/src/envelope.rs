//! Response envelope shared by every API call.
//!
//! # Invariants
//! - Exactly one of `data` / `error` is present.
//! - `error.retryable` is `true` only for lock-contention conflicts.

use groupcal_core::model::schedule::ScheduleError;
use groupcal_core::{DbError, EngineError, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// `{ ok, data, error }` result of one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: ApiError) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error),
        }
    }

    pub fn into_result(self) -> Result<T, ApiError> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (_, Some(error)) => Err(error),
            (None, None) => Err(ApiError::internal("response carries neither data nor error")),
        }
    }
}

impl<T> From<Result<T, ApiError>> for ApiResponse<T> {
    fn from(value: Result<T, ApiError>) -> Self {
        match value {
            Ok(data) => Self::success(data),
            Err(error) => Self::failure(error),
        }
    }
}

/// Boundary error record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// `not_found` | `forbidden` | `invalid_schedule` | `invalid_input` |
    /// `conflict` | `internal`.
    pub kind: String,
    pub message: String,
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    pub field: Option<String>,
    pub retryable: bool,
}

impl ApiError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            message: message.into(),
            entity: None,
            entity_id: None,
            field: None,
            retryable: false,
        }
    }

    /// Malformed request shape, such as an unparsable id or date.
    pub fn invalid_input(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.to_string()),
            ..Self::new(ErrorKind::InvalidInput, message)
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind.as_str()
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<EngineError> for ApiError {
    fn from(value: EngineError) -> Self {
        let (entity, entity_id) = match value.entity() {
            Some((entity, id)) => (Some(entity.as_str().to_string()), Some(id)),
            None => (None, None),
        };
        Self {
            entity,
            entity_id,
            field: value.field().map(str::to_string),
            retryable: value.is_retryable(),
            ..Self::new(value.kind(), value.to_string())
        }
    }
}

impl From<DbError> for ApiError {
    fn from(value: DbError) -> Self {
        EngineError::from(value).into()
    }
}

/// Text that does not parse is an input error; shape violations keep their
/// schedule kind.
impl From<ScheduleError> for ApiError {
    fn from(value: ScheduleError) -> Self {
        match value {
            ScheduleError::Malformed { field, .. } => Self::invalid_input(field, value.to_string()),
            other => EngineError::from(other).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiError, ApiResponse};
    use groupcal_core::model::schedule::ScheduleError;
    use groupcal_core::{ConflictReason, EngineError, ErrorKind};

    #[test]
    fn contention_is_the_only_retryable_error() {
        let contention: ApiError = EngineError::Conflict(ConflictReason::Contention).into();
        assert_eq!(contention.kind, "conflict");
        assert!(contention.retryable);

        let duplicate: ApiError = EngineError::Conflict(ConflictReason::SoleRepresentative {
            group_id: uuid::Uuid::nil(),
        })
        .into();
        assert!(!duplicate.retryable);
        assert_eq!(duplicate.entity.as_deref(), Some("group"));
    }

    #[test]
    fn malformed_text_is_input_error_but_shape_is_schedule_error() {
        let malformed: ApiError = ScheduleError::Malformed {
            field: "date",
            value: "tomorrow".to_string(),
        }
        .into();
        assert!(malformed.is_kind(ErrorKind::InvalidInput));
        assert_eq!(malformed.field.as_deref(), Some("date"));

        let both: ApiError = ScheduleError::BothRepresentations.into();
        assert!(both.is_kind(ErrorKind::InvalidSchedule));
        assert_eq!(both.field.as_deref(), Some("schedule"));
    }

    #[test]
    fn envelope_serializes_ok_flag_and_payload() {
        let response = ApiResponse::success(7_u32);
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["ok"], true);
        assert_eq!(json["data"], 7);
        assert!(json["error"].is_null());

        let failure: ApiResponse<u32> = Err(ApiError::internal("boom")).into();
        assert!(!failure.ok);
        assert_eq!(failure.into_result().unwrap_err().kind, "internal");
    }
}
