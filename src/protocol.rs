//! Newline-delimited JSON driver used by the binary.
//!
//! Each request line carries an `op` tag; each reply line is either
//! `{"success":true,"data":...}` or `{"success":false,"error":...,"code":...}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::affect::{AffectEngine, EngineError, Features};

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Recommend {
        state: String,
        #[serde(default)]
        features: Option<Features>,
    },
    Feedback {
        #[serde(default, alias = "sessionId")]
        session_id: Option<String>,
        state: String,
        action: String,
        reward: f64,
    },
    Estimates {
        category: String,
        state: String,
    },
    Categories,
}

#[derive(Debug, Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct ProtocolError {
    code: &'static str,
    message: String,
}

impl ProtocolError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST",
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: "INTERNAL_ERROR",
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn into_response(self) -> ErrorResponse {
        ErrorResponse {
            success: false,
            error: self.message,
            code: self.code.to_string(),
        }
    }
}

impl From<EngineError> for ProtocolError {
    fn from(err: EngineError) -> Self {
        let code = match err {
            EngineError::InvalidState | EngineError::InvalidReward(_) => "VALIDATION_ERROR",
            EngineError::UnknownAction(_) | EngineError::ActionNotInCategory { .. } => "UNKNOWN_ACTION",
            EngineError::UnknownCategory(_) => "NOT_FOUND",
            EngineError::Persistence(_) => "PERSISTENCE_ERROR",
        };
        Self {
            code,
            message: err.to_string(),
        }
    }
}

pub fn dispatch(engine: &AffectEngine, request: Request) -> Result<Value, ProtocolError> {
    let data = match request {
        Request::Recommend { state, features } => {
            to_value(engine.recommend(&state, features.as_ref())?)?
        }
        Request::Feedback {
            session_id,
            state,
            action,
            reward,
        } => to_value(engine.submit_session_feedback(session_id.as_deref(), &state, &action, reward)?)?,
        Request::Estimates { category, state } => to_value(engine.estimates(&category, &state)?)?,
        Request::Categories => to_value(engine.categories())?,
    };
    Ok(data)
}

/// Handles one raw line and always produces one serialized reply.
pub fn handle_line(engine: &AffectEngine, line: &str) -> String {
    let result = serde_json::from_str::<Request>(line)
        .map_err(|e| ProtocolError::bad_request(format!("invalid request: {e}")))
        .and_then(|request| dispatch(engine, request));

    let reply = match result {
        Ok(data) => serde_json::to_string(&SuccessResponse { success: true, data }),
        Err(err) => {
            tracing::debug!(code = err.code(), error = err.message(), "request failed");
            serde_json::to_string(&err.into_response())
        }
    };

    reply.unwrap_or_else(|e| {
        format!(r#"{{"success":false,"error":"failed to encode reply: {e}","code":"INTERNAL_ERROR"}}"#)
    })
}

fn to_value<T: Serialize>(value: T) -> Result<Value, ProtocolError> {
    serde_json::to_value(value).map_err(|e| ProtocolError::internal(e.to_string()))
}
