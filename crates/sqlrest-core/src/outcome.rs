// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The uniform completion contract handed to every caller.

use serde::Serialize;

use crate::error::{ErrorCode, SqlRestError};
use crate::payload::Payload;

/// `(success, result, errorMessage, errorCode)` for one completed request.
///
/// Exactly one side is populated: on success `result` may carry a payload and
/// both error fields are `None`; on failure `result` is `None` and both error
/// fields are set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub success: bool,
    pub result: Option<Payload>,
    pub error_message: Option<String>,
    pub error_code: Option<ErrorCode>,
}

impl Outcome {
    pub fn success(result: Payload) -> Self {
        Self {
            success: true,
            result: Some(result),
            error_message: None,
            error_code: None,
        }
    }

    pub fn failure(error: &SqlRestError) -> Self {
        Self {
            success: false,
            result: None,
            error_message: Some(error.to_string()),
            error_code: Some(error.code()),
        }
    }

    /// Convert back into a `Result`, dropping the message on failure.
    pub fn into_result(self) -> Result<Option<Payload>, ErrorCode> {
        match self.error_code {
            Some(code) => Err(code),
            None => Ok(self.result),
        }
    }
}

impl From<Result<Payload, SqlRestError>> for Outcome {
    fn from(result: Result<Payload, SqlRestError>) -> Self {
        match result {
            Ok(payload) => Outcome::success(payload),
            Err(e) => Outcome::failure(&e),
        }
    }
}
