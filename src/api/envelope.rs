// Response envelope shared by every exposed operation

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// `{status, data?, message?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The failure behind an error envelope, for in-process callers
    #[serde(skip)]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: Status::Success,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn failure(error: ApiError) -> Self {
        Self {
            status: Status::Error,
            data: None,
            message: Some(error.to_string()),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn into_result(self) -> Result<T, ApiError> {
        match (self.status, self.data, self.error) {
            (Status::Success, Some(data), _) => Ok(data),
            (_, _, Some(error)) => Err(error),
            (_, _, None) => Err(ApiError::InternalFailure(
                self.message.unwrap_or_else(|| "empty response".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_shape() {
        let response = ApiResponse::success(vec![1, 2]).with_message("done");
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"status": "success", "data": [1, 2], "message": "done"})
        );
    }

    #[test]
    fn test_error_envelope_omits_data() {
        let response: ApiResponse<()> = ApiResponse::failure(ApiError::not_found("Asset", "AST-9"));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"status": "error", "message": "Asset AST-9 does not exist"})
        );
        assert_eq!(response.into_result(), Err(ApiError::not_found("Asset", "AST-9")));
    }
}
