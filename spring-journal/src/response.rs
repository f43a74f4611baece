//! Three-way triage applied to every HTTP response from the backend.

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// A decoded success body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// Deserialize a JSON body. A text body is tried as JSON too, since some
    /// endpoints forget the content type.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            Self::Json(value) => Ok(serde_json::from_value(value)?),
            Self::Text(text) => Ok(serde_json::from_str(&text)?),
        }
    }

    /// The body as plain text. A JSON string yields its contents, any other
    /// JSON value its serialized form.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Json(Value::String(text)) => text,
            Self::Json(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Unauthorized,
    ApplicationError(String),
    Success(ResponseBody),
}

/// The parts of a response the classifier looks at.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub async fn read(response: reqwest::Response) -> Result<Self, ApiError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        Ok(Self {
            status,
            content_type,
            body,
        })
    }
}

pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}

/// Classify a response.
///
/// 1. 401 or 403 is `Unauthorized`, whatever the body says.
/// 2. Any other non-2xx is `ApplicationError` carrying the body text, or
///    `default_message` when the body is blank.
/// 3. Otherwise `Success`, parsed as JSON when the content type says so.
///    A JSON-typed body that fails to parse is an invalid response.
pub fn classify(raw: RawResponse, default_message: &str) -> Result<Classification, ApiError> {
    let status = StatusCode::from_u16(raw.status)
        .map_err(|_| ApiError::invalid_response(format!("bad status code {}", raw.status)))?;

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Ok(Classification::Unauthorized);
    }

    if !status.is_success() {
        let message = if raw.body.trim().is_empty() {
            default_message.to_string()
        } else {
            raw.body
        };
        return Ok(Classification::ApplicationError(message));
    }

    if is_json_content_type(raw.content_type.as_deref()) {
        if raw.body.trim().is_empty() {
            return Ok(Classification::Success(ResponseBody::Json(Value::Null)));
        }
        let value = serde_json::from_str(&raw.body)?;
        return Ok(Classification::Success(ResponseBody::Json(value)));
    }

    Ok(Classification::Success(ResponseBody::Text(raw.body)))
}

pub async fn classify_response(
    response: reqwest::Response,
    default_message: &str,
) -> Result<Classification, ApiError> {
    let raw = RawResponse::read(response).await?;
    let status = raw.status;
    let classification = classify(raw, default_message)?;
    tracing::debug!(status, kind = classification.kind(), "classified response");
    Ok(classification)
}

impl Classification {
    fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::ApplicationError(_) => "application_error",
            Self::Success(ResponseBody::Json(_)) => "success_json",
            Self::Success(ResponseBody::Text(_)) => "success_text",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(status: u16, content_type: Option<&str>, body: &str) -> RawResponse {
        RawResponse {
            status,
            content_type: content_type.map(str::to_string),
            body: body.to_string(),
        }
    }

    #[test]
    fn auth_statuses_are_unauthorized_regardless_of_body() {
        for status in [401, 403] {
            for body in ["", "Forbidden", "{\"error\":\"expired\"}"] {
                let result = classify(raw(status, Some("application/json"), body), "x").unwrap();
                assert_eq!(result, Classification::Unauthorized, "{status} {body}");
            }
        }
    }

    #[test]
    fn failure_uses_body_text_when_present() {
        let result = classify(raw(500, None, "Journal not found"), "Failed").unwrap();
        assert_eq!(
            result,
            Classification::ApplicationError("Journal not found".into())
        );
    }

    #[test]
    fn failure_falls_back_to_default_message() {
        let result = classify(raw(404, Some("text/plain"), "  "), "Failed to fetch").unwrap();
        assert_eq!(
            result,
            Classification::ApplicationError("Failed to fetch".into())
        );
    }

    #[test]
    fn json_content_type_parses_body() {
        let result = classify(
            raw(200, Some("application/json;charset=UTF-8"), r#"[{"title":"a"}]"#),
            "x",
        )
        .unwrap();
        assert_eq!(
            result,
            Classification::Success(ResponseBody::Json(json!([{"title": "a"}])))
        );
    }

    #[test]
    fn other_content_types_stay_text() {
        let result = classify(raw(200, Some("text/plain"), "abc.def.ghi"), "x").unwrap();
        assert_eq!(
            result,
            Classification::Success(ResponseBody::Text("abc.def.ghi".into()))
        );

        let result = classify(raw(201, None, "[1,2]"), "x").unwrap();
        assert_eq!(
            result,
            Classification::Success(ResponseBody::Text("[1,2]".into()))
        );
    }

    #[test]
    fn empty_json_success_is_null() {
        let result = classify(raw(204, Some("application/json"), ""), "x").unwrap();
        assert_eq!(result, Classification::Success(ResponseBody::Json(Value::Null)));
    }

    #[test]
    fn malformed_json_success_is_an_invalid_response() {
        let err = classify(raw(200, Some("application/json"), "{oops"), "x").unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn body_text_conversion() {
        assert_eq!(ResponseBody::Json(json!("hi")).into_text(), "hi");
        assert_eq!(ResponseBody::Json(json!(true)).into_text(), "true");
        assert!(ResponseBody::Text("true".into()).json::<bool>().unwrap());
    }
}
