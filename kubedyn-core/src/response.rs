//! Response bodies and their classification into success or [`Status`] failure
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A Kubernetes status object
///
/// Returned by the apiserver for failed requests, and synthesized locally when the server
/// answers a failed request with plain text instead.
#[derive(Error, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[error("{message}: {reason}")]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// Always `v1` for statuses
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Always `Status`
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Status of the operation
    ///
    /// One of: `Success` or `Failure` - [more info](https://git.k8s.io/community/contributors/devel/sig-architecture/api-conventions.md#spec-and-status)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusSummary>,

    /// Suggested HTTP return code (0 if unset)
    #[serde(default)]
    pub code: u16,

    /// A machine-readable description of why this operation is in the “Failure” status.
    #[serde(default)]
    pub reason: String,

    /// A human-readable description of the status of this operation
    #[serde(default)]
    pub message: String,

    /// List metadata, empty for failures
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Extended data associated with the reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<StatusDetails>,
}

fn default_api_version() -> String {
    "v1".into()
}

fn default_kind() -> String {
    "Status".into()
}

impl Status {
    /// Returns an unsuccessful `Status`
    pub fn failure(code: u16, reason: &str, message: &str) -> Self {
        Status {
            api_version: default_api_version(),
            kind: default_kind(),
            status: Some(StatusSummary::Failure),
            code,
            reason: reason.to_string(),
            message: message.to_string(),
            metadata: Map::new(),
            details: None,
        }
    }

    /// Checks if this `Status` represents failure
    pub fn is_failure(&self) -> bool {
        self.status == Some(StatusSummary::Failure)
    }
}

/// Overall status of the operation - whether it succeeded or not
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub enum StatusSummary {
    /// Operation succeeded
    Success,
    /// Operation failed
    Failure,
}

/// Additional properties that MAY be set by the server on a [`Status`]
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StatusDetails {
    /// Name of the resource the status is about
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Group of the resource the status is about
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
    /// Kind of the resource the status is about
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    /// UID of the resource the status is about
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    /// Individual causes of the failure
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<StatusCause>,
    /// Seconds to wait before retrying, if the server suggests it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u32>,
}

/// One cause of a [`Status`] failure
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone)]
pub struct StatusCause {
    /// Machine-readable description of the cause
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    /// Human-readable description of the cause
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Field of the resource that caused the failure
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field: String,
}

/// A response body as received from the server
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The body parsed as json
    Json(Value),
    /// The body was not json
    Text(String),
}

impl ResponseBody {
    /// Interpret a body, preferring json and falling back to text
    pub fn from_text(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(text),
        }
    }

    /// The body as a json value; text becomes a json string
    pub fn into_value(self) -> Value {
        match self {
            Self::Json(v) => v,
            Self::Text(t) => Value::String(t),
        }
    }

    fn is_status_failure(&self) -> bool {
        matches!(self, Self::Json(v) if v["kind"] == "Status" && v["status"] == "Failure")
    }
}

/// Classify a response into success or a [`Status`] failure
///
/// - without `cooked`, the body is always returned as is
/// - a json `Status` with `status: Failure` is a failure
/// - a text body on a non-success status code becomes a synthesized `Status`, carrying the
///   http code and reason, with the text as message
///
/// Everything else is a success carrying the body unchanged. In particular a text body on a
/// 2xx code is a success: endpoints such as pod logs answer with plain text, so only the status
/// code decides whether a text reply is a rejection.
pub fn classify(code: http::StatusCode, body: ResponseBody, cooked: bool) -> Result<Value, Status> {
    if !cooked {
        return Ok(body.into_value());
    }
    let reason = code.canonical_reason().unwrap_or_default();
    if body.is_status_failure() {
        let value = body.into_value();
        return Err(serde_json::from_value::<Status>(value.clone()).unwrap_or_else(|_| {
            let message = value["message"].as_str().unwrap_or_default();
            Status::failure(code.as_u16(), reason, message)
        }));
    }
    match body {
        ResponseBody::Text(text) if !code.is_success() => Err(Status::failure(code.as_u16(), reason, &text)),
        body => Ok(body.into_value()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use http::StatusCode;
    use serde_json::json;

    #[test]
    fn status_failure_is_classified_when_cooked() {
        let body = json!({"kind": "Status", "status": "Failure", "message": "x"});
        let err = classify(StatusCode::NOT_FOUND, ResponseBody::Json(body), true).unwrap_err();
        assert_eq!(err.message, "x");
        assert!(err.is_failure());
        assert_eq!(err.to_string(), "x: ");
    }

    #[test]
    fn status_failure_passes_through_when_raw() {
        let body = json!({"kind": "Status", "status": "Failure", "message": "x"});
        let ok = classify(StatusCode::NOT_FOUND, ResponseBody::Json(body.clone()), false).unwrap();
        assert_eq!(ok, body);
    }

    #[test]
    fn text_rejection_is_synthesized() {
        let body = ResponseBody::from_text("Unauthorized".into());
        assert_eq!(body, ResponseBody::Text("Unauthorized".into()));
        let err = classify(StatusCode::UNAUTHORIZED, body, true).unwrap_err();
        assert_eq!(err.code, 401);
        assert_eq!(err.message, "Unauthorized");
        assert_eq!(err.reason, "Unauthorized");
        assert_json_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({
                "apiVersion": "v1",
                "kind": "Status",
                "status": "Failure",
                "code": 401,
                "reason": "Unauthorized",
                "message": "Unauthorized",
                "metadata": {}
            })
        );
    }

    #[test]
    fn text_on_success_is_not_a_failure() {
        let body = ResponseBody::from_text("log line\n".into());
        let ok = classify(StatusCode::OK, body, true).unwrap();
        assert_eq!(ok, json!("log line\n"));
        let body = ResponseBody::from_text("Unauthorized".into());
        assert_eq!(classify(StatusCode::OK, body, true).unwrap(), json!("Unauthorized"));
    }

    #[test]
    fn regular_objects_succeed() {
        let pod = json!({"kind": "Pod", "metadata": {"name": "p"}});
        let ok = classify(StatusCode::OK, ResponseBody::Json(pod.clone()), true).unwrap();
        assert_eq!(ok, pod);
        let success = json!({"kind": "Status", "status": "Success"});
        assert!(classify(StatusCode::OK, ResponseBody::Json(success), true).is_ok());
    }

    #[test]
    fn full_status_parses() {
        let body = json!({
          "kind": "Status",
          "apiVersion": "v1",
          "metadata": {},
          "status": "Failure",
          "message": "leases.coordination.k8s.io \"test\" is invalid",
          "reason": "Invalid",
          "details": {
            "name": "test",
            "group": "coordination.k8s.io",
            "kind": "leases",
            "causes": [{"reason": "FieldValueInvalid", "message": "Invalid value", "field": "metadata.resourceVersion"}]
          },
          "code": 422
        });
        let err = classify(StatusCode::UNPROCESSABLE_ENTITY, ResponseBody::Json(body), true).unwrap_err();
        assert_eq!(err.code, 422);
        let details = err.details.unwrap();
        assert_eq!(details.name, "test");
        assert_eq!(details.causes[0].field, "metadata.resourceVersion");
    }
}
