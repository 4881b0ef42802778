//! Worker message protocol.
//!
//! Requests and responses travel as JSON text:
//!
//! ```text
//! -> {"type":"validate","id":7,"content":"...","options":{...}}
//! <- {"id":7,"type":"validation_result","result":{...},"success":true}
//! <- {"id":7,"type":"error","error":"...","success":false}
//! ```
//!
//! `batch_validate` carries `contents` and answers with `results`.

use std::sync::atomic::{AtomicU64, Ordering};

use cfm_core::{Evaluator, ValidationOptions, ValidationResult};
use serde::{Deserialize, Serialize};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique request id.
pub fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

/// Message sent to a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerRequest {
    Validate {
        id: u64,
        content: String,
        #[serde(default)]
        options: ValidationOptions,
    },
    BatchValidate {
        id: u64,
        contents: Vec<String>,
        #[serde(default)]
        options: ValidationOptions,
    },
}

impl WorkerRequest {
    pub fn validate(content: impl Into<String>, options: ValidationOptions) -> Self {
        Self::Validate {
            id: next_request_id(),
            content: content.into(),
            options,
        }
    }

    pub fn batch_validate(contents: Vec<String>, options: ValidationOptions) -> Self {
        Self::BatchValidate {
            id: next_request_id(),
            contents,
            options,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Self::Validate { id, .. } | Self::BatchValidate { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    ValidationResult,
    Error,
}

/// Message sent back by a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub id: u64,

    #[serde(rename = "type")]
    pub kind: ResponseKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ValidationResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ValidationResult>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub success: bool,
}

impl WorkerResponse {
    pub fn single(id: u64, result: ValidationResult) -> Self {
        Self {
            id,
            kind: ResponseKind::ValidationResult,
            result: Some(result),
            results: None,
            error: None,
            success: true,
        }
    }

    pub fn batch(id: u64, results: Vec<ValidationResult>) -> Self {
        Self {
            id,
            kind: ResponseKind::ValidationResult,
            result: None,
            results: Some(results),
            error: None,
            success: true,
        }
    }

    pub fn error(id: u64, error: impl Into<String>) -> Self {
        Self {
            id,
            kind: ResponseKind::Error,
            result: None,
            results: None,
            error: Some(error.into()),
            success: false,
        }
    }
}

/// Worker side: answer one request.
pub fn handle_request(evaluator: &Evaluator, request: &WorkerRequest) -> WorkerResponse {
    match request {
        WorkerRequest::Validate { id, content, options } => {
            WorkerResponse::single(*id, evaluator.evaluate(content, options))
        }
        WorkerRequest::BatchValidate { id, contents, options } => WorkerResponse::batch(
            *id,
            contents
                .iter()
                .map(|content| evaluator.evaluate(content, options))
                .collect(),
        ),
    }
}

/// Worker side: decode a JSON request, evaluate, encode the response.
///
/// An undecodable request gets an `error` response with id 0.
pub fn handle_message(evaluator: &Evaluator, raw: &str) -> Result<String, serde_json::Error> {
    let response = match serde_json::from_str::<WorkerRequest>(raw) {
        Ok(request) => handle_request(evaluator, &request),
        Err(e) => WorkerResponse::error(0, format!("malformed request: {}", e)),
    };
    serde_json::to_string(&response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let request = WorkerRequest::Validate {
            id: 42,
            content: "texto".into(),
            options: ValidationOptions::strict(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "validate");
        assert_eq!(json["id"], 42);
        assert_eq!(json["content"], "texto");
        assert_eq!(json["options"]["strict_mode"], true);
    }

    #[test]
    fn test_request_options_default() {
        let request: WorkerRequest =
            serde_json::from_value(json!({"type": "validate", "id": 1, "content": "x"})).unwrap();
        assert_eq!(
            request,
            WorkerRequest::Validate {
                id: 1,
                content: "x".into(),
                options: ValidationOptions::default(),
            }
        );
    }

    #[test]
    fn test_ids_are_unique() {
        let a = WorkerRequest::validate("a", ValidationOptions::default());
        let b = WorkerRequest::validate("b", ValidationOptions::default());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_handle_message_validate() {
        let evaluator = Evaluator::new();
        let raw = r#"{"type":"validate","id":9,"content":"Tome este remédio duas vezes ao dia."}"#;
        let reply = handle_message(&evaluator, raw).unwrap();
        let json: serde_json::Value = serde_json::from_str(&reply).unwrap();

        assert_eq!(json["id"], 9);
        assert_eq!(json["type"], "validation_result");
        assert_eq!(json["success"], true);
        assert_eq!(json["result"]["score"], 25);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_handle_message_batch() {
        let evaluator = Evaluator::new();
        let raw = r#"{"type":"batch_validate","id":3,"contents":["", "Catarata."]}"#;
        let reply: WorkerResponse =
            serde_json::from_str(&handle_message(&evaluator, raw).unwrap()).unwrap();

        let results = reply.results.unwrap();
        assert_eq!(reply.id, 3);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].score, 0);
        assert_eq!(results[1].score, 50);
    }

    #[test]
    fn test_handle_message_malformed() {
        let evaluator = Evaluator::new();
        let reply: WorkerResponse =
            serde_json::from_str(&handle_message(&evaluator, "{not json").unwrap()).unwrap();
        assert_eq!(reply.kind, ResponseKind::Error);
        assert!(!reply.success);
        assert!(reply.error.unwrap().starts_with("malformed request"));
    }
}
