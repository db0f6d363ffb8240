//! Data types exchanged with the RAG service.
//!
//! Wire structs mirror the JSON contract of the remote endpoints (camelCase
//! keys); the domain types ([`IngestionResult`], [`QueryAnswer`],
//! [`ResponseMetadata`]) are what the rest of the client works with.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Retrieval and generation parameters sent with every query.
///
/// Read from the `[query]` config section (snake_case keys) and sent on the
/// wire with camelCase keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct QueryOptions {
    pub retrieval_limit: u32,
    pub score_threshold: f32,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            retrieval_limit: 5,
            score_threshold: 0.7,
            model: "gpt-4".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
        }
    }
}

/// Body of `POST /api/retrieval/query`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub query: String,
    pub options: QueryOptions,
}

/// Outcome of one successful ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestionResult {
    pub document_count: u64,
    pub collection_name: Option<String>,
    /// Server-reported time, passed through as text.
    pub timestamp: Option<String>,
    /// Leading excerpt of pasted content. Only set for text submissions.
    pub preview: Option<String>,
}

/// Assistant answer parsed from the query endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAnswer {
    pub response: String,
    pub metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseMetadata {
    pub documents_found: u64,
    pub sources: Vec<String>,
    pub processing_time: String,
}

// ============ Wire formats ============

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IndexingData {
    pub document_count: u64,
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub processing_time: Option<Value>,
}

impl From<IndexingData> for IngestionResult {
    fn from(data: IndexingData) -> Self {
        let timestamp = data
            .timestamp
            .or(data.processing_time)
            .map(|v| value_to_text(&v));
        IngestionResult {
            document_count: data.document_count,
            collection_name: data.collection_name,
            timestamp,
            preview: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryData {
    pub response: String,
    #[serde(default)]
    pub retrieval: Option<RetrievalInfo>,
    #[serde(default)]
    pub context: Option<ContextInfo>,
    #[serde(default)]
    pub performance: Option<PerformanceInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RetrievalInfo {
    #[serde(default)]
    pub documents_found: u64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ContextInfo {
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PerformanceInfo {
    #[serde(default)]
    pub total_time: Option<Value>,
}

impl From<QueryData> for QueryAnswer {
    fn from(data: QueryData) -> Self {
        let metadata = if data.retrieval.is_none()
            && data.context.is_none()
            && data.performance.is_none()
        {
            None
        } else {
            Some(ResponseMetadata {
                documents_found: data.retrieval.unwrap_or_default().documents_found,
                sources: data.context.unwrap_or_default().sources,
                processing_time: data
                    .performance
                    .and_then(|p| p.total_time)
                    .map(|v| value_to_text(&v))
                    .unwrap_or_default(),
            })
        };
        QueryAnswer {
            response: data.response,
            metadata,
        }
    }
}

/// Extract the human-readable message from an error body.
///
/// Accepts `{"error": "..."}` as well as `{"error": {"message": "..."}}`.
pub(crate) fn error_message(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(obj) => obj
            .get("message")
            .and_then(|m| m.as_str())
            .map(|m| m.to_string()),
        _ => None,
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_options_serialize_camel_case() {
        let body = serde_json::to_value(QueryRequest {
            query: "q".into(),
            options: QueryOptions::default(),
        })
        .unwrap();
        assert_eq!(body["options"]["retrievalLimit"], 5);
        assert_eq!(body["options"]["maxTokens"], 1000);
        assert_eq!(body["options"]["model"], "gpt-4");
        assert!(body["options"].get("retrieval_limit").is_none());
    }

    #[test]
    fn query_answer_with_full_metadata() {
        let env: Envelope<QueryData> = serde_json::from_value(json!({
            "data": {
                "response": "Refunds are...",
                "retrieval": { "documentsFound": 2 },
                "context": { "sources": ["policy.pdf"] },
                "performance": { "totalTime": "120ms" }
            }
        }))
        .unwrap();
        let answer = QueryAnswer::from(env.data);
        let meta = answer.metadata.unwrap();
        assert_eq!(answer.response, "Refunds are...");
        assert_eq!(meta.documents_found, 2);
        assert_eq!(meta.sources, vec!["policy.pdf".to_string()]);
        assert_eq!(meta.processing_time, "120ms");
    }

    #[test]
    fn query_answer_without_metadata() {
        let env: Envelope<QueryData> =
            serde_json::from_value(json!({ "data": { "response": "hi" } })).unwrap();
        assert!(QueryAnswer::from(env.data).metadata.is_none());
    }

    #[test]
    fn numeric_total_time_is_rendered() {
        let env: Envelope<QueryData> = serde_json::from_value(json!({
            "data": { "response": "x", "performance": { "totalTime": 120 } }
        }))
        .unwrap();
        let meta = QueryAnswer::from(env.data).metadata.unwrap();
        assert_eq!(meta.processing_time, "120");
        assert_eq!(meta.documents_found, 0);
        assert!(meta.sources.is_empty());
    }

    #[test]
    fn indexing_data_minimal() {
        let env: Envelope<IndexingData> =
            serde_json::from_value(json!({ "data": { "documentCount": 3 } })).unwrap();
        let result = IngestionResult::from(env.data);
        assert_eq!(result.document_count, 3);
        assert!(result.collection_name.is_none());
        assert!(result.timestamp.is_none());
    }

    #[test]
    fn error_message_shapes() {
        assert_eq!(
            error_message(&json!({ "error": "corrupt file" })).as_deref(),
            Some("corrupt file")
        );
        assert_eq!(
            error_message(&json!({ "error": { "code": "bad", "message": "nope" } })).as_deref(),
            Some("nope")
        );
        assert!(error_message(&json!({ "status": "fail" })).is_none());
    }
}
