use codescout_protocol::{ErrorEnvelope, ToolNextAction};
use codescout_registry::ServiceError;
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use serde_json::json;

/// Wrap a successful payload: human-readable JSON text plus the same
/// value as structured content for clients that parse it.
pub(super) fn tool_success<T: Serialize>(payload: &T) -> CallToolResult {
    let value = serde_json::to_value(payload).unwrap_or(serde_json::Value::Null);
    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string());
    let mut result = CallToolResult::success(vec![Content::text(text)]);
    result.structured_content = Some(value);
    result
}

/// Map a service failure to a tool error with a stable code and, where a
/// follow-up call can fix things, concrete next actions.
pub(super) fn tool_failure(err: &ServiceError, path: Option<&str>) -> CallToolResult {
    let envelope = envelope_for(err, path);
    let mut result = CallToolResult::error(vec![Content::text(envelope.message.clone())]);
    result.structured_content = Some(json!({ "error": envelope }));
    result
}

fn envelope_for(err: &ServiceError, path: Option<&str>) -> ErrorEnvelope {
    let message = err.to_string();
    match err {
        ServiceError::InvalidPath(_) => ErrorEnvelope::new("invalid_path", message),
        ServiceError::MissingCredential => ErrorEnvelope::new("missing_credential", message)
            .with_hint("Export CODESCOUT_API_KEY (or VOYAGE_API_KEY) in the server environment"),
        ServiceError::ProviderTransient(_) => ErrorEnvelope::new("provider_transient", message)
            .with_hint("The embedding provider should recover; retry the same call"),
        ServiceError::ProviderPermanent(_) => ErrorEnvelope::new("provider_permanent", message),
        ServiceError::StoreCorruption(_) => ErrorEnvelope::new("store_corruption", message)
            .with_next_actions(rebuild_actions(path, "Clear the corrupted store and rebuild it")),
        ServiceError::CapacityExceeded { .. } => ErrorEnvelope::new("capacity_exceeded", message)
            .with_hint("Stop watchers on unused projects or raise CODESCOUT_MAX_PROJECTS"),
        ServiceError::NotIndexed(_) => ErrorEnvelope::new("not_indexed", message)
            .with_next_actions(rebuild_actions(path, "Build the index for this project")),
        ServiceError::EmptyQuery => ErrorEnvelope::new("invalid_request", message),
        ServiceError::Internal(_) => ErrorEnvelope::new("internal", message),
    }
}

fn rebuild_actions(path: Option<&str>, reason: &str) -> Vec<ToolNextAction> {
    let args = match path {
        Some(path) => json!({ "path": path }),
        None => json!({}),
    };
    vec![ToolNextAction {
        tool: "index".to_string(),
        args,
        reason: reason.to_string(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corruption_suggests_a_rebuild() {
        let err = ServiceError::StoreCorruption("manifest unreadable".to_string());
        let envelope = envelope_for(&err, Some("/work/repo"));
        assert_eq!(envelope.code, "store_corruption");
        assert_eq!(envelope.next_actions.len(), 1);
        assert_eq!(envelope.next_actions[0].tool, "index");
        assert_eq!(envelope.next_actions[0].args, json!({ "path": "/work/repo" }));
    }

    #[test]
    fn missing_credential_carries_a_hint() {
        let envelope = envelope_for(&ServiceError::MissingCredential, None);
        assert_eq!(envelope.code, "missing_credential");
        assert!(envelope.hint.unwrap().contains("CODESCOUT_API_KEY"));
    }

    #[test]
    fn capacity_code_is_stable() {
        let envelope = envelope_for(
            &ServiceError::CapacityExceeded {
                active: 20,
                limit: 20,
            },
            None,
        );
        assert_eq!(envelope.code, "capacity_exceeded");
    }
}
