//! Protocol layer tests — ids, contexts, snapshots, failures, error types.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::Utc;
    use reqcycle_protocol::*;
    use serde_json::json;

    // ─────────────────────────────────────────────────────────────────────
    // RequestId
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn request_id_serializes_as_plain_string() {
        let id = RequestId::from("abc-123");
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json, json!("abc-123"));
    }

    #[test]
    fn request_id_deserializes_from_string() {
        let id: RequestId = serde_json::from_value(json!("req-1")).unwrap();
        assert_eq!(id, "req-1");
    }

    #[test]
    fn request_id_hashes_by_value() {
        let mut seen = HashSet::new();
        seen.insert(RequestId::from("a"));
        seen.insert(RequestId::from(String::from("a")));
        seen.insert(RequestId::from("b"));
        assert_eq!(seen.len(), 2);
    }

    // ─────────────────────────────────────────────────────────────────────
    // ExecutionContext
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn worker_contexts_key_by_number() {
        assert_eq!(ExecutionContext::worker(3), ExecutionContext::worker(3));
        assert_ne!(ExecutionContext::worker(3), ExecutionContext::worker(4));
        assert_eq!(ExecutionContext::worker(3).key(), Some(ContextKey::Worker(3)));
    }

    #[test]
    fn thread_and_worker_contexts_never_collide() {
        let thread = ExecutionContext::current();
        let worker = ExecutionContext::worker(1);
        assert_ne!(thread.key(), worker.key());
    }

    #[test]
    fn unbound_context_has_no_key() {
        assert!(!ExecutionContext::unbound().is_bound());
        assert!(ExecutionContext::from(ContextKey::Worker(0)).is_bound());
    }

    // ─────────────────────────────────────────────────────────────────────
    // RequestSnapshot
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn snapshot_uses_camel_case() {
        let snap = RequestSnapshot {
            id: RequestId::from("r-9"),
            context: "worker:2".into(),
            started_at: Utc::now(),
            elapsed_ms: 15,
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["id"], "r-9");
        assert_eq!(json["context"], "worker:2");
        assert_eq!(json["elapsedMs"], 15);
        assert!(json["startedAt"].is_string());
    }

    // ─────────────────────────────────────────────────────────────────────
    // Errors
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn only_interceptor_errors_carry_a_request_id() {
        assert!(RequestError::InvalidContext.request_id().is_none());
        assert!(RequestError::invalid_argument("x").request_id().is_none());

        let err = RequestError::Interceptors(InterceptorFailures {
            request_id: RequestId::from("r-2"),
            phase: Phase::Start,
            failures: vec![],
        });
        assert_eq!(err.kind(), ErrorKind::InterceptorFailure);
        assert_eq!(err.request_id().unwrap(), "r-2");
        assert_eq!(err.interceptor_failures().unwrap().phase, Phase::Start);
    }

    #[test]
    fn hook_failure_serialization() {
        let failure = HookFailure {
            interceptor: "audit".into(),
            position: 1,
            message: "nope".into(),
            panicked: false,
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["interceptor"], "audit");
        assert_eq!(json["position"], 1);

        let parsed: HookFailure =
            serde_json::from_value(json!({"interceptor": "a", "position": 0, "message": "m"}))
                .unwrap();
        assert!(!parsed.panicked);
    }

    #[test]
    fn phase_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Phase::End).unwrap(), json!("end"));
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(ErrorKind::InvalidContext.to_string(), "invalid_context");
        assert_eq!(ErrorKind::InvalidArgument.as_str(), "invalid_argument");
    }

    #[test]
    fn failure_from_boxed_error() {
        let boxed: BoxError = "db unavailable".into();
        let failure = RequestFailure::from(boxed);
        assert_eq!(failure.message(), "db unavailable");
    }
}
