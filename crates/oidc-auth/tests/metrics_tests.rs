//! Metrics observer integration tests.
//!
//! Captures the metrics emitted by an engine with `MetricsObserver` attached.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use oidc_auth::{
    AuthAttempt, AuthConfig, AuthenticationEngine, MetricsObserver, StaticTokenTransport,
};
use oidc_test_utils::*;
use std::sync::Arc;

// Current-thread runtime keeps the thread-local recorder in scope for every poll.
#[tokio::test(flavor = "current_thread")]
async fn test_engine_records_attempt_metrics() -> Result<()> {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let _guard = metrics::set_default_local_recorder(&recorder);

    let key = test_signing_key(1)?;
    let engine = AuthenticationEngine::builder(AuthConfig::new("example", ["Acme:Viewer"]))
        .key_set_provider(Arc::new(StaticKeySetProvider::new(key.key_set())))
        .role_resolver(Arc::new(test_role_resolver()))
        .clear_observers()
        .observer(Arc::new(MetricsObserver))
        .build()?;

    let good = TestTokenBuilder::new().for_user("alice").sign_with(&key);
    for token in [good.clone(), good.clone(), flip_signature_bit(&good)] {
        let transport = StaticTokenTransport::new(token);
        engine
            .authenticate(AuthAttempt::IdentityToken(&transport))
            .await;
    }

    let metrics = snapshotter.snapshot().into_vec();
    let counter_value = |outcome: &str, reason: &str| -> Option<u64> {
        metrics.iter().find_map(|(key, _, _, value)| {
            let key = key.key();
            let matches = key.name() == "oidc_auth_attempts_total"
                && key
                    .labels()
                    .any(|l| l.key() == "outcome" && l.value() == outcome)
                && key
                    .labels()
                    .any(|l| l.key() == "reason" && l.value() == reason);
            match (matches, value) {
                (true, DebugValue::Counter(count)) => Some(*count),
                _ => None,
            }
        })
    };

    assert_eq!(counter_value("success", "none"), Some(2));
    assert_eq!(
        counter_value("wrong_credentials", "invalid_signature"),
        Some(1)
    );
    assert!(metrics
        .iter()
        .any(|(key, _, _, _)| key.key().name() == "oidc_auth_duration_seconds"));
    Ok(())
}
