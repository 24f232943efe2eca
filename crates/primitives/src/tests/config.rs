use serde_json::json;

use super::*;

#[test]
fn test_empty_payload_hashes_the_two_byte_object() {
    let payload = ConfigPayload::empty();

    assert_eq!(payload.raw, "{}");
    assert_eq!(
        payload.hash,
        "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
    );
}

#[test]
fn test_hash_depends_on_exact_bytes() {
    let compact = ConfigPayload::hashed(r#"{"a":1}"#.to_owned());
    let spaced = ConfigPayload::hashed(r#"{"a": 1}"#.to_owned());

    assert_ne!(compact.hash, spaced.hash);
    assert_eq!(compact.hash, hash_document(br#"{"a":1}"#));
}

#[test]
fn test_health_info_wire_names() -> eyre::Result<()> {
    let health: HealthInfo = serde_json::from_value(json!({
        "ok": true,
        "ts": 1_700_000_000_000_i64,
        "durationMs": 12,
        "defaultAgentId": "main",
        "heartbeatSeconds": 30,
    }))?;

    assert_eq!(
        health,
        HealthInfo {
            ok: true,
            timestamp: 1_700_000_000_000,
            duration_ms: 12,
            default_agent_id: "main".to_owned(),
            heartbeat_seconds: 30,
        }
    );

    Ok(())
}

#[test]
fn test_health_info_tolerates_missing_fields() -> eyre::Result<()> {
    let health: HealthInfo = serde_json::from_value(json!({ "ok": true }))?;

    assert!(health.ok);
    assert_eq!(health.timestamp, 0);
    assert!(health.default_agent_id.is_empty());

    Ok(())
}
