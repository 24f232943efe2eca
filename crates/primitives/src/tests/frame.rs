use serde_json::json;

use super::*;

#[test]
fn test_request_wire_shape() -> eyre::Result<()> {
    let frame = Frame::Request(Request::new(
        "clawcfg-1".to_owned(),
        "config.get".to_owned(),
        json!({}),
    ));

    assert_eq!(
        serde_json::to_value(&frame)?,
        json!({
            "type": "req",
            "id": "clawcfg-1",
            "method": "config.get",
            "params": {},
        })
    );

    Ok(())
}

#[test]
fn test_error_response_decodes() -> eyre::Result<()> {
    let frame: Frame = serde_json::from_str(
        r#"{"type":"res","id":"clawcfg-7","ok":false,"error":{"code":"CONFLICT","message":"base hash mismatch"}}"#,
    )?;

    let Frame::Response(response) = frame else {
        eyre::bail!("expected a response frame");
    };

    assert_eq!(response.id, "clawcfg-7");
    assert!(!response.ok);
    assert_eq!(response.error_message(), "base hash mismatch");

    Ok(())
}

#[test]
fn test_response_without_ok_is_not_affirmative() -> eyre::Result<()> {
    let frame: Frame = serde_json::from_str(r#"{"type":"res","id":"x","payload":{}}"#)?;

    assert!(matches!(frame, Frame::Response(Response { ok: false, .. })));

    Ok(())
}

#[test]
fn test_challenge_event_nonce() -> eyre::Result<()> {
    let frame: Frame = serde_json::from_str(
        r#"{"type":"event","event":"connect.challenge","payload":{"nonce":"abc123","ts":1}}"#,
    )?;

    let Frame::Event(event) = frame else {
        eyre::bail!("expected an event frame");
    };

    assert!(event.is_challenge());
    assert_eq!(event.nonce(), Some("abc123"));

    let empty = Event::new(CHALLENGE_EVENT.to_owned(), Some(json!({ "nonce": "" })));
    assert_eq!(empty.nonce(), None);

    Ok(())
}

#[test]
fn test_unknown_frame_type_is_rejected() {
    let result = serde_json::from_str::<Frame>(r#"{"type":"ping"}"#);

    assert!(result.is_err(), "unknown frame types must not decode");
}

#[test]
fn test_error_message_fallbacks() {
    let plain = Response::failure("1".to_owned(), json!("nope"));
    assert_eq!(plain.error_message(), "nope");

    let structured = Response::failure("2".to_owned(), json!({ "code": 42 }));
    assert_eq!(structured.error_message(), r#"{"code":42}"#);

    let missing = Response {
        id: "3".to_owned(),
        ok: false,
        payload: None,
        error: None,
    };
    assert_eq!(missing.error_message(), "no error details");
}
