use mailguard::{GuardConfig, Headers, MailGuard, OutgoingMessage, TransportMessage};

fn guard() -> MailGuard {
    let config = GuardConfig {
        site_identity: Some("shop.local".into()),
        ..GuardConfig::default()
    };
    MailGuard::activate(&config).unwrap().unwrap()
}

#[test]
fn host_json_outgoing_message_is_sanitized() {
    let raw = r#"{
        "to": "customer@external.com",
        "subject": "Your order",
        "body": "Thanks",
        "headers": {"cc": "dev@netzstrategen.com", "Content-Type": "text/html"},
        "attachments": ["/tmp/invoice.pdf"]
    }"#;
    let msg: OutgoingMessage = serde_json::from_str(raw).expect("deserialize");
    assert!(matches!(msg.headers, Some(Headers::Map(_))));

    let msg = guard().pre_send(msg);
    let json = serde_json::to_value(&msg).unwrap();
    assert!(json["to"].is_null());
    assert_eq!(json["headers"], serde_json::json!({"Content-Type": "text/html"}));
    assert_eq!(json["attachments"], serde_json::json!(["/tmp/invoice.pdf"]));
}

#[test]
fn host_json_headers_are_sanitized_in_every_shape() {
    let cases = [
        (
            serde_json::json!({"to": "dev@netzstrategen.com", "headers": {"Cc": "qa@external.com"}}),
            serde_json::json!({}),
        ),
        (
            serde_json::json!({"to": "dev@netzstrategen.com", "headers": "Cc: qa@external.com\r\nX-Tag: 1\r\n"}),
            serde_json::json!("X-Tag: 1\r\n"),
        ),
        (
            serde_json::json!({"to": "dev@netzstrategen.com", "headers": ["Cc: qa@external.com"]}),
            serde_json::json!([]),
        ),
    ];
    let guard = guard();
    for (input, expected) in cases {
        let mut msg: OutgoingMessage =
            serde_json::from_value(input.clone()).expect("deserialize");
        let report = guard.inspect_pre_send(&mut msg);
        assert_eq!(report.stripped, vec!["cc"], "input: {}", input);
        assert_eq!(msg.to.as_deref(), Some("dev@netzstrategen.com"));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["headers"], expected, "input: {}", input);
    }
}

#[test]
fn host_json_transport_message_is_blanked() {
    let raw = r#"{
        "from": {"address": "shop@netzstrategen.com", "name": "Shop"},
        "to": [{"address": "dev@netzstrategen.com"}],
        "cc": [{"address": "qa@external.com", "name": "QA"}],
        "replyTo": [{"address": "support@netzstrategen.com"}],
        "attachments": [{"filename": "a.txt", "contentType": "text/plain", "content": [104, 105]}],
        "customHeaders": [["X-Order", "42"]]
    }"#;
    let mut msg: TransportMessage = serde_json::from_str(raw).expect("deserialize");
    let decision = guard().transport(&mut msg);
    assert_eq!(decision.offending.as_deref(), Some("qa@external.com"));

    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["to"], serde_json::json!([]));
    assert_eq!(json["cc"], serde_json::json!([]));
    assert_eq!(json["replyTo"], serde_json::json!([]));
    assert_eq!(json["attachments"], serde_json::json!([]));
    assert_eq!(json["customHeaders"], serde_json::json!([]));
    assert_eq!(json["from"]["address"], "shop@netzstrategen.com");
}
