use super::*;

#[test]
fn identity_new_has_only_uid() {
    let identity = Identity::new("u1");
    assert_eq!(identity.uid, "u1");
    assert!(identity.email.is_none());
    assert!(identity.display_name.is_none());
    assert!(!identity.email_verified);
}

#[test]
fn identity_deserializes_provider_user_shape() {
    let raw = r#"{
        "uid": "MnzBjTBslZNijOkq",
        "email": "rider@example.com",
        "displayName": "Rider",
        "emailVerified": true,
        "providerId": "firebase"
    }"#;
    let identity: Identity = serde_json::from_str(raw).unwrap();
    assert_eq!(identity.uid, "MnzBjTBslZNijOkq");
    assert_eq!(identity.email.as_deref(), Some("rider@example.com"));
    assert_eq!(identity.display_name.as_deref(), Some("Rider"));
    assert!(identity.email_verified);
}

#[test]
fn identity_missing_optional_fields_default() {
    let identity: Identity = serde_json::from_str(r#"{"uid":"u2"}"#).unwrap();
    assert_eq!(identity, Identity::new("u2"));
}

#[test]
fn identity_label_prefers_display_name() {
    let identity = Identity::new("u1").with_email("a@b.c").with_display_name("Alice");
    assert_eq!(identity.label(), "Alice");
}

#[test]
fn identity_label_falls_back_to_email_then_uid() {
    assert_eq!(Identity::new("u1").with_email("a@b.c").label(), "a@b.c");
    assert_eq!(Identity::new("u1").label(), "u1");
}
