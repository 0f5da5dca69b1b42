//! Dispatch-layer integration tests: every supported path shape, and the
//! ones that must be refused.

use std::sync::Arc;

use serde_json::{json, Value};

use nats_identity::{
    Backend, ErrorKind, IssuerError, MemoryStorage, NatsIssuer, Operation, Request, Response,
};

fn backend() -> Backend<NatsIssuer> {
    Backend::new(NatsIssuer::new(Arc::new(MemoryStorage::new())))
}

fn call(backend: &Backend<NatsIssuer>, op: Operation, path: &str, data: Value) -> Response {
    backend
        .handle(Request::new(op, path).with_data(data))
        .unwrap_or_else(|e| panic!("{op} {path} failed: {e}"))
}

fn keys(response: Response) -> Vec<String> {
    match response {
        Response::List(keys) => keys,
        other => panic!("expected a list, got {other:?}"),
    }
}

fn populated() -> Backend<NatsIssuer> {
    let b = backend();
    call(&b, Operation::Create, "issue/operator/op1", json!({"signingKeys": ["osk"]}));
    call(&b, Operation::Create, "issue/operator/op2", Value::Null);
    call(
        &b,
        Operation::Create,
        "issue/operator/op1/account/acc1",
        json!({"useSigningKey": "osk", "signingKeys": ["ask"]}),
    );
    call(&b, Operation::Create, "issue/operator/op1/account/acc2", Value::Null);
    call(
        &b,
        Operation::Create,
        "issue/operator/op1/account/acc1/user/u1",
        json!({"useSigningKey": "ask", "expirationS": 30}),
    );
    b
}

#[test]
fn backend_lists_every_level() {
    let b = populated();
    assert_eq!(
        keys(call(&b, Operation::List, "issue/operator/", Value::Null)),
        vec!["op1", "op2"]
    );
    assert_eq!(
        keys(call(&b, Operation::List, "issue/operator/op1/account", Value::Null)),
        vec!["acc1", "acc2"]
    );
    assert_eq!(
        keys(call(&b, Operation::List, "issue/operator/op1/account/acc1/user/", Value::Null)),
        vec!["u1"]
    );
    assert_eq!(
        keys(call(&b, Operation::List, "nkey/operator/op1/account/acc1/user/", Value::Null)),
        vec!["u1"]
    );
    assert_eq!(
        keys(call(&b, Operation::List, "jwt/operator/op1/account/", Value::Null)),
        vec!["acc1", "acc2"]
    );
    assert_eq!(
        keys(call(&b, Operation::List, "creds/operator/op1/account/acc1/user/", Value::Null)),
        vec!["u1"]
    );
}

#[test]
fn backend_issue_response_shapes() {
    let b = populated();
    let op = call(&b, Operation::Read, "issue/operator/op1", Value::Null).into_value();
    assert_eq!(op["operator"], "op1");
    assert_eq!(op["status"]["signingKeys"]["osk"], true);

    let acc = call(&b, Operation::Read, "issue/operator/op1/account/acc1", Value::Null).into_value();
    assert_eq!(acc["useSigningKey"], "osk");
    assert_eq!(acc["status"]["account"]["jwt"], true);

    let user = call(
        &b,
        Operation::Read,
        "issue/operator/op1/account/acc1/user/u1",
        Value::Null,
    )
    .into_value();
    assert_eq!(user["status"]["user"]["nkey"], true);
    assert!(user["status"]["user"].get("jwt").is_none());
}

#[test]
fn backend_creds_signed_with_signing_key() {
    let b = populated();
    let creds = call(
        &b,
        Operation::Read,
        "creds/operator/op1/account/acc1/user/u1",
        Value::Null,
    )
    .into_value();
    assert_eq!(creds["operator"], "op1");
    assert!(creds["expiresAt"].as_i64().unwrap() > 0);
    assert!(creds.get("parameters").is_none());
}

#[test]
fn backend_user_jwt_is_unsupported() {
    let b = populated();
    for (op, path) in [
        (Operation::Read, "jwt/operator/op1/account/acc1/user/u1"),
        (Operation::List, "jwt/operator/op1/account/acc1/user/"),
    ] {
        let err = b.handle(Request::new(op, path)).unwrap_err();
        assert!(matches!(err, IssuerError::UnsupportedPath(_)), "{op} {path}");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

#[test]
fn backend_reports_missing_entries() {
    let b = populated();
    for path in [
        "issue/operator/op9",
        "nkey/operator/op1/account/acc9",
        "jwt/operator/op1/account/acc9",
    ] {
        let err = b.handle(Request::new(Operation::Read, path)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound, "{path}");
    }

    let err = b
        .handle(Request::new(
            Operation::Read,
            "creds/operator/op1/account/acc1/user/u9",
        ))
        .unwrap_err();
    assert!(matches!(err, IssuerError::UserTemplateNotFound { .. }));

    let err = b
        .handle(Request::new(Operation::Create, "issue/operator/op9/account/acc").with_data(json!({})))
        .unwrap_err();
    assert!(matches!(err, IssuerError::ParentNotFound(_)));
}

#[test]
fn backend_delete_is_idempotent() {
    let b = populated();
    for _ in 0..2 {
        let response = call(&b, Operation::Delete, "issue/operator/op1", Value::Null);
        assert_eq!(response, Response::Empty);
    }
    assert_eq!(
        keys(call(&b, Operation::List, "issue/operator/", Value::Null)),
        vec!["op2"]
    );
    assert!(keys(call(&b, Operation::List, "nkey/operator/op1/account/", Value::Null)).is_empty());
    assert!(keys(call(&b, Operation::List, "jwt/operator/op1/account/", Value::Null)).is_empty());
}
