//! Full workflow integration test: operator → account → user → credentials
//! → delete → revocation, through the engine API.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use nats_identity::claims::{AccountClaims, OperatorClaims, UserClaims};
use nats_identity::time::now_unix;
use nats_identity::token::{decode, parse_user_creds};
use nats_identity::{
    AccountIssue, DirectoryStorage, IdentityPath, IssuerError, MemoryStorage, NatsIssuer,
    OperatorIssue, RecordingResolver, UserIssue, DEFAULT_PUSH_USER,
};

fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn build_hierarchy(issuer: &NatsIssuer) {
    issuer
        .issue_operator(OperatorIssue::from_request("op1", &json!({})).unwrap())
        .expect("operator");
    issuer
        .issue_account(AccountIssue::from_request("op1", "acc1", &json!({})).unwrap())
        .expect("account");
    issuer
        .issue_user(
            UserIssue::from_request(
                "op1",
                "acc1",
                "u1",
                &json!({
                    "claimsTemplate": {
                        "nats": {
                            "pub": {"allow": ["orders.{{region}}.>"]},
                            "sub": {"allow": ["_INBOX.>"]}
                        }
                    },
                    "expirationS": 3600
                }),
            )
            .unwrap(),
        )
        .expect("user");
}

#[test]
fn full_workflow_issue_and_generate_credentials() {
    let issuer = NatsIssuer::new(Arc::new(MemoryStorage::new()));
    build_hierarchy(&issuer);

    // Missing parameter is named exactly.
    let err = issuer
        .generate_user_creds("op1", "acc1", "u1", &BTreeMap::new())
        .unwrap_err();
    match err {
        IssuerError::MissingParameters(names) => assert_eq!(names, vec!["region"]),
        other => panic!("expected MissingParameters, got {other}"),
    }

    let before = now_unix();
    let creds = issuer
        .generate_user_creds("op1", "acc1", "u1", &params(&[("region", "eu")]))
        .expect("creds with region");
    assert!(creds.creds.contains("-----BEGIN NATS USER JWT-----"));
    assert!(creds.creds.contains("-----BEGIN USER NKEY SEED-----"));
    let expires_at = creds.expires_at.expect("expiration set");
    assert!(expires_at >= before + 3600 && expires_at <= now_unix() + 3600);

    // The user token chains to the account, the account to the operator.
    let (jwt, seed) = parse_user_creds(&creds.creds).unwrap();
    assert!(seed.starts_with("SU"));
    let user: UserClaims = decode(&jwt).unwrap();
    assert_eq!(user.nats.publish.allow, vec!["orders.eu.>"]);
    assert_eq!(user.data.exp, expires_at);

    let acc_path = IdentityPath::account("op1", "acc1").unwrap();
    let op_path = IdentityPath::operator("op1").unwrap();
    let account: AccountClaims = decode(&issuer.read_jwt(&acc_path).unwrap().unwrap()).unwrap();
    let operator: OperatorClaims = decode(&issuer.read_jwt(&op_path).unwrap().unwrap()).unwrap();
    assert_eq!(user.data.iss, account.data.sub);
    assert_eq!(account.data.iss, operator.data.sub);
    assert_eq!(operator.data.iss, operator.data.sub);
}

#[test]
fn full_workflow_delete_user_revokes_key() {
    let issuer = NatsIssuer::new(Arc::new(MemoryStorage::new()));
    build_hierarchy(&issuer);

    let user_path = IdentityPath::user("op1", "acc1", "u1").unwrap();
    let public_key = issuer.keys().public_key(&user_path).unwrap().unwrap();

    issuer.delete_user("op1", "acc1", "u1").unwrap();

    let err = issuer
        .generate_user_creds("op1", "acc1", "u1", &params(&[("region", "eu")]))
        .unwrap_err();
    assert!(matches!(err, IssuerError::UserTemplateNotFound { .. }));

    let account = issuer.read_account("op1", "acc1").unwrap().unwrap();
    assert!(account
        .claims_template
        .nats
        .revocations
        .contains_key(&public_key));

    let acc_path = IdentityPath::account("op1", "acc1").unwrap();
    let claims: AccountClaims = decode(&issuer.read_jwt(&acc_path).unwrap().unwrap()).unwrap();
    assert!(claims.nats.revocations.contains_key(&public_key));

    // Idempotent.
    issuer.delete_user("op1", "acc1", "u1").unwrap();
    issuer.delete_account("op1", "gone").unwrap();
    issuer.delete_operator("nobody").unwrap();
}

#[test]
fn full_workflow_directory_store_survives_reopen() {
    let tmp = tempfile::tempdir().unwrap();

    let public_key = {
        let issuer = NatsIssuer::new(Arc::new(DirectoryStorage::new(tmp.path()).unwrap()));
        build_hierarchy(&issuer);
        issuer
            .keys()
            .public_key(&IdentityPath::user("op1", "acc1", "u1").unwrap())
            .unwrap()
            .unwrap()
    };

    let issuer = NatsIssuer::new(Arc::new(DirectoryStorage::new(tmp.path()).unwrap()));
    let creds = issuer
        .generate_user_creds("op1", "acc1", "u1", &params(&[("region", "us")]))
        .unwrap();
    let (jwt, _) = parse_user_creds(&creds.creds).unwrap();
    let claims: UserClaims = decode(&jwt).unwrap();
    assert_eq!(claims.data.sub, public_key);
    assert_eq!(issuer.list_operators().unwrap(), vec!["op1"]);
}

#[test]
fn full_workflow_system_account_and_resolver_push() {
    let resolver = Arc::new(RecordingResolver::new());
    let issuer = NatsIssuer::with_resolver(Arc::new(MemoryStorage::new()), resolver.clone());

    issuer
        .issue_operator(
            OperatorIssue::from_request(
                "op1",
                &json!({"createSystemAccount": true, "syncAccountServer": true}),
            )
            .unwrap(),
        )
        .unwrap();

    assert_eq!(issuer.list_accounts("op1").unwrap(), vec!["sys"]);
    assert_eq!(issuer.list_users("op1", "sys").unwrap(), vec![DEFAULT_PUSH_USER]);

    let op_path = IdentityPath::operator("op1").unwrap();
    let sys_path = IdentityPath::account("op1", "sys").unwrap();
    let operator: OperatorClaims = decode(&issuer.read_jwt(&op_path).unwrap().unwrap()).unwrap();
    assert_eq!(
        operator.nats.system_account,
        issuer.keys().public_key(&sys_path).unwrap().unwrap()
    );

    issuer
        .issue_account(AccountIssue::from_request("op1", "acc1", &json!({})).unwrap())
        .unwrap();
    let update = resolver.last().expect("resolver notified");
    assert_eq!(update.operator, "op1");
    assert!(update.account_jwts.contains_key("acc1"));
    assert!(update.account_jwts.contains_key("sys"));
    assert!(update.push_creds.contains("BEGIN USER NKEY SEED"));
}
