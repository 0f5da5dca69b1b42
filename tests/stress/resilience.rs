//! Resilience tests: corrupted records, wrong passphrases, tampered tokens,
//! partially deleted trees.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use nats_identity::claims::AccountClaims;
use nats_identity::token::{decode, parse_user_creds};
use nats_identity::{
    AccountIssue, DirectoryStorage, ErrorKind, IdentityPath, IssuerError, MemoryStorage,
    NatsIssuer, OperatorIssue, SealedStorage, Storage, UserIssue,
};

fn hierarchy(issuer: &NatsIssuer) {
    issuer
        .issue_operator(OperatorIssue::from_request("op", &json!({})).unwrap())
        .unwrap();
    issuer
        .issue_account(AccountIssue::from_request("op", "acc", &json!({})).unwrap())
        .unwrap();
    issuer
        .issue_user(UserIssue::from_request("op", "acc", "u", &json!({})).unwrap())
        .unwrap();
}

#[test]
fn resilience_corrupted_seed_detected() {
    let tmp = tempfile::tempdir().unwrap();
    let issuer = NatsIssuer::new(Arc::new(DirectoryStorage::new(tmp.path()).unwrap()));
    hierarchy(&issuer);

    // Flip a character in the middle of the stored user seed.
    let file = tmp
        .path()
        .join("nkey/operator/op/account/acc/user/u.json");
    let text = std::fs::read_to_string(&file).unwrap();
    let start = text.find("\"SU").unwrap() + 10;
    let mut bytes = text.into_bytes();
    bytes[start] = if bytes[start] == b'A' { b'B' } else { b'A' };
    std::fs::write(&file, bytes).unwrap();

    let err = issuer
        .generate_user_creds("op", "acc", "u", &BTreeMap::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyMaterial);

    // Re-issuing must not silently replace a corrupt key.
    let err = issuer
        .issue_user(UserIssue::from_request("op", "acc", "u", &json!({})).unwrap())
        .unwrap_err();
    assert!(matches!(err, IssuerError::InvalidKey(_)));
}

#[test]
fn resilience_truncated_record_detected() {
    let tmp = tempfile::tempdir().unwrap();
    let issuer = NatsIssuer::new(Arc::new(DirectoryStorage::new(tmp.path()).unwrap()));
    hierarchy(&issuer);

    let file = tmp.path().join("issue/operator/op/account/acc.json");
    let data = std::fs::read(&file).unwrap();
    std::fs::write(&file, &data[..data.len() / 2]).unwrap();

    let err = issuer.read_account("op", "acc").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
}

#[test]
fn resilience_wrong_passphrase_fails() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let sealed =
            SealedStorage::open(DirectoryStorage::new(tmp.path()).unwrap(), "correct").unwrap();
        let issuer = NatsIssuer::new(Arc::new(sealed));
        hierarchy(&issuer);
    }

    let result = SealedStorage::open(DirectoryStorage::new(tmp.path()).unwrap(), "wrong");
    assert!(matches!(result, Err(IssuerError::InvalidPassphrase)));

    let sealed =
        SealedStorage::open(DirectoryStorage::new(tmp.path()).unwrap(), "correct").unwrap();
    let issuer = NatsIssuer::new(Arc::new(sealed));
    issuer
        .generate_user_creds("op", "acc", "u", &BTreeMap::new())
        .unwrap();
}

#[test]
fn resilience_sealed_values_are_not_plaintext() {
    let tmp = tempfile::tempdir().unwrap();
    let sealed =
        SealedStorage::open(DirectoryStorage::new(tmp.path()).unwrap(), "pass").unwrap();
    let issuer = NatsIssuer::new(Arc::new(sealed));
    hierarchy(&issuer);

    let raw = DirectoryStorage::new(tmp.path()).unwrap();
    let bytes = raw
        .get("nkey/operator/op/account/acc/user/u")
        .unwrap()
        .unwrap();
    let seed = issuer
        .keys()
        .get(&IdentityPath::user("op", "acc", "u").unwrap())
        .unwrap()
        .unwrap()
        .seed()
        .unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(!text.contains("\"seed\""));
    assert!(!text.contains(&seed));
}

#[test]
fn resilience_tampered_token_rejected() {
    let issuer = NatsIssuer::new(Arc::new(MemoryStorage::new()));
    hierarchy(&issuer);
    let jwt = issuer
        .read_jwt(&IdentityPath::account("op", "acc").unwrap())
        .unwrap()
        .unwrap();

    let parts: Vec<&str> = jwt.split('.').collect();
    let mut claims: serde_json::Value = {
        use base64::Engine;
        let raw = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(parts[1])
            .unwrap();
        serde_json::from_slice(&raw).unwrap()
    };
    claims["name"] = json!("evil");
    let forged_payload = {
        use base64::Engine;
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(claims.to_string())
    };
    let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

    assert!(decode::<AccountClaims>(&jwt).is_ok());
    let err = decode::<AccountClaims>(&forged).unwrap_err();
    assert!(matches!(err, IssuerError::SignatureInvalid));
    assert!(decode::<AccountClaims>("only.two").is_err());
}

#[test]
fn resilience_truncated_creds_rejected() {
    let issuer = NatsIssuer::new(Arc::new(MemoryStorage::new()));
    hierarchy(&issuer);
    let creds = issuer
        .generate_user_creds("op", "acc", "u", &BTreeMap::new())
        .unwrap();
    let half = &creds.creds[..creds.creds.len() / 2];
    assert!(parse_user_creds(half).is_err());
}

#[test]
fn resilience_stray_keys_swept_by_delete() {
    let storage = Arc::new(MemoryStorage::new());
    let issuer = NatsIssuer::new(storage.clone());
    hierarchy(&issuer);

    // Simulate an interrupted delete: record gone, nkey left behind.
    storage
        .delete(&IdentityPath::user("op", "acc", "u").unwrap().issue_key())
        .unwrap();
    assert!(issuer.list_users("op", "acc").unwrap().is_empty());
    assert_eq!(
        issuer
            .list_nkeys(Some(&IdentityPath::account("op", "acc").unwrap()))
            .unwrap(),
        vec!["u"]
    );

    issuer.delete_operator("op").unwrap();
    assert!(storage.is_empty(), "left behind: {:?}", storage.keys());
}

#[test]
fn resilience_interrupted_cascade_can_be_repeated() {
    let issuer = NatsIssuer::new(Arc::new(MemoryStorage::new()));
    hierarchy(&issuer);
    let user = IdentityPath::user("op", "acc", "u").unwrap();
    let public_key = issuer.keys().public_key(&user).unwrap().unwrap();

    // Key already removed but record still present: the delete still
    // completes, there is just nothing left to revoke.
    issuer.keys().delete(&user).unwrap();
    issuer.delete_user("op", "acc", "u").unwrap();
    assert!(issuer.read_user("op", "acc", "u").unwrap().is_none());

    let account = issuer.read_account("op", "acc").unwrap().unwrap();
    assert!(!account
        .claims_template
        .nats
        .revocations
        .contains_key(&public_key));
}
