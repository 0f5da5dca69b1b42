//! Stress test: many threads generating credentials from one engine at
//! once, all tokens valid and sharing the same static claims.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde_json::json;

use nats_identity::token::{decode, parse_user_creds};
use nats_identity::{
    AccountIssue, DirectoryStorage, MemoryStorage, NatsIssuer, OperatorIssue, Storage,
    UserClaims, UserIssue,
};

const THREADS: usize = 8;
const PER_THREAD: usize = 25;

fn setup(storage: Arc<dyn Storage>) -> NatsIssuer {
    let issuer = NatsIssuer::new(storage);
    issuer
        .issue_operator(OperatorIssue::from_request("op", &json!({})).unwrap())
        .unwrap();
    issuer
        .issue_account(AccountIssue::from_request("op", "acc", &json!({})).unwrap())
        .unwrap();
    issuer
        .issue_user(
            UserIssue::from_request(
                "op",
                "acc",
                "worker",
                &json!({
                    "claimsTemplate": {"nats": {"sub": {"allow": ["jobs.{{queue}}"]}}},
                    "expirationS": 300
                }),
            )
            .unwrap(),
        )
        .unwrap();
    issuer
}

fn generate_in_parallel(issuer: &NatsIssuer) -> Vec<UserClaims> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                scope.spawn(move || {
                    let params: BTreeMap<String, String> =
                        [("queue".to_string(), format!("q{}", t % 2))].into();
                    (0..PER_THREAD)
                        .map(|_| {
                            let creds = issuer
                                .generate_user_creds("op", "acc", "worker", &params)
                                .expect("generate");
                            let (jwt, _) = parse_user_creds(&creds.creds).expect("parse");
                            decode::<UserClaims>(&jwt).expect("decode")
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread panicked"))
            .collect()
    })
}

#[test]
fn stress_concurrent_creds_memory_store() {
    let issuer = setup(Arc::new(MemoryStorage::new()));
    let claims = generate_in_parallel(&issuer);
    assert_eq!(claims.len(), THREADS * PER_THREAD);

    let subjects: HashSet<&str> = claims.iter().map(|c| c.data.sub.as_str()).collect();
    let issuers: HashSet<&str> = claims.iter().map(|c| c.data.iss.as_str()).collect();
    assert_eq!(subjects.len(), 1, "every token names the same user key");
    assert_eq!(issuers.len(), 1, "every token is signed by the account");

    let subjects_allowed: HashSet<Vec<String>> =
        claims.iter().map(|c| c.nats.subscribe.allow.clone()).collect();
    assert_eq!(subjects_allowed.len(), 2);
}

#[test]
fn stress_concurrent_creds_directory_store() {
    let tmp = tempfile::tempdir().unwrap();
    let issuer = setup(Arc::new(DirectoryStorage::new(tmp.path()).unwrap()));
    let claims = generate_in_parallel(&issuer);
    assert_eq!(claims.len(), THREADS * PER_THREAD);
    assert!(claims.iter().all(|c| c.data.exp == c.data.iat + 300));
}

#[test]
fn stress_concurrent_user_issue_and_creds() {
    let issuer = setup(Arc::new(MemoryStorage::new()));
    std::thread::scope(|scope| {
        for t in 0..THREADS {
            let issuer = &issuer;
            scope.spawn(move || {
                let name = format!("u{t}");
                issuer
                    .issue_user(UserIssue::from_request("op", "acc", &name, &json!({})).unwrap())
                    .expect("issue user");
                issuer
                    .generate_user_creds("op", "acc", &name, &BTreeMap::new())
                    .expect("generate");
            });
        }
    });
    assert_eq!(issuer.list_users("op", "acc").unwrap().len(), THREADS + 1);
}
