//! Stress test: building the same hierarchy in every parent-first order
//! ends in the same listings and the same key/claims relationships.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use nats_identity::claims::{AccountClaims, OperatorClaims};
use nats_identity::token::{decode, parse_user_creds};
use nats_identity::{
    AccountIssue, IdentityPath, MemoryStorage, NatsIssuer, OperatorIssue, UserClaims, UserIssue,
    DEFAULT_PUSH_USER, DEFAULT_SYS_ACCOUNT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Operator,
    SystemAccount,
    PushUser,
    Account,
    User,
}

impl Step {
    const ALL: [Step; 5] = [
        Step::Operator,
        Step::SystemAccount,
        Step::PushUser,
        Step::Account,
        Step::User,
    ];

    fn parent(self) -> Option<Step> {
        match self {
            Step::Operator => None,
            Step::SystemAccount | Step::Account => Some(Step::Operator),
            Step::PushUser => Some(Step::SystemAccount),
            Step::User => Some(Step::Account),
        }
    }

    fn run(self, issuer: &NatsIssuer) {
        let result = match self {
            Step::Operator => issuer
                .issue_operator(
                    OperatorIssue::from_request(
                        "op",
                        &json!({"signingKeys": ["osk"], "syncAccountServer": true}),
                    )
                    .unwrap(),
                )
                .map(drop),
            Step::SystemAccount => issuer
                .issue_account(
                    AccountIssue::from_request("op", DEFAULT_SYS_ACCOUNT, &json!({})).unwrap(),
                )
                .map(drop),
            Step::PushUser => issuer
                .issue_user(
                    UserIssue::from_request("op", DEFAULT_SYS_ACCOUNT, DEFAULT_PUSH_USER, &json!({}))
                        .unwrap(),
                )
                .map(drop),
            Step::Account => issuer
                .issue_account(
                    AccountIssue::from_request(
                        "op",
                        "acc",
                        &json!({"useSigningKey": "osk", "signingKeys": ["ask"]}),
                    )
                    .unwrap(),
                )
                .map(drop),
            Step::User => issuer
                .issue_user(
                    UserIssue::from_request(
                        "op",
                        "acc",
                        "u",
                        &json!({"useSigningKey": "ask", "expirationS": 60}),
                    )
                    .unwrap(),
                )
                .map(drop),
        };
        result.unwrap_or_else(|e| panic!("{self:?} failed: {e}"));
    }
}

fn permutations(items: &[Step]) -> Vec<Vec<Step>> {
    if items.is_empty() {
        return vec![Vec::new()];
    }
    let mut out = Vec::new();
    for (i, &head) in items.iter().enumerate() {
        let mut rest = items.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head);
            out.push(tail);
        }
    }
    out
}

fn parent_first(order: &[Step]) -> bool {
    order.iter().enumerate().all(|(i, step)| match step.parent() {
        None => true,
        Some(parent) => order[..i].contains(&parent),
    })
}

/// Everything about the final state that does not depend on random keys.
#[derive(Debug, PartialEq, Eq)]
struct Snapshot {
    operators: Vec<String>,
    accounts: Vec<String>,
    sys_users: Vec<String>,
    acc_users: Vec<String>,
    account_jwts: Vec<String>,
    operator_names_system_account: bool,
    operator_signing_keys: usize,
    account_signed_by_operator_signing_key: bool,
    sys_signed_by_operator: bool,
    user_signed_by_account_signing_key: bool,
}

fn snapshot(issuer: &NatsIssuer) -> Snapshot {
    let keys = issuer.keys();
    let op = IdentityPath::operator("op").unwrap();
    let sys = IdentityPath::account("op", DEFAULT_SYS_ACCOUNT).unwrap();
    let acc = IdentityPath::account("op", "acc").unwrap();

    let operator: OperatorClaims = decode(&issuer.read_jwt(&op).unwrap().unwrap()).unwrap();
    let sys_claims: AccountClaims = decode(&issuer.read_jwt(&sys).unwrap().unwrap()).unwrap();
    let acc_claims: AccountClaims = decode(&issuer.read_jwt(&acc).unwrap().unwrap()).unwrap();

    let osk = keys.get_signing(&op, "osk").unwrap().unwrap().public_key();
    let ask = keys.get_signing(&acc, "ask").unwrap().unwrap().public_key();

    let creds = issuer
        .generate_user_creds("op", "acc", "u", &BTreeMap::new())
        .unwrap();
    let (jwt, _) = parse_user_creds(&creds.creds).unwrap();
    let user: UserClaims = decode(&jwt).unwrap();

    Snapshot {
        operators: issuer.list_operators().unwrap(),
        accounts: issuer.list_accounts("op").unwrap(),
        sys_users: issuer.list_users("op", DEFAULT_SYS_ACCOUNT).unwrap(),
        acc_users: issuer.list_users("op", "acc").unwrap(),
        account_jwts: issuer.list_jwts(Some(&op)).unwrap(),
        operator_names_system_account: operator.nats.system_account
            == keys.public_key(&sys).unwrap().unwrap(),
        operator_signing_keys: operator.nats.signing_keys.len(),
        account_signed_by_operator_signing_key: acc_claims.data.iss == osk,
        sys_signed_by_operator: sys_claims.data.iss == operator.data.sub,
        user_signed_by_account_signing_key: user.data.iss == ask
            && user.nats.issuer_account == acc_claims.data.sub,
    }
}

#[test]
fn stress_every_parent_first_order_converges() {
    let orders: Vec<Vec<Step>> = permutations(&Step::ALL)
        .into_iter()
        .filter(|order| parent_first(order))
        .collect();
    assert!(orders.len() > 1);

    let mut expected: Option<Snapshot> = None;
    for order in &orders {
        let issuer = NatsIssuer::new(Arc::new(MemoryStorage::new()));
        for step in order {
            step.run(&issuer);
        }
        let snap = snapshot(&issuer);
        match &expected {
            None => {
                assert!(snap.operator_names_system_account, "{order:?}");
                assert!(snap.account_signed_by_operator_signing_key, "{order:?}");
                assert!(snap.sys_signed_by_operator, "{order:?}");
                assert!(snap.user_signed_by_account_signing_key, "{order:?}");
                expected = Some(snap);
            }
            Some(first) => assert_eq!(&snap, first, "order {order:?} diverged"),
        }
    }
}

#[test]
fn stress_reissuing_everything_twice_is_stable() {
    let issuer = NatsIssuer::new(Arc::new(MemoryStorage::new()));
    for step in Step::ALL {
        step.run(&issuer);
    }
    let keys_before: Vec<Option<String>> = [
        IdentityPath::operator("op").unwrap(),
        IdentityPath::account("op", "acc").unwrap(),
        IdentityPath::user("op", "acc", "u").unwrap(),
    ]
    .iter()
    .map(|p| issuer.keys().public_key(p).unwrap())
    .collect();

    for step in Step::ALL {
        step.run(&issuer);
    }
    let keys_after: Vec<Option<String>> = [
        IdentityPath::operator("op").unwrap(),
        IdentityPath::account("op", "acc").unwrap(),
        IdentityPath::user("op", "acc", "u").unwrap(),
    ]
    .iter()
    .map(|p| issuer.keys().public_key(p).unwrap())
    .collect();

    assert_eq!(keys_before, keys_after);
    assert_eq!(snapshot(&issuer).accounts, vec!["acc", "sys"]);
}
