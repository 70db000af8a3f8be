use blobsas_core::time::now;
use blobsas_core::{
    AccessPolicy, ErrorKind, Permissions, PolicyStore, ResourceGateway, ResourcePath, TokenIssuer,
};
use chrono::TimeDelta;
use pretty_assertions::assert_eq;

use crate::{hours, init_gateway, policy, CONTAINER};

#[tokio::test]
async fn test_upsert_and_list() {
    let gateway = init_gateway().await;
    let store = PolicyStore::new(gateway.clone(), CONTAINER);

    assert!(store.list().await.unwrap().is_empty());

    store.upsert("polA", policy("rwl", hours(24))).await.unwrap();
    let replaced = policy("r", hours(1));
    store.upsert("polA", replaced.clone()).await.unwrap();

    let policies = store.list().await.unwrap();
    assert_eq!(policies.len(), 1);
    assert_eq!(policies["polA"], replaced);
}

#[tokio::test]
async fn test_stored_policy_round_trips_at_whole_seconds() {
    let gateway = init_gateway().await;
    let store = PolicyStore::new(gateway.clone(), CONTAINER);

    let expiry = now() + hours(1) + TimeDelta::nanoseconds(499_872_415);
    let p = AccessPolicy::new(Permissions::read() | Permissions::list(), expiry)
        .with_start(now() - TimeDelta::milliseconds(1500));
    store.upsert("polA", p.clone()).await.unwrap();
    assert_eq!(store.list().await.unwrap()["polA"], p);

    // Fields set directly are stored as whole seconds as well.
    let direct = AccessPolicy {
        permissions: Permissions::read(),
        start: None,
        expiry: Some(expiry),
    };
    store.upsert("polB", direct.clone()).await.unwrap();
    assert_eq!(store.list().await.unwrap()["polB"], direct.truncated());
}

#[tokio::test]
async fn test_upsert_rejects_invalid_policy() {
    let gateway = init_gateway().await;
    let store = PolicyStore::new(gateway.clone(), CONTAINER);

    let err = store
        .upsert("polA", policy("", hours(1)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPolicy);

    let err = store
        .upsert(&"x".repeat(65), policy("r", hours(1)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPolicy);

    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upsert_beyond_capacity() {
    let gateway = init_gateway().await;
    let store = PolicyStore::new(gateway.clone(), CONTAINER);

    for i in 0..5 {
        store
            .upsert(&format!("pol{i}"), policy("r", hours(1)))
            .await
            .unwrap();
    }
    let before = store.list().await.unwrap();

    let err = store
        .upsert("pol5", policy("r", hours(1)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
    assert_eq!(store.list().await.unwrap(), before);

    // Replacing an existing name is not growth.
    store.upsert("pol0", policy("rl", hours(2))).await.unwrap();
}

#[tokio::test]
async fn test_custom_capacity() {
    let gateway = init_gateway().await;
    let store = PolicyStore::new(gateway.clone(), CONTAINER).with_max_policies(1);

    store.upsert("polA", policy("r", hours(1))).await.unwrap();
    let err = store
        .upsert("polB", policy("r", hours(1)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
}

#[tokio::test]
async fn test_remove() {
    let gateway = init_gateway().await;
    let store = PolicyStore::new(gateway.clone(), CONTAINER);
    let issuer = TokenIssuer::new(gateway.clone());

    store.upsert("polA", policy("r", hours(1))).await.unwrap();
    store.upsert("polB", policy("l", hours(1))).await.unwrap();
    let token = issuer
        .issue_by_policy_name(&ResourcePath::container(CONTAINER), "polA")
        .unwrap();

    store.remove("polA").await.unwrap();
    // Removing twice is fine.
    store.remove("polA").await.unwrap();

    assert_eq!(
        store.list().await.unwrap().keys().collect::<Vec<_>>(),
        vec!["polB"]
    );
    let err = gateway
        .validate(token.as_str(), now())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyNotFound);
}

#[tokio::test]
async fn test_clear_all() {
    let gateway = init_gateway().await;
    let store = PolicyStore::new(gateway.clone(), CONTAINER);
    let issuer = TokenIssuer::new(gateway.clone());

    let mut tokens = vec![];
    for name in ["polA", "polB", "polC"] {
        store.upsert(name, policy("rl", hours(1))).await.unwrap();
        tokens.push(
            issuer
                .issue_by_policy_name(&ResourcePath::object(CONTAINER, "a.txt"), name)
                .unwrap(),
        );
    }

    store.clear_all().await.unwrap();
    assert!(store.list().await.unwrap().is_empty());

    for token in tokens {
        let err = gateway
            .validate(token.as_str(), now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyNotFound);
    }
}

#[tokio::test]
async fn test_concurrent_upsert_last_writer_wins() {
    let gateway = init_gateway().await;
    let store = PolicyStore::new(gateway.clone(), CONTAINER);

    let mut first = store.load().await.unwrap();
    let mut second = store.load().await.unwrap();

    first.upsert("polA", policy("r", hours(1))).unwrap();
    second.upsert("polB", policy("l", hours(1))).unwrap();

    store.commit(&first).await.unwrap();
    store.commit(&second).await.unwrap();

    assert_eq!(
        store.list().await.unwrap().keys().collect::<Vec<_>>(),
        vec!["polB"]
    );
}

#[tokio::test]
async fn test_concurrent_upsert_with_precondition() {
    let gateway = init_gateway().await;
    let store = PolicyStore::new(gateway.clone(), CONTAINER).with_precondition(true);

    let mut first = store.load().await.unwrap();
    let mut second = store.load().await.unwrap();
    assert_eq!(first.etag(), second.etag());

    first.upsert("polA", policy("r", hours(1))).unwrap();
    second.upsert("polB", policy("l", hours(1))).unwrap();

    let etag = store.commit(&first).await.unwrap();
    assert_ne!(&etag, second.etag());

    let err = store.commit(&second).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    assert_eq!(
        store.list().await.unwrap().keys().collect::<Vec<_>>(),
        vec!["polA"]
    );

    // A fresh read-modify-write goes through.
    store.upsert("polB", policy("l", hours(1))).await.unwrap();
    assert_eq!(store.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_parallel_upserts_with_precondition() {
    let gateway = init_gateway().await;
    let store = PolicyStore::new(gateway.clone(), CONTAINER).with_precondition(true);

    let handles = (0..4)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .upsert(&format!("pol{i}"), policy("r", hours(1)))
                    .await
            })
        })
        .collect::<Vec<_>>();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => succeeded += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::PreconditionFailed),
        }
    }

    // Every success is visible, nothing is lost silently.
    assert!(succeeded >= 1);
    assert_eq!(store.list().await.unwrap().len(), succeeded);
}
