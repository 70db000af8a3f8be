use blobsas_core::time::now;
use blobsas_core::{ErrorKind, PolicyStore, ResourceGateway, ResourcePath, TokenIssuer};
use bytes::Bytes;
use chrono::TimeDelta;
use pretty_assertions::assert_eq;

use crate::{hours, init_gateway, policy, CONTAINER};

#[tokio::test]
async fn test_write_and_list_with_container_token() {
    let gateway = init_gateway().await;
    let issuer = TokenIssuer::new(gateway.clone());

    let token = issuer
        .issue_inline(&ResourcePath::container(CONTAINER), &policy("wl", hours(24)))
        .unwrap();
    let query = &token.as_str()[token.as_str().find('?').unwrap()..];

    for name in ["b.txt", "a.txt"] {
        let uri = format!(
            "{}{query}",
            gateway
                .public_uri(&ResourcePath::object(CONTAINER, name))
                .unwrap()
        );
        gateway
            .write_object(&uri, Bytes::from(format!("content of {name}")))
            .await
            .unwrap();
    }

    assert_eq!(
        gateway.list_objects(token.as_str()).await.unwrap(),
        vec!["a.txt".to_string(), "b.txt".to_string()]
    );

    // `wl` does not cover reading.
    let uri = format!(
        "{}{query}",
        gateway
            .public_uri(&ResourcePath::object(CONTAINER, "a.txt"))
            .unwrap()
    );
    let err = gateway.read_object(&uri).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
}

#[tokio::test]
async fn test_read_and_write_with_blob_token() {
    let gateway = init_gateway().await;
    let issuer = TokenIssuer::new(gateway.clone());

    let resource = ResourcePath::object(CONTAINER, "blobForSAS.txt");
    let token = issuer
        .issue_inline(
            &resource,
            &policy("rw", hours(24)).with_start(now() - TimeDelta::minutes(5)),
        )
        .unwrap();

    gateway
        .write_object(token.as_str(), Bytes::from("Blob created by Azure SAS"))
        .await
        .unwrap();
    assert_eq!(
        gateway.read_object(token.as_str()).await.unwrap(),
        Bytes::from("Blob created by Azure SAS")
    );

    // The blob token cannot list its container.
    let err = gateway.list_objects(token.as_str()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
}

#[tokio::test]
async fn test_access_follows_stored_policy() {
    let gateway = init_gateway().await;
    let issuer = TokenIssuer::new(gateway.clone());
    let store = PolicyStore::new(gateway.clone(), CONTAINER);

    gateway
        .put_object(CONTAINER, "sasblobpolicy.txt", Bytes::from("hello"))
        .await
        .unwrap();
    store.upsert("myPolicy", policy("l", hours(24))).await.unwrap();

    let token = issuer
        .issue_by_policy_name(
            &ResourcePath::object(CONTAINER, "sasblobpolicy.txt"),
            "myPolicy",
        )
        .unwrap();
    let err = gateway.read_object(token.as_str()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    store.upsert("myPolicy", policy("rwl", hours(24))).await.unwrap();
    assert_eq!(
        gateway.read_object(token.as_str()).await.unwrap(),
        Bytes::from("hello")
    );

    store.remove("myPolicy").await.unwrap();
    let err = gateway.read_object(token.as_str()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyNotFound);
}

#[tokio::test]
async fn test_read_missing_blob() {
    let gateway = init_gateway().await;
    let token = TokenIssuer::new(gateway.clone())
        .issue_inline(
            &ResourcePath::object(CONTAINER, "missing.txt"),
            &policy("r", hours(1)),
        )
        .unwrap();

    let err = gateway.read_object(token.as_str()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
}
