use blobsas_core::time::now;
use blobsas_core::{
    AccessPolicy, ErrorKind, Grant, Permissions, PolicyStore, ResourceGateway, ResourcePath,
    ResourceScope, TokenIssuer,
};
use chrono::{TimeDelta, TimeZone, Utc};
use pretty_assertions::assert_eq;
use test_case::test_case;

use crate::{hours, in_hours, init_gateway, policy, CONTAINER};

#[test_case("r"; "read")]
#[test_case("wl"; "write list")]
#[test_case("racwdl"; "everything")]
#[tokio::test]
async fn test_inline_grant(permissions: &str) {
    let gateway = init_gateway().await;
    let issuer = TokenIssuer::new(gateway.clone());

    let start = now() - TimeDelta::minutes(5);
    let p = policy(permissions, hours(24)).with_start(start);
    let resource = ResourcePath::object(CONTAINER, "blobForSAS.txt");
    let token = issuer.issue_inline(&resource, &p).unwrap();

    for at in [start, now(), in_hours(23)] {
        let grant = gateway.validate(token.as_str(), at).await.unwrap();
        assert_eq!(
            grant,
            Grant {
                resource: resource.clone(),
                scope: ResourceScope::Object,
                permissions: permissions.parse().unwrap(),
                policy_name: None,
            }
        );
    }
}

#[tokio::test]
async fn test_inline_token_expires() {
    let gateway = init_gateway().await;
    let issuer = TokenIssuer::new(gateway.clone());

    let p = policy("rw", hours(1));
    let expiry = p.expiry.unwrap();
    let token = issuer
        .issue_inline(&ResourcePath::container(CONTAINER), &p)
        .unwrap();

    for at in [expiry, expiry + TimeDelta::seconds(1), in_hours(48)] {
        let err = gateway.validate(token.as_str(), at).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenExpired);
    }
}

#[tokio::test]
async fn test_inline_token_not_yet_valid() {
    let gateway = init_gateway().await;
    let issuer = TokenIssuer::new(gateway.clone());

    let p = policy("r", hours(2)).with_start(in_hours(1));
    let token = issuer
        .issue_inline(&ResourcePath::container(CONTAINER), &p)
        .unwrap();

    let err = gateway.validate(token.as_str(), now()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TokenNotYetValid);
}

#[tokio::test]
async fn test_sub_second_window() {
    let gateway = init_gateway().await;
    let issuer = TokenIssuer::new(gateway.clone());
    let resource = ResourcePath::object(CONTAINER, "a.txt");
    let base = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

    // Both ends fall into the same second, nothing is left of the window.
    let collapsed = AccessPolicy::new(Permissions::read(), base + TimeDelta::milliseconds(800))
        .with_start(base + TimeDelta::milliseconds(200));
    let err = issuer.issue_inline(&resource, &collapsed).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPolicy);

    let p = AccessPolicy {
        permissions: Permissions::read(),
        start: Some(base + TimeDelta::milliseconds(200)),
        expiry: Some(base + TimeDelta::milliseconds(1800)),
    };
    let token = issuer.issue_inline(&resource, &p).unwrap();
    assert!(token.as_str().contains("st=2030-01-01T00%3A00%3A00Z"));
    assert!(token.as_str().contains("se=2030-01-01T00%3A00%3A01Z"));

    let grant = gateway
        .validate(token.as_str(), base + TimeDelta::milliseconds(500))
        .await
        .unwrap();
    assert_eq!(grant.permissions, Permissions::read());
    let err = gateway
        .validate(token.as_str(), base + TimeDelta::seconds(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TokenExpired);
}

#[tokio::test]
async fn test_issue_inline_rejects_invalid_policy() {
    let gateway = init_gateway().await;
    let issuer = TokenIssuer::new(gateway.clone());
    let resource = ResourcePath::container(CONTAINER);

    let empty = AccessPolicy::new(Permissions::NONE, in_hours(1));
    let inverted = policy("r", hours(1)).with_start(in_hours(2));
    let no_expiry = AccessPolicy {
        permissions: Permissions::read(),
        start: None,
        expiry: None,
    };

    for p in [empty, inverted, no_expiry] {
        let err = issuer.issue_inline(&resource, &p).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPolicy);
    }
}

#[tokio::test]
async fn test_inline_token_ignores_stored_policies() {
    let gateway = init_gateway().await;
    let issuer = TokenIssuer::new(gateway.clone());
    let store = PolicyStore::new(gateway.clone(), CONTAINER);

    let token = issuer
        .issue_inline(&ResourcePath::container(CONTAINER), &policy("wl", hours(24)))
        .unwrap();
    store.upsert("polA", policy("r", hours(1))).await.unwrap();
    store.clear_all().await.unwrap();

    let grant = gateway.validate(token.as_str(), now()).await.unwrap();
    assert_eq!(grant.permissions, "wl".parse().unwrap());
}

#[tokio::test]
async fn test_policy_binding_is_deferred() {
    let gateway = init_gateway().await;
    let issuer = TokenIssuer::new(gateway.clone());
    let store = PolicyStore::new(gateway.clone(), CONTAINER);

    store.upsert("polA", policy("r", hours(24))).await.unwrap();
    let resource = ResourcePath::object(CONTAINER, "sasblobpolicy.txt");
    let token = issuer.issue_by_policy_name(&resource, "polA").unwrap();

    let grant = gateway.validate(token.as_str(), now()).await.unwrap();
    assert_eq!(grant.permissions, Permissions::read());
    assert_eq!(grant.policy_name.as_deref(), Some("polA"));

    // Widen the stored policy after issuance.
    store.upsert("polA", policy("rwl", hours(24))).await.unwrap();
    let grant = gateway.validate(token.as_str(), now()).await.unwrap();
    assert_eq!(grant.permissions, "rwl".parse().unwrap());

    // Shorten it into the past.
    store
        .upsert(
            "polA",
            policy("r", hours(-1)).with_start(now() - TimeDelta::hours(2)),
        )
        .await
        .unwrap();
    let err = gateway.validate(token.as_str(), now()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TokenExpired);
}

#[tokio::test]
async fn test_issue_by_unknown_policy_name() {
    let gateway = init_gateway().await;
    let issuer = TokenIssuer::new(gateway.clone());
    let store = PolicyStore::new(gateway.clone(), CONTAINER);

    // Issuance never looks the name up.
    let token = issuer
        .issue_by_policy_name(&ResourcePath::container(CONTAINER), "later")
        .unwrap();
    let err = gateway.validate(token.as_str(), now()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyNotFound);

    store.upsert("later", policy("l", hours(1))).await.unwrap();
    let grant = gateway.validate(token.as_str(), now()).await.unwrap();
    assert_eq!(grant.permissions, Permissions::list());

    let err = issuer
        .issue_by_policy_name(&ResourcePath::container(CONTAINER), "")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPolicy);
}

#[tokio::test]
async fn test_policy_on_other_container() {
    let gateway = init_gateway().await;
    let issuer = TokenIssuer::new(gateway.clone());
    PolicyStore::new(gateway.clone(), CONTAINER)
        .upsert("polA", policy("r", hours(1)))
        .await
        .unwrap();

    // Stored policies belong to a single container.
    let token = issuer
        .issue_by_policy_name(&ResourcePath::container("other"), "polA")
        .unwrap();
    let err = gateway.validate(token.as_str(), now()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyNotFound);
}

#[tokio::test]
async fn test_container_token_covers_objects() {
    let gateway = init_gateway().await;
    let issuer = TokenIssuer::new(gateway.clone());

    let token = issuer
        .issue_inline(&ResourcePath::container(CONTAINER), &policy("rl", hours(1)))
        .unwrap();
    let query = &token.as_str()[token.as_str().find('?').unwrap()..];

    for object in ["a.txt", "dir/b c.txt"] {
        let resource = ResourcePath::object(CONTAINER, object);
        let uri = format!("{}{query}", gateway.public_uri(&resource).unwrap());
        let grant = gateway.validate(&uri, now()).await.unwrap();
        assert_eq!(grant.resource, resource);
        assert_eq!(grant.scope, ResourceScope::Container);
    }
}

#[tokio::test]
async fn test_object_token_is_bound_to_object() {
    let gateway = init_gateway().await;
    let issuer = TokenIssuer::new(gateway.clone());

    let token = issuer
        .issue_inline(&ResourcePath::object(CONTAINER, "a.txt"), &policy("r", hours(1)))
        .unwrap();
    let query = &token.as_str()[token.as_str().find('?').unwrap()..];

    for resource in [
        ResourcePath::object(CONTAINER, "b.txt"),
        ResourcePath::container(CONTAINER),
    ] {
        let uri = format!("{}{query}", gateway.public_uri(&resource).unwrap());
        let err = gateway.validate(&uri, now()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SignatureInvalid);
    }
}

#[tokio::test]
async fn test_tampered_token() {
    let gateway = init_gateway().await;
    let issuer = TokenIssuer::new(gateway.clone());

    let token = issuer
        .issue_inline(&ResourcePath::container(CONTAINER), &policy("r", hours(1)))
        .unwrap();

    let widened = token.as_str().replace("sp=r&", "sp=rwdl&");
    assert_ne!(widened, token.as_str());
    let err = gateway.validate(&widened, now()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SignatureInvalid);

    let stripped = token.as_str().split("&sig=").next().unwrap().to_string();
    let err = gateway.validate(&stripped, now()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SignatureInvalid);
}

#[tokio::test]
async fn test_token_debug_is_redacted() {
    let gateway = init_gateway().await;
    let token = TokenIssuer::new(gateway.clone())
        .issue_inline(&ResourcePath::container(CONTAINER), &policy("r", hours(1)))
        .unwrap();

    let sig = token.as_str().split("&sig=").nth(1).unwrap();
    assert!(!format!("{token:?}").contains(sig));
    assert!(token.to_string().contains(sig));
}
