//! `SignedIdentifiers` document, the wire form of a container's stored policies.
//!
//! - [Get Container ACL](https://learn.microsoft.com/en-us/rest/api/storageservices/get-container-acl)

use std::collections::BTreeMap;

use blobsas_core::time::{format_rfc3339, parse_rfc3339};
use blobsas_core::{AccessPolicy, Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "SignedIdentifiers")]
struct SignedIdentifiers {
    #[serde(rename = "SignedIdentifier", default)]
    identifiers: Vec<SignedIdentifier>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignedIdentifier {
    id: String,
    access_policy: AccessPolicyElement,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AccessPolicyElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry: Option<String>,
    #[serde(default)]
    permission: String,
}

/// Encode stored policies into a `SignedIdentifiers` document.
pub(crate) fn to_xml(policies: &BTreeMap<String, AccessPolicy>) -> Result<String> {
    let doc = SignedIdentifiers {
        identifiers: policies
            .iter()
            .map(|(id, policy)| SignedIdentifier {
                id: id.clone(),
                access_policy: AccessPolicyElement {
                    start: policy.start.map(format_rfc3339),
                    expiry: policy.expiry.map(format_rfc3339),
                    permission: policy.permissions.to_string(),
                },
            })
            .collect(),
    };

    quick_xml::se::to_string(&doc)
        .map_err(|e| Error::unexpected("failed to encode signed identifiers").with_source(e))
}

/// Decode a `SignedIdentifiers` document into stored policies.
pub(crate) fn from_xml(xml: &str) -> Result<BTreeMap<String, AccessPolicy>> {
    let doc: SignedIdentifiers = quick_xml::de::from_str(xml)
        .map_err(|e| Error::unexpected("failed to decode signed identifiers").with_source(e))?;

    let mut policies = BTreeMap::new();
    for identifier in doc.identifiers {
        let element = identifier.access_policy;
        let policy = AccessPolicy {
            permissions: element.permission.parse()?,
            start: element.start.as_deref().map(parse_rfc3339).transpose()?,
            expiry: element.expiry.as_deref().map(parse_rfc3339).transpose()?,
        };
        policies.insert(identifier.id, policy);
    }
    Ok(policies)
}
