//! Service shared access signature for blob containers and blobs.

use std::fmt::Write;

use blobsas_core::hash;
use blobsas_core::time;
use blobsas_core::{Error, ResourcePath, ResourceScope, Result, SasConstraints};
use log::debug;

use crate::constants::*;
use crate::Credential;

/// The signed fields of a service SAS, kept exactly as they appear in the query.
///
/// Validation recomputes the signature from these raw values, so they are never
/// normalized after parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ServiceSharedAccessSignature {
    pub version: String,
    pub resource: String,
    pub permissions: Option<String>,
    pub start: Option<String>,
    pub expiry: Option<String>,
    pub identifier: Option<String>,
    pub signature: Option<String>,
}

impl ServiceSharedAccessSignature {
    /// Build the unsigned fields for `resource` under `constraints`.
    pub fn new(resource: &ResourcePath, constraints: &SasConstraints) -> Self {
        let mut sas = Self {
            version: SAS_VERSION.to_string(),
            resource: signed_resource(resource.scope()).to_string(),
            ..Default::default()
        };

        match constraints {
            SasConstraints::Inline(policy) => {
                sas.permissions = Some(policy.permissions.to_string());
                sas.start = policy.start.map(time::format_rfc3339);
                sas.expiry = policy.expiry.map(time::format_rfc3339);
            }
            SasConstraints::Policy(name) => {
                sas.identifier = Some(name.clone());
            }
        }

        sas
    }

    /// Parse the SAS fields out of a query string.
    ///
    /// Parameters that are not part of a SAS are ignored.
    pub fn from_query(query: &str) -> Result<Self> {
        let mut sas = Self::default();
        let mut version = None;
        let mut resource = None;

        for (k, v) in form_urlencoded::parse(query.as_bytes()) {
            let v = v.into_owned();
            match k.as_ref() {
                SAS_VERSION_KEY => version = Some(v),
                SAS_RESOURCE_KEY => resource = Some(v),
                SAS_PERMISSIONS_KEY => sas.permissions = Some(v),
                SAS_START_KEY => sas.start = Some(v),
                SAS_EXPIRY_KEY => sas.expiry = Some(v),
                SAS_IDENTIFIER_KEY => sas.identifier = Some(v),
                SAS_SIGNATURE_KEY => sas.signature = Some(v),
                _ => {}
            }
        }

        sas.version = version
            .ok_or_else(|| Error::signature_invalid("signed version `sv` is missing"))?;
        sas.resource = resource
            .ok_or_else(|| Error::signature_invalid("signed resource `sr` is missing"))?;
        if sas.signature.is_none() {
            return Err(Error::signature_invalid("signature `sig` is missing"));
        }

        Ok(sas)
    }

    /// Scope named by the signed resource field.
    pub fn scope(&self) -> Result<ResourceScope> {
        match self.resource.as_str() {
            "c" => Ok(ResourceScope::Container),
            "b" => Ok(ResourceScope::Object),
            v => Err(Error::signature_invalid(format!(
                "unsupported signed resource `{v}`"
            ))),
        }
    }

    /// Sign the fields for `resource` with the account key.
    pub fn sign(mut self, cred: &Credential, resource: &ResourcePath) -> Result<Self> {
        let string_to_sign = self.string_to_sign(&cred.account_name, resource)?;
        let key = cred.signing_key()?;
        self.signature = Some(hash::base64_hmac_sha256(&key, string_to_sign.as_bytes()));
        Ok(self)
    }

    /// Check the carried signature against `resource`.
    ///
    /// For a container scoped SAS only the container part of `resource` is signed.
    pub fn verify(&self, cred: &Credential, resource: &ResourcePath) -> Result<()> {
        let Some(signature) = &self.signature else {
            return Err(Error::signature_invalid("signature `sig` is missing"));
        };
        let string_to_sign = self.string_to_sign(&cred.account_name, resource)?;
        let key = cred.signing_key()?;

        if hash::verify_base64_hmac_sha256(&key, string_to_sign.as_bytes(), signature) {
            Ok(())
        } else {
            Err(Error::signature_invalid(format!(
                "signature mismatch for {resource}"
            )))
        }
    }

    /// Render the fields as a query component with the leading `?`.
    ///
    /// [Example](https://docs.microsoft.com/rest/api/storageservices/create-service-sas#service-sas-example) from Azure documentation.
    pub fn to_query(&self) -> String {
        let mut elements: Vec<(&str, &str)> = vec![
            (SAS_VERSION_KEY, self.version.as_str()),
            (SAS_RESOURCE_KEY, self.resource.as_str()),
        ];
        for (k, v) in [
            (SAS_PERMISSIONS_KEY, &self.permissions),
            (SAS_START_KEY, &self.start),
            (SAS_EXPIRY_KEY, &self.expiry),
            (SAS_IDENTIFIER_KEY, &self.identifier),
            (SAS_SIGNATURE_KEY, &self.signature),
        ] {
            if let Some(v) = v {
                elements.push((k, v.as_str()));
            }
        }

        let mut s = String::from("?");
        for (i, (k, v)) in elements.into_iter().enumerate() {
            if i > 0 {
                s.push('&');
            }
            s.push_str(k);
            s.push('=');
            s.push_str(&urlencoded(v));
        }
        s
    }

    /// Construct string to sign
    ///
    /// ## Format
    ///
    /// ```text
    /// signedPermissions + "\n" +
    /// signedStart + "\n" +
    /// signedExpiry + "\n" +
    /// canonicalizedResource + "\n" +
    /// signedIdentifier + "\n" +
    /// signedIP + "\n" +
    /// signedProtocol + "\n" +
    /// signedVersion + "\n" +
    /// signedResource + "\n" +
    /// signedSnapshotTime + "\n" +
    /// rscc + "\n" +
    /// rscd + "\n" +
    /// rsce + "\n" +
    /// rscl + "\n" +
    /// rsct
    /// ```
    ///
    /// IP ranges, protocols, snapshots and response header overrides are never
    /// signed by us, so their lines stay empty.
    ///
    /// ## Reference
    ///
    /// - [Create a service SAS](https://learn.microsoft.com/en-us/rest/api/storageservices/create-service-sas#version-2018-11-09-and-later)
    fn string_to_sign(&self, account_name: &str, resource: &ResourcePath) -> Result<String> {
        let mut s = String::with_capacity(256);

        writeln!(&mut s, "{}", self.permissions.as_deref().unwrap_or_default())?;
        writeln!(&mut s, "{}", self.start.as_deref().unwrap_or_default())?;
        writeln!(&mut s, "{}", self.expiry.as_deref().unwrap_or_default())?;
        writeln!(
            &mut s,
            "{}",
            canonicalize_resource(account_name, resource, self.scope()?)?
        )?;
        writeln!(&mut s, "{}", self.identifier.as_deref().unwrap_or_default())?;
        // signedIP, signedProtocol
        writeln!(&mut s)?;
        writeln!(&mut s)?;
        writeln!(&mut s, "{}", self.version)?;
        writeln!(&mut s, "{}", self.resource)?;
        // signedSnapshotTime, rscc, rscd, rsce, rscl, rsct
        write!(&mut s, "\n\n\n\n\n")?;

        debug!("string to sign: {}", &s);

        Ok(s)
    }
}

fn signed_resource(scope: ResourceScope) -> &'static str {
    match scope {
        ResourceScope::Container => "c",
        ResourceScope::Object => "b",
    }
}

/// ## Reference
///
/// - [Specify the signed resource](https://learn.microsoft.com/en-us/rest/api/storageservices/create-service-sas#specify-the-signed-resource-blob-storage-only)
fn canonicalize_resource(
    account_name: &str,
    resource: &ResourcePath,
    scope: ResourceScope,
) -> Result<String> {
    match (scope, &resource.object) {
        (ResourceScope::Container, _) => {
            Ok(format!("/blob/{account_name}/{}", resource.container))
        }
        (ResourceScope::Object, Some(object)) => Ok(format!(
            "/blob/{account_name}/{}/{object}",
            resource.container
        )),
        (ResourceScope::Object, None) => Err(Error::signature_invalid(format!(
            "blob scoped signature presented for container {}",
            resource.container
        ))),
    }
}

fn urlencoded(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
