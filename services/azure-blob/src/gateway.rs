use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Mutex;

use async_trait::async_trait;
use blobsas_core::time::{now, DateTime};
use blobsas_core::utils::RedactSignature;
use blobsas_core::{
    AccessPolicy, ContainerHandle, ContainerPermissions, ETag, Error, Grant, Permissions,
    validate_policy_name, ResourceGateway, ResourcePath, ResourceScope, Result, SasConstraints,
    DEFAULT_MAX_STORED_POLICIES,
};
use bytes::Bytes;
use http::Uri;
use log::debug;
use percent_encoding::{percent_decode_str, utf8_percent_encode};

use crate::acl;
use crate::constants::BLOB_PATH_ENCODE_SET;
use crate::sas::ServiceSharedAccessSignature;
use crate::{Config, Credential};

#[derive(Default)]
struct ContainerState {
    public_access: bool,
    /// Stored policies as a `SignedIdentifiers` document.
    acl: String,
    version: u64,
    objects: BTreeMap<String, Bytes>,
}

/// MemoryGateway is an in-process blob account.
///
/// It signs and validates service SAS tokens with the account's shared key,
/// keeps every container's stored policies in their `SignedIdentifiers` form,
/// and serves object bytes to token holders.
pub struct MemoryGateway {
    credential: Credential,
    endpoint: String,
    endpoint_uri: Uri,
    max_stored_policies: usize,
    containers: Mutex<BTreeMap<String, ContainerState>>,
    versions: Mutex<u64>,
}

impl Debug for MemoryGateway {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let containers = self
            .containers
            .lock()
            .map(|v| v.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        f.debug_struct("MemoryGateway")
            .field("credential", &self.credential)
            .field("endpoint", &self.endpoint)
            .field("max_stored_policies", &self.max_stored_policies)
            .field("containers", &containers)
            .finish()
    }
}

impl MemoryGateway {
    /// Create a gateway for `credential` on the public cloud endpoint.
    pub fn new(credential: Credential) -> Result<Self> {
        let endpoint = format!("https://{}.blob.core.windows.net", credential.account_name);
        Self::build(credential, endpoint, DEFAULT_MAX_STORED_POLICIES)
    }

    /// Create a gateway from config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let (Some(account_name), Some(account_key)) = (&config.account_name, &config.account_key)
        else {
            return Err(Error::config_invalid(
                "account_name and account_key are required",
            ));
        };

        Self::build(
            Credential::with_shared_key(account_name, account_key),
            config.endpoint_or_default()?,
            config
                .max_stored_policies
                .unwrap_or(DEFAULT_MAX_STORED_POLICIES),
        )
    }

    /// Set the maximum number of stored policies per container.
    pub fn with_max_stored_policies(mut self, max: usize) -> Self {
        self.max_stored_policies = max;
        self
    }

    fn build(credential: Credential, endpoint: String, max_stored_policies: usize) -> Result<Self> {
        if !credential.is_valid() {
            return Err(Error::config_invalid(
                "account_name and account_key must not be empty",
            ));
        }
        // Fail early on a key we could never sign with.
        credential.signing_key()?;

        let endpoint = endpoint.trim_end_matches('/').to_string();
        let endpoint_uri: Uri = endpoint.parse().map_err(|e| {
            Error::config_invalid(format!("endpoint {endpoint} is not a valid uri")).with_source(e)
        })?;
        if endpoint_uri.scheme().is_none() || endpoint_uri.authority().is_none() {
            return Err(Error::config_invalid(format!(
                "endpoint {endpoint} must carry scheme and host"
            )));
        }

        Ok(Self {
            credential,
            endpoint,
            endpoint_uri,
            max_stored_policies,
            containers: Mutex::new(BTreeMap::new()),
            versions: Mutex::new(0),
        })
    }

    fn next_etag(&self) -> (u64, ETag) {
        let mut v = self.versions.lock().expect("lock poisoned");
        *v += 1;
        (*v, etag(*v))
    }

    /// Read an object with a token granting `read`.
    pub async fn read_object(&self, token_uri: &str) -> Result<Bytes> {
        let grant = self.validate(token_uri, now()).await?;
        grant.require(Permissions::read())?;
        let object = object_name(&grant)?;

        let containers = self.containers.lock().expect("lock poisoned");
        containers
            .get(&grant.resource.container)
            .and_then(|c| c.objects.get(object))
            .cloned()
            .ok_or_else(|| Error::resource_not_found(format!("blob {} not found", grant.resource)))
    }

    /// Write an object with a token.
    ///
    /// Creating a new object needs `create` or `write`, overwriting needs `write`.
    pub async fn write_object(&self, token_uri: &str, content: Bytes) -> Result<()> {
        let grant = self.validate(token_uri, now()).await?;
        let object = object_name(&grant)?;

        let mut containers = self.containers.lock().expect("lock poisoned");
        let container = containers
            .get_mut(&grant.resource.container)
            .ok_or_else(|| container_not_found(&grant.resource.container))?;

        if container.objects.contains_key(object) {
            grant.require(Permissions::write())?;
        } else if !grant.permissions.create {
            grant.require(Permissions::write())?;
        }

        container.objects.insert(object.to_string(), content);
        Ok(())
    }

    /// List object names of a container with a container scoped token granting `list`.
    pub async fn list_objects(&self, token_uri: &str) -> Result<Vec<String>> {
        let grant = self.validate(token_uri, now()).await?;
        if grant.scope != ResourceScope::Container || grant.resource.object.is_some() {
            return Err(Error::permission_denied(
                "listing needs a container scoped token presented for the container",
            ));
        }
        grant.require(Permissions::list())?;

        let containers = self.containers.lock().expect("lock poisoned");
        let container = containers
            .get(&grant.resource.container)
            .ok_or_else(|| container_not_found(&grant.resource.container))?;
        Ok(container.objects.keys().cloned().collect())
    }

    /// Split a presented URI into the resource it names and its query.
    fn parse_token_uri(&self, token_uri: &str) -> Result<(ResourcePath, String)> {
        let uri: Uri = token_uri.parse()?;
        if uri.scheme() != self.endpoint_uri.scheme()
            || uri.authority() != self.endpoint_uri.authority()
        {
            return Err(Error::signature_invalid(format!(
                "{:?} does not belong to {}",
                RedactSignature::from(token_uri),
                self.endpoint
            )));
        }

        let base = self.endpoint_uri.path().trim_end_matches('/');
        let path = uri
            .path()
            .strip_prefix(base)
            .and_then(|p| p.strip_prefix('/'))
            .ok_or_else(|| {
                Error::signature_invalid(format!("{} is outside of {}", uri.path(), self.endpoint))
            })?;

        let (container, object) = match path.split_once('/') {
            Some((c, o)) if !o.is_empty() => (c, Some(o)),
            Some((c, _)) => (c, None),
            None => (path, None),
        };
        if container.is_empty() {
            return Err(Error::signature_invalid("uri does not name a container"));
        }

        let resource = ResourcePath {
            container: decode(container)?,
            object: object.map(decode).transpose()?,
        };
        Ok((resource, uri.query().unwrap_or_default().to_string()))
    }

    /// Resolve the constraints a token is bound to.
    fn effective_policy(
        &self,
        sas: &ServiceSharedAccessSignature,
        container: &str,
    ) -> Result<AccessPolicy> {
        let inline = AccessPolicy {
            permissions: sas.permissions.as_deref().unwrap_or_default().parse()?,
            start: sas
                .start
                .as_deref()
                .map(blobsas_core::time::parse_rfc3339)
                .transpose()?,
            expiry: sas
                .expiry
                .as_deref()
                .map(blobsas_core::time::parse_rfc3339)
                .transpose()?,
        };

        let Some(name) = &sas.identifier else {
            return Ok(inline);
        };

        let policies = {
            let containers = self.containers.lock().expect("lock poisoned");
            match containers.get(container) {
                Some(c) if !c.acl.is_empty() => acl::from_xml(&c.acl)?,
                _ => BTreeMap::new(),
            }
        };
        let stored = policies.get(name).ok_or_else(|| {
            Error::policy_not_found(format!(
                "stored policy `{name}` not found on container {container}"
            ))
        })?;

        // A field may come from the token or from the stored policy, never both.
        if (!inline.permissions.is_empty() && !stored.permissions.is_empty())
            || (inline.start.is_some() && stored.start.is_some())
            || (inline.expiry.is_some() && stored.expiry.is_some())
        {
            return Err(Error::signature_invalid(format!(
                "token and stored policy `{name}` both specify the same constraint"
            )));
        }

        Ok(AccessPolicy {
            permissions: inline.permissions | stored.permissions,
            start: inline.start.or(stored.start),
            expiry: inline.expiry.or(stored.expiry),
        })
    }
}

#[async_trait]
impl ResourceGateway for MemoryGateway {
    async fn ensure_container(&self, name: &str) -> Result<ContainerHandle> {
        if name.is_empty() || name.contains('/') {
            return Err(Error::unexpected(format!(
                "`{name}` is not a valid container name"
            )));
        }

        let (version, _) = self.next_etag();
        let mut containers = self.containers.lock().expect("lock poisoned");
        let created = !containers.contains_key(name);
        if created {
            containers.insert(
                name.to_string(),
                ContainerState {
                    acl: acl::to_xml(&BTreeMap::new())?,
                    version,
                    ..Default::default()
                },
            );
            debug!("created container {name}");
        }

        Ok(ContainerHandle {
            name: name.to_string(),
            created,
        })
    }

    async fn get_permissions(&self, container: &str) -> Result<ContainerPermissions> {
        let containers = self.containers.lock().expect("lock poisoned");
        let state = containers
            .get(container)
            .ok_or_else(|| container_not_found(container))?;

        Ok(ContainerPermissions {
            public_access: state.public_access,
            policies: acl::from_xml(&state.acl)?,
            etag: etag(state.version),
        })
    }

    async fn set_permissions(
        &self,
        container: &str,
        public_access: bool,
        policies: &BTreeMap<String, AccessPolicy>,
        if_match: Option<&ETag>,
    ) -> Result<ETag> {
        if policies.len() > self.max_stored_policies {
            return Err(Error::capacity_exceeded(format!(
                "{} stored policies exceed the limit of {}",
                policies.len(),
                self.max_stored_policies
            )));
        }
        for (name, policy) in policies {
            validate_policy_name(name)?;
            policy.validate().map_err(|err| {
                Error::invalid_policy(format!("stored policy `{name}` is invalid"))
                    .with_source(err)
            })?;
        }
        let document = acl::to_xml(policies)?;

        let (version, new_etag) = self.next_etag();
        let mut containers = self.containers.lock().expect("lock poisoned");
        let state = containers
            .get_mut(container)
            .ok_or_else(|| container_not_found(container))?;

        if let Some(expected) = if_match {
            let current = etag(state.version);
            if &current != expected {
                return Err(Error::precondition_failed(format!(
                    "container {container} is at {current}, not {expected}"
                )));
            }
        }

        state.public_access = public_access;
        state.acl = document;
        state.version = version;
        debug!("set acl of container {container} to {}", state.acl);

        Ok(new_etag)
    }

    async fn put_object(&self, container: &str, object: &str, content: Bytes) -> Result<()> {
        if object.is_empty() {
            return Err(Error::unexpected("blob name must not be empty"));
        }

        let mut containers = self.containers.lock().expect("lock poisoned");
        let state = containers
            .get_mut(container)
            .ok_or_else(|| container_not_found(container))?;
        state.objects.insert(object.to_string(), content);
        Ok(())
    }

    fn public_uri(&self, resource: &ResourcePath) -> Result<String> {
        let mut uri = format!(
            "{}/{}",
            self.endpoint,
            utf8_percent_encode(&resource.container, &BLOB_PATH_ENCODE_SET)
        );
        if let Some(object) = &resource.object {
            uri.push('/');
            uri.push_str(&utf8_percent_encode(object, &BLOB_PATH_ENCODE_SET).to_string());
        }
        Ok(uri)
    }

    fn sign_uri(&self, resource: &ResourcePath, constraints: &SasConstraints) -> Result<String> {
        let sas = ServiceSharedAccessSignature::new(resource, constraints)
            .sign(&self.credential, resource)?;
        Ok(sas.to_query())
    }

    async fn validate(&self, token_uri: &str, now: DateTime) -> Result<Grant> {
        let (resource, query) = self.parse_token_uri(token_uri)?;
        let sas = ServiceSharedAccessSignature::from_query(&query)?;
        let scope = sas.scope()?;

        sas.verify(&self.credential, &resource)?;

        let policy = self.effective_policy(&sas, &resource.container)?;
        policy.check_window(now)?;

        debug!(
            "validated {:?} for {resource}, granting {}",
            RedactSignature::from(token_uri),
            policy.permissions
        );

        Ok(Grant {
            resource,
            scope,
            permissions: policy.permissions,
            policy_name: sas.identifier,
        })
    }
}

fn etag(version: u64) -> ETag {
    ETag::new(format!("\"0x{version:X}\""))
}

fn decode(segment: &str) -> Result<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|v| v.into_owned())
        .map_err(|e| Error::signature_invalid("uri path is not valid utf-8").with_source(e))
}

fn object_name(grant: &Grant) -> Result<&str> {
    grant.resource.object.as_deref().ok_or_else(|| {
        Error::resource_not_found(format!("{} does not name a blob", grant.resource))
    })
}

fn container_not_found(container: &str) -> Error {
    Error::resource_not_found(format!("container {container} not found"))
}
