use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use log::warn;

use crate::policy::validate_policy_name;
use crate::policy::AccessPolicy;
use crate::policy::ETag;
use crate::Error;
use crate::ErrorKind;
use crate::ResourceGateway;
use crate::Result;

/// Default maximum number of stored policies per container.
///
/// Azure Blob Storage allows at most five signed identifiers on a container.
pub const DEFAULT_MAX_STORED_POLICIES: usize = 5;

/// Local copy of a container's stored policies, as read at one version.
///
/// Mutations only touch this copy. Nothing reaches the gateway until the
/// snapshot is passed to [`PolicyStore::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySnapshot {
    public_access: bool,
    policies: BTreeMap<String, AccessPolicy>,
    etag: ETag,
    max_policies: usize,
}

impl PolicySnapshot {
    /// Version this snapshot was read at.
    pub fn etag(&self) -> &ETag {
        &self.etag
    }

    /// Stored policies in this snapshot.
    pub fn policies(&self) -> &BTreeMap<String, AccessPolicy> {
        &self.policies
    }

    /// Insert or replace a named policy.
    ///
    /// Fails with `InvalidPolicy` for a malformed policy or name, and with
    /// `CapacityExceeded` if a new name would go over the limit. The snapshot
    /// is left unchanged on failure.
    pub fn upsert(&mut self, name: &str, policy: AccessPolicy) -> Result<()> {
        validate_policy_name(name)?;
        policy.validate()?;

        if !self.policies.contains_key(name) && self.policies.len() >= self.max_policies {
            return Err(Error::capacity_exceeded(format!(
                "container already holds {} stored policies, cannot add `{name}`",
                self.max_policies
            )));
        }

        self.policies.insert(name.to_string(), policy.truncated());
        Ok(())
    }

    /// Remove a named policy. Returns whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.policies.remove(name).is_some()
    }

    /// Remove every stored policy.
    pub fn clear(&mut self) {
        self.policies.clear();
    }
}

/// PolicyStore manages the stored policies attached to one container.
///
/// Every mutation is a read-modify-write of the container's whole permission
/// record: load the current set, change a local copy, write it all back.
///
/// ## Lost updates
///
/// Two callers that load the same version and both commit will not see an
/// error by default: the last writer wins and the earlier change is silently
/// gone. Enable [`PolicyStore::with_precondition`] to send the loaded version
/// along with the write, turning the second commit into `PreconditionFailed`.
#[derive(Debug, Clone)]
pub struct PolicyStore {
    gateway: Arc<dyn ResourceGateway>,
    container: String,
    max_policies: usize,
    precondition: bool,
}

impl PolicyStore {
    /// Create a store for `container` with the default policy limit.
    pub fn new(gateway: Arc<dyn ResourceGateway>, container: impl Into<String>) -> Self {
        Self {
            gateway,
            container: container.into(),
            max_policies: DEFAULT_MAX_STORED_POLICIES,
            precondition: false,
        }
    }

    /// Set the maximum number of stored policies.
    pub fn with_max_policies(mut self, max_policies: usize) -> Self {
        self.max_policies = max_policies;
        self
    }

    /// Make commits conditional on the version the snapshot was read at.
    pub fn with_precondition(mut self, enabled: bool) -> Self {
        self.precondition = enabled;
        self
    }

    /// Container this store manages.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Read the current permission record into a local snapshot.
    pub async fn load(&self) -> Result<PolicySnapshot> {
        let perms = self.gateway.get_permissions(&self.container).await?;
        Ok(PolicySnapshot {
            public_access: perms.public_access,
            policies: perms.policies,
            etag: perms.etag,
            max_policies: self.max_policies,
        })
    }

    /// Write a snapshot back as the container's full permission record.
    pub async fn commit(&self, snapshot: &PolicySnapshot) -> Result<ETag> {
        let if_match = self.precondition.then_some(&snapshot.etag);
        let res = self
            .gateway
            .set_permissions(
                &self.container,
                snapshot.public_access,
                &snapshot.policies,
                if_match,
            )
            .await;

        match res {
            Ok(etag) => {
                debug!(
                    "container {} now holds stored policies {:?} at {}",
                    self.container,
                    snapshot.policies.keys().collect::<Vec<_>>(),
                    etag
                );
                Ok(etag)
            }
            Err(err) if err.kind() == ErrorKind::PreconditionFailed => {
                warn!(
                    "stored policies of container {} changed since {}, commit rejected",
                    self.container, snapshot.etag
                );
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Insert or replace a named policy.
    pub async fn upsert(&self, name: &str, policy: AccessPolicy) -> Result<()> {
        let mut snapshot = self.load().await?;
        snapshot.upsert(name, policy)?;
        self.commit(&snapshot).await?;
        Ok(())
    }

    /// Remove a named policy. Absent names are not an error.
    pub async fn remove(&self, name: &str) -> Result<()> {
        let mut snapshot = self.load().await?;
        if !snapshot.remove(name) {
            debug!(
                "stored policy {name} not present on container {}",
                self.container
            );
            return Ok(());
        }
        self.commit(&snapshot).await?;
        Ok(())
    }

    /// Remove every stored policy from the container.
    pub async fn clear_all(&self) -> Result<()> {
        let mut snapshot = self.load().await?;
        snapshot.clear();
        self.commit(&snapshot).await?;
        Ok(())
    }

    /// Current mapping of name to policy.
    pub async fn list(&self) -> Result<BTreeMap<String, AccessPolicy>> {
        Ok(self.load().await?.policies)
    }
}
