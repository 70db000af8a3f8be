use std::collections::BTreeMap;
use std::fmt::Debug;

use bytes::Bytes;

use crate::policy::AccessPolicy;
use crate::policy::ContainerPermissions;
use crate::policy::ETag;
use crate::policy::Grant;
use crate::policy::ResourcePath;
use crate::policy::SasConstraints;
use crate::time::DateTime;
use crate::Result;

/// Handle returned by [`ResourceGateway::ensure_container`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    /// Container name.
    pub name: String,
    /// Whether this call created the container.
    pub created: bool,
}

/// ResourceGateway is the storage backend the issuer and the policy store
/// operate against.
///
/// The gateway owns the signing secret: callers hand it a resource and its
/// constraints, and it returns a signed query component. It is also the party
/// that validates tokens presented back to it.
///
/// Permission metadata is replaced as a whole. There is no incremental patch,
/// so a read-modify-write by two callers loses one update unless the writer
/// passes the [`ETag`] it read as `if_match`.
#[async_trait::async_trait]
pub trait ResourceGateway: Debug + Send + Sync + 'static {
    /// Create the container if it does not exist yet.
    async fn ensure_container(&self, name: &str) -> Result<ContainerHandle>;

    /// Fetch the container's public access flag and stored policies.
    async fn get_permissions(&self, container: &str) -> Result<ContainerPermissions>;

    /// Replace the container's public access flag and stored policies.
    ///
    /// ## If Match
    ///
    /// When `if_match` is set and differs from the current version, the write is
    /// rejected with `PreconditionFailed` and nothing changes.
    ///
    /// Returns the version of the record just written.
    async fn set_permissions(
        &self,
        container: &str,
        public_access: bool,
        policies: &BTreeMap<String, AccessPolicy>,
        if_match: Option<&ETag>,
    ) -> Result<ETag>;

    /// Store object bytes, overwriting any existing object.
    async fn put_object(&self, container: &str, object: &str, content: Bytes) -> Result<()>;

    /// Public URI of a resource, without any signature.
    fn public_uri(&self, resource: &ResourcePath) -> Result<String>;

    /// Sign a resource under the given constraints.
    ///
    /// Returns the query component including the leading `?`.
    fn sign_uri(&self, resource: &ResourcePath, constraints: &SasConstraints) -> Result<String>;

    /// Validate a signed URI at `now` and return what it grants.
    ///
    /// Policy-referencing tokens are resolved against the container's current
    /// stored policies here, not at issuance.
    async fn validate(&self, token_uri: &str, now: DateTime) -> Result<Grant>;
}
