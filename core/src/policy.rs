//! Access policy data model.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::time::format_rfc3339;
use crate::time::truncate_subsecs;
use crate::time::DateTime;
use crate::Error;
use crate::Result;

/// Maximum length of a stored policy name.
pub const MAX_POLICY_NAME_LEN: usize = 64;

/// Capability flags granted by an access policy.
///
/// Rendered in the canonical blob order `racwdl`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Permissions {
    /// Read object content and metadata.
    pub read: bool,
    /// Append to an object.
    pub add: bool,
    /// Create a new object.
    pub create: bool,
    /// Write or overwrite an object.
    pub write: bool,
    /// Delete an object.
    pub delete: bool,
    /// List objects in a container.
    pub list: bool,
}

impl Permissions {
    /// No permission at all.
    pub const NONE: Permissions = Permissions {
        read: false,
        add: false,
        create: false,
        write: false,
        delete: false,
        list: false,
    };

    /// Only `read`.
    pub fn read() -> Self {
        Self {
            read: true,
            ..Self::NONE
        }
    }

    /// Only `write`.
    pub fn write() -> Self {
        Self {
            write: true,
            ..Self::NONE
        }
    }

    /// Only `list`.
    pub fn list() -> Self {
        Self {
            list: true,
            ..Self::NONE
        }
    }

    /// Returns true if no flag is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    /// Returns true if every flag set in `other` is also set in `self`.
    pub fn contains(&self, other: Permissions) -> bool {
        (self.read || !other.read)
            && (self.add || !other.add)
            && (self.create || !other.create)
            && (self.write || !other.write)
            && (self.delete || !other.delete)
            && (self.list || !other.list)
    }

    /// Union of two permission sets.
    pub fn union(self, other: Permissions) -> Self {
        Self {
            read: self.read || other.read,
            add: self.add || other.add,
            create: self.create || other.create,
            write: self.write || other.write,
            delete: self.delete || other.delete,
            list: self.list || other.list,
        }
    }
}

impl std::ops::BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (set, c) in [
            (self.read, 'r'),
            (self.add, 'a'),
            (self.create, 'c'),
            (self.write, 'w'),
            (self.delete, 'd'),
            (self.list, 'l'),
        ] {
            if set {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for Permissions {
    type Err = Error;

    /// Parse permissions in any order, e.g. `wl` or `rwl`.
    fn from_str(s: &str) -> Result<Self> {
        let mut p = Permissions::NONE;
        for c in s.chars() {
            match c {
                'r' => p.read = true,
                'a' => p.add = true,
                'c' => p.create = true,
                'w' => p.write = true,
                'd' => p.delete = true,
                'l' => p.list = true,
                _ => {
                    return Err(Error::invalid_policy(format!(
                        "unknown permission `{c}` in `{s}`"
                    )))
                }
            }
        }
        Ok(p)
    }
}

/// Permission and time window constraints of a token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Capabilities granted.
    pub permissions: Permissions,
    /// Token is valid from this instant. `None` means immediately.
    ///
    /// Only whole seconds are carried by a token.
    pub start: Option<DateTime>,
    /// Token is valid until (exclusive) this instant.
    ///
    /// Only whole seconds are carried by a token.
    pub expiry: Option<DateTime>,
}

impl AccessPolicy {
    /// Create a policy that grants `permissions` until `expiry`.
    ///
    /// `expiry` is truncated to whole seconds.
    pub fn new(permissions: Permissions, expiry: DateTime) -> Self {
        Self {
            permissions,
            start: None,
            expiry: Some(truncate_subsecs(expiry)),
        }
    }

    /// Set the start of the validity window, truncated to whole seconds.
    pub fn with_start(mut self, start: DateTime) -> Self {
        self.start = Some(truncate_subsecs(start));
        self
    }

    /// The same policy with start and expiry truncated to whole seconds.
    pub fn truncated(&self) -> Self {
        Self {
            permissions: self.permissions,
            start: self.start.map(truncate_subsecs),
            expiry: self.expiry.map(truncate_subsecs),
        }
    }

    /// Check the policy is usable for signing or storing.
    ///
    /// - permissions must not be empty
    /// - expiry must be present
    /// - start must be strictly before expiry when present
    ///
    /// The window is checked at the whole-second precision a token carries.
    pub fn validate(&self) -> Result<()> {
        if self.permissions.is_empty() {
            return Err(Error::invalid_policy("permission set is empty"));
        }
        let policy = self.truncated();
        let Some(expiry) = policy.expiry else {
            return Err(Error::invalid_policy("expiry is required"));
        };
        if let Some(start) = policy.start {
            if start >= expiry {
                return Err(Error::invalid_policy(format!(
                    "start {} is not before expiry {}",
                    format_rfc3339(start),
                    format_rfc3339(expiry)
                )));
            }
        }
        Ok(())
    }

    /// Check whether `now` falls inside `[start, expiry)`.
    pub fn check_window(&self, now: DateTime) -> Result<()> {
        if let Some(start) = self.start {
            if now < start {
                return Err(Error::token_not_yet_valid(format!(
                    "token is valid from {}",
                    format_rfc3339(start)
                )));
            }
        }
        match self.expiry {
            Some(expiry) if now < expiry => Ok(()),
            Some(expiry) => Err(Error::token_expired(format!(
                "token expired at {}",
                format_rfc3339(expiry)
            ))),
            None => Err(Error::token_expired("token carries no expiry")),
        }
    }
}

/// Check a stored policy name is acceptable.
pub fn validate_policy_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_policy("policy name is empty"));
    }
    if name.chars().count() > MAX_POLICY_NAME_LEN {
        return Err(Error::invalid_policy(format!(
            "policy name `{name}` is longer than {MAX_POLICY_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Whether a grant covers a whole container or a single object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceScope {
    /// Every object under the container.
    Container,
    /// One named object.
    Object,
}

/// Identity of a container or of an object inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourcePath {
    /// Container name.
    pub container: String,
    /// Object name, `None` for the container itself.
    pub object: Option<String>,
}

impl ResourcePath {
    /// Path of a container.
    pub fn container(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            object: None,
        }
    }

    /// Path of an object inside a container.
    pub fn object(container: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            object: Some(object.into()),
        }
    }

    /// Scope of a token signed for this path.
    pub fn scope(&self) -> ResourceScope {
        match self.object {
            None => ResourceScope::Container,
            Some(_) => ResourceScope::Object,
        }
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.object {
            None => write!(f, "{}", self.container),
            Some(object) => write!(f, "{}/{}", self.container, object),
        }
    }
}

/// What a token is signed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SasConstraints {
    /// Constraints are embedded in the token and immutable after issuance.
    Inline(AccessPolicy),
    /// Constraints are resolved from the named stored policy at validation time.
    Policy(String),
}

/// Opaque version of a container's permission record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ETag(String);

impl ETag {
    /// Wrap a version string.
    pub fn new(v: impl Into<String>) -> Self {
        Self(v.into())
    }

    /// Borrow the version string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Permission metadata of a container, as read from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerPermissions {
    /// Whether anonymous read access is enabled.
    pub public_access: bool,
    /// Stored policies keyed by name.
    pub policies: BTreeMap<String, AccessPolicy>,
    /// Version of this record.
    pub etag: ETag,
}

/// What a validated token allows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    /// Resource the token was presented for.
    pub resource: ResourcePath,
    /// Scope the token was signed with.
    pub scope: ResourceScope,
    /// Effective permissions.
    pub permissions: Permissions,
    /// Stored policy the grant was resolved from, if any.
    pub policy_name: Option<String>,
}

impl Grant {
    /// Fail with `PermissionDenied` unless every flag of `required` is granted.
    pub fn require(&self, required: Permissions) -> Result<()> {
        if self.permissions.contains(required) {
            Ok(())
        } else {
            Err(Error::permission_denied(format!(
                "token grants `{}` on {}, `{}` is required",
                self.permissions, self.resource, required
            )))
        }
    }
}
