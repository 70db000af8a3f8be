use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;

use log::debug;

use crate::policy::validate_policy_name;
use crate::policy::AccessPolicy;
use crate::policy::ResourcePath;
use crate::policy::SasConstraints;
use crate::utils::RedactSignature;
use crate::ResourceGateway;
use crate::Result;

/// A signed URI granting scoped, time-limited access to a resource.
///
/// This is a bearer credential: whoever holds the string can use it.
/// `Debug` hides the signature, `Display` renders the full URI.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Borrow the signed URI.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken")
            .field(&RedactSignature::from(self.0.as_str()))
            .finish()
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// TokenIssuer produces signed URIs for containers and objects.
///
/// Signing itself is delegated to the [`ResourceGateway`], which holds the secret.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    gateway: Arc<dyn ResourceGateway>,
}

impl TokenIssuer {
    /// Create an issuer signing through `gateway`.
    pub fn new(gateway: Arc<dyn ResourceGateway>) -> Self {
        Self { gateway }
    }

    /// Issue a self-contained token with `policy` embedded.
    ///
    /// Fails only if `policy` is invalid.
    pub fn issue_inline(
        &self,
        resource: &ResourcePath,
        policy: &AccessPolicy,
    ) -> Result<AccessToken> {
        policy.validate()?;
        self.issue(resource, &SasConstraints::Inline(policy.truncated()))
    }

    /// Issue a token that references the stored policy `policy_name`.
    ///
    /// The name is not looked up: a token for a policy that does not exist
    /// (yet, or anymore) is issued all the same and only fails when presented.
    pub fn issue_by_policy_name(
        &self,
        resource: &ResourcePath,
        policy_name: &str,
    ) -> Result<AccessToken> {
        validate_policy_name(policy_name)?;
        self.issue(resource, &SasConstraints::Policy(policy_name.to_string()))
    }

    fn issue(&self, resource: &ResourcePath, constraints: &SasConstraints) -> Result<AccessToken> {
        let uri = self.gateway.public_uri(resource)?;
        let query = self.gateway.sign_uri(resource, constraints)?;
        let token = AccessToken(format!("{uri}{query}"));

        debug!("issued {:?} for {resource}", token);
        Ok(token)
    }
}
