//! Core components for issuing shared access signatures.
//!
//! This crate provides the storage-agnostic pieces of blobsas: the access
//! policy model, the gateway abstraction, and the two components built on it.
//!
//! ## Overview
//!
//! - **ResourceGateway**: the storage backend. It holds the signing secret,
//!   stores container permission metadata, and validates presented tokens.
//! - **PolicyStore**: manages the named stored policies of one container by
//!   read-modify-write of the whole permission record.
//! - **TokenIssuer**: issues signed URIs, either with an inline policy or by
//!   referencing a stored policy name.
//!
//! ## Deferred binding
//!
//! A token issued by policy name carries only the name. The gateway resolves
//! it against the container's current stored policies every time the token
//! is presented, so editing or removing the policy changes what every
//! outstanding token grants.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use blobsas_core::time::now;
//! use blobsas_core::{
//!     AccessPolicy, Permissions, PolicyStore, ResourceGateway, ResourcePath, Result,
//!     TokenIssuer,
//! };
//!
//! # async fn example(gateway: Arc<dyn ResourceGateway>) -> Result<()> {
//! let expiry = now() + chrono::TimeDelta::hours(24);
//!
//! let store = PolicyStore::new(gateway.clone(), "mycontainer");
//! store
//!     .upsert("myPolicy", AccessPolicy::new(Permissions::read(), expiry))
//!     .await?;
//!
//! let issuer = TokenIssuer::new(gateway);
//! let token = issuer.issue_by_policy_name(&ResourcePath::container("mycontainer"), "myPolicy")?;
//! println!("{token}");
//! # Ok(())
//! # }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::Context;
pub use context::Env;
pub use context::OsEnv;
pub use context::StaticEnv;

mod error;
pub use error::{Error, ErrorKind, Result};

mod policy;
pub use policy::validate_policy_name;
pub use policy::MAX_POLICY_NAME_LEN;
pub use policy::{
    AccessPolicy, ContainerPermissions, ETag, Grant, Permissions, ResourcePath, ResourceScope,
    SasConstraints,
};

mod api;
pub use api::{ContainerHandle, ResourceGateway};

mod store;
pub use store::{PolicySnapshot, PolicyStore, DEFAULT_MAX_STORED_POLICIES};

mod issuer;
pub use issuer::{AccessToken, TokenIssuer};
