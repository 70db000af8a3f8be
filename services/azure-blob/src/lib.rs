//! Stored access policies and service SAS tokens for Azure Blob containers.
//!
//! This crate provides:
//! - [`Config`] loading from `AZURE_STORAGE_CONNECTION_STRING` and `AZBLOB_*` env
//! - [`MemoryGateway`], an in-process blob account that signs and validates
//!   service SAS tokens (version `2018-11-09`) and keeps stored policies as a
//!   `SignedIdentifiers` document per container
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use anyhow::Result;
//! use blobsas_azure_blob::{Config, MemoryGateway};
//! use blobsas_core::time::now;
//! use blobsas_core::{AccessPolicy, Context, OsEnv, Permissions, PolicyStore, ResourceGateway};
//! use blobsas_core::{ResourcePath, TokenIssuer};
//! use chrono::TimeDelta;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let ctx = Context::new().with_env(OsEnv);
//!     let config = Config::default().from_env(&ctx)?;
//!     let gateway = Arc::new(MemoryGateway::from_config(&config)?);
//!     gateway.ensure_container("photos").await?;
//!
//!     let store = PolicyStore::new(gateway.clone(), "photos");
//!     store
//!         .upsert(
//!             "readers",
//!             AccessPolicy::new(Permissions::read(), now() + TimeDelta::hours(1)),
//!         )
//!         .await?;
//!
//!     let token = TokenIssuer::new(gateway.clone())
//!         .issue_by_policy_name(&ResourcePath::object("photos", "cat.png"), "readers")?;
//!     let grant = gateway.validate(token.as_str(), now()).await?;
//!     println!("granted: {}", grant.permissions);
//!
//!     Ok(())
//! }
//! ```

mod acl;
mod constants;
mod connection_string;
mod sas;

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

mod gateway;
pub use gateway::MemoryGateway;
