use blobsas_core::{Context, Error, Result};
use log::warn;

use crate::connection_string;
use crate::constants::*;

/// Config carries all the configuration for the blob gateway.
#[derive(Clone, Default)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub struct Config {
    /// `account_name` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZBLOB_ACCOUNT_NAME`]
    /// - `AccountName` of the connection string in [`AZURE_STORAGE_CONNECTION_STRING`]
    pub account_name: Option<String>,
    /// `account_key` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZBLOB_ACCOUNT_KEY`]
    /// - `AccountKey` of the connection string in [`AZURE_STORAGE_CONNECTION_STRING`]
    pub account_key: Option<String>,
    /// `endpoint` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZBLOB_ENDPOINT`]
    /// - `BlobEndpoint` or `EndpointSuffix` of the connection string
    ///
    /// Defaults to `https://{account_name}.blob.core.windows.net`.
    pub endpoint: Option<String>,
    /// Maximum number of stored policies a container may hold.
    ///
    /// - env value: [`AZBLOB_MAX_STORED_POLICIES`]
    ///
    /// Defaults to 5.
    pub max_stored_policies: Option<usize>,
}

impl Config {
    /// Load config from env.
    ///
    /// Fields already set are kept. The dedicated variables override what
    /// the connection string carries.
    pub fn from_env(mut self, ctx: &Context) -> Result<Self> {
        let mut loaded = match ctx.env_var(AZURE_STORAGE_CONNECTION_STRING) {
            Some(v) => connection_string::parse(&v)?,
            None => Config::default(),
        };

        if let Some(v) = ctx.env_var(AZBLOB_ACCOUNT_NAME) {
            loaded.account_name = Some(v);
        }

        if let Some(v) = ctx.env_var(AZBLOB_ACCOUNT_KEY) {
            loaded.account_key = Some(v);
        }

        if let Some(v) = ctx.env_var(AZBLOB_ENDPOINT) {
            loaded.endpoint = Some(v);
        }

        if let Some(v) = ctx.env_var(AZBLOB_MAX_STORED_POLICIES) {
            match v.parse() {
                Ok(n) => loaded.max_stored_policies = Some(n),
                Err(_) => warn!("ignore invalid {AZBLOB_MAX_STORED_POLICIES}: {v}"),
            }
        }

        self.account_name = self.account_name.or(loaded.account_name);
        self.account_key = self.account_key.or(loaded.account_key);
        self.endpoint = self.endpoint.or(loaded.endpoint);
        self.max_stored_policies = self.max_stored_policies.or(loaded.max_stored_policies);

        Ok(self)
    }

    /// Parses an [Azure connection string][1] into a configuration object.
    ///
    /// The connection string doesn't have to specify all required parameters
    /// because the user is still allowed to set them later directly on the object.
    ///
    /// An example of a connection string looks like:
    ///
    /// ```txt
    /// AccountName=mystorageaccount;
    /// AccountKey=Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==;
    /// BlobEndpoint=https://mystorageaccount.blob.core.windows.net
    /// ```
    ///
    /// [1]: https://learn.microsoft.com/en-us/azure/storage/common/storage-configure-connection-string
    pub fn try_from_connection_string(conn_str: &str) -> Result<Self> {
        connection_string::parse(conn_str)
    }

    /// Resolve the endpoint, falling back to the public cloud one.
    pub(crate) fn endpoint_or_default(&self) -> Result<String> {
        if let Some(endpoint) = &self.endpoint {
            return Ok(endpoint.trim_end_matches('/').to_string());
        }
        match &self.account_name {
            Some(name) => Ok(format!("https://{name}.blob.core.windows.net")),
            None => Err(Error::config_invalid(
                "account_name is required to build the default endpoint",
            )),
        }
    }
}
