use std::collections::HashMap;

use blobsas_core::{Error, Result};

use crate::Config;

/// Azurite defaults.
const AZURITE_DEFAULT_STORAGE_ACCOUNT_NAME: &str = "devstoreaccount1";
const AZURITE_DEFAULT_STORAGE_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const AZURITE_DEFAULT_BLOB_URI: &str = "http://127.0.0.1:10000";

/// Parses an [Azure connection string][1] for the blob service.
///
/// [1]: https://learn.microsoft.com/en-us/azure/storage/common/storage-configure-connection-string
pub(crate) fn parse(conn_str: &str) -> Result<Config> {
    let key_values = parse_into_key_values(conn_str)?;

    if key_values.get("UseDevelopmentStorage").map(String::as_str) == Some("true") {
        return Ok(development_config(&key_values));
    }

    Ok(Config {
        account_name: key_values.get("AccountName").cloned(),
        account_key: key_values.get("AccountKey").cloned(),
        endpoint: collect_endpoint(&key_values)?,
        ..Default::default()
    })
}

fn parse_into_key_values(conn_str: &str) -> Result<HashMap<String, String>> {
    conn_str
        .trim()
        .replace('\n', "")
        .split(';')
        .filter(|&field| !field.trim().is_empty())
        .map(|field| {
            let (key, value) = field.trim().split_once('=').ok_or_else(|| {
                Error::config_invalid(format!(
                    "invalid connection string, expected '=' in field: {field}"
                ))
            })?;
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

fn development_config(key_values: &HashMap<String, String>) -> Config {
    let account_name = key_values
        .get("AccountName")
        .cloned()
        .unwrap_or(AZURITE_DEFAULT_STORAGE_ACCOUNT_NAME.to_string());
    let account_key = key_values
        .get("AccountKey")
        .cloned()
        .unwrap_or(AZURITE_DEFAULT_STORAGE_ACCOUNT_KEY.to_string());
    let development_proxy_uri = key_values
        .get("DevelopmentStorageProxyUri")
        .cloned()
        .unwrap_or(AZURITE_DEFAULT_BLOB_URI.to_string());

    Config {
        endpoint: Some(format!("{development_proxy_uri}/{account_name}")),
        account_name: Some(account_name),
        account_key: Some(account_key),
        ..Default::default()
    }
}

/// Users are still able to supply an endpoint later, so it isn't enforced here.
fn collect_endpoint(key_values: &HashMap<String, String>) -> Result<Option<String>> {
    if let Some(endpoint) = key_values.get("BlobEndpoint") {
        return Ok(Some(endpoint.clone()));
    }

    let (account_name, endpoint_suffix) = match (
        key_values.get("AccountName"),
        key_values.get("EndpointSuffix"),
    ) {
        (Some(name), Some(suffix)) => (name, suffix),
        _ => return Ok(None),
    };

    let protocol = key_values
        .get("DefaultEndpointsProtocol")
        .map(String::as_str)
        .unwrap_or("https");
    if protocol != "http" && protocol != "https" {
        return Err(Error::config_invalid(format!(
            "invalid DefaultEndpointsProtocol: {protocol}"
        )));
    }

    Ok(Some(format!(
        "{protocol}://{account_name}.blob.{endpoint_suffix}"
    )))
}
