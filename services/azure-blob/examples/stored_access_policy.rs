use std::sync::Arc;

use anyhow::Result;
use blobsas_azure_blob::{Config, MemoryGateway};
use blobsas_core::time::now;
use blobsas_core::{
    AccessPolicy, Context, OsEnv, Permissions, PolicyStore, ResourceGateway, ResourcePath,
    TokenIssuer,
};
use bytes::Bytes;
use chrono::TimeDelta;

const CONTAINER: &str = "myblockcontainer";
const POLICY_NAME: &str = "myPolicy";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    let _ = env_logger::builder().try_init();

    let ctx = Context::new().with_env(OsEnv);
    let mut config = Config::default().from_env(&ctx)?;
    if config.account_name.is_none() {
        println!("No storage account configured, using the local emulator account");
        println!("Set AZURE_STORAGE_CONNECTION_STRING or AZBLOB_ACCOUNT_NAME and AZBLOB_ACCOUNT_KEY to change it");
        println!();
        config = Config::try_from_connection_string("UseDevelopmentStorage=true")?;
    }

    let gateway = Arc::new(MemoryGateway::from_config(&config)?);
    gateway.ensure_container(CONTAINER).await?;

    let issuer = TokenIssuer::new(gateway.clone());
    let store = PolicyStore::new(gateway.clone(), CONTAINER);

    let container_sas = issuer.issue_inline(
        &ResourcePath::container(CONTAINER),
        &AccessPolicy::new(
            Permissions::write() | Permissions::list(),
            now() + TimeDelta::hours(24),
        ),
    )?;
    println!("Container SAS URI: {container_sas}");

    gateway
        .put_object(
            CONTAINER,
            "blobForSAS.txt",
            Bytes::from(
                "This blob will be accessible to clients via a shared access signature (SAS).",
            ),
        )
        .await?;
    let blob_sas = issuer.issue_inline(
        &ResourcePath::object(CONTAINER, "blobForSAS.txt"),
        &AccessPolicy::new(
            Permissions::read() | Permissions::write(),
            now() + TimeDelta::hours(24),
        )
        .with_start(now() - TimeDelta::minutes(5)),
    )?;
    println!("Blob SAS URI: {blob_sas}");

    store.clear_all().await?;
    store
        .upsert(
            POLICY_NAME,
            AccessPolicy::new(
                Permissions::read() | Permissions::write() | Permissions::list(),
                now() + TimeDelta::hours(24),
            ),
        )
        .await?;

    let container_sas_with_policy =
        issuer.issue_by_policy_name(&ResourcePath::container(CONTAINER), POLICY_NAME)?;
    println!("Container SAS URI using stored access policy: {container_sas_with_policy}");

    gateway
        .put_object(
            CONTAINER,
            "sasblobpolicy.txt",
            Bytes::from("This blob will be accessible to clients via a shared access signature. A stored access policy defines the constraints for the signature."),
        )
        .await?;
    let blob_sas_with_policy = issuer.issue_by_policy_name(
        &ResourcePath::object(CONTAINER, "sasblobpolicy.txt"),
        POLICY_NAME,
    )?;
    println!("Blob SAS URI using stored access policy: {blob_sas_with_policy}");

    Ok(())
}
