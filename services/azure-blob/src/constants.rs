use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;

// Env values used to configure the blob gateway.
pub const AZURE_STORAGE_CONNECTION_STRING: &str = "AZURE_STORAGE_CONNECTION_STRING";
pub const AZBLOB_ENDPOINT: &str = "AZBLOB_ENDPOINT";
pub const AZBLOB_ACCOUNT_KEY: &str = "AZBLOB_ACCOUNT_KEY";
pub const AZBLOB_ACCOUNT_NAME: &str = "AZBLOB_ACCOUNT_NAME";
pub const AZBLOB_MAX_STORED_POLICIES: &str = "AZBLOB_MAX_STORED_POLICIES";

/// Service SAS version we sign with.
///
/// 2018-11-09 is the first version whose string-to-sign carries `signedSnapshotTime`.
pub const SAS_VERSION: &str = "2018-11-09";

// Service SAS query keys.
pub const SAS_VERSION_KEY: &str = "sv";
pub const SAS_RESOURCE_KEY: &str = "sr";
pub const SAS_PERMISSIONS_KEY: &str = "sp";
pub const SAS_START_KEY: &str = "st";
pub const SAS_EXPIRY_KEY: &str = "se";
pub const SAS_IDENTIFIER_KEY: &str = "si";
pub const SAS_SIGNATURE_KEY: &str = "sig";

/// Characters escaped in container and blob names when building a URI.
///
/// `/` is kept since blob names use it as a virtual directory separator.
pub static BLOB_PATH_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');
