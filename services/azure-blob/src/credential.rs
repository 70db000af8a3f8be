// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use blobsas_core::hash::base64_decode;
use blobsas_core::utils::Redact;
use blobsas_core::{Error, Result};
use std::fmt::{Debug, Formatter};

/// Shared key of a storage account, the secret every SAS is signed with.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Azure storage account name.
    pub account_name: String,
    /// Azure storage account key, base64 encoded.
    pub account_key: String,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("account_name", &self.account_name)
            .field("account_key", &Redact::from(&self.account_key))
            .finish()
    }
}

impl Credential {
    /// Create a new shared key credential.
    pub fn with_shared_key(account_name: &str, account_key: &str) -> Self {
        Self {
            account_name: account_name.to_string(),
            account_key: account_key.to_string(),
        }
    }

    /// Check both name and key are present.
    pub fn is_valid(&self) -> bool {
        !self.account_name.is_empty() && !self.account_key.is_empty()
    }

    /// Decode the account key into the raw HMAC key.
    pub(crate) fn signing_key(&self) -> Result<Vec<u8>> {
        base64_decode(&self.account_key).map_err(|e| {
            Error::config_invalid(format!(
                "account key of {} is not valid base64",
                self.account_name
            ))
            .with_source(e)
        })
    }
}
