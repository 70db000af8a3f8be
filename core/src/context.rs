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

//! Environment lookup for gateway configuration.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Context carries the environment that configuration is loaded from.
///
/// A fresh context sees no variables at all. Attach [`OsEnv`] to read the
/// process environment, or [`StaticEnv`] to pin values in tests.
///
/// ```
/// use blobsas_core::{Context, OsEnv};
///
/// let ctx = Context::new().with_env(OsEnv);
/// let _ = ctx.env_var("AZURE_STORAGE_CONNECTION_STRING");
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    env: Arc<dyn Env>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a context without any environment variable.
    pub fn new() -> Self {
        Self {
            env: Arc::new(NoEnv),
        }
    }

    /// Read variables from `env` from now on.
    pub fn with_env(mut self, env: impl Env) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Look up a variable, `None` if it is unset or not valid utf-8.
    #[inline]
    pub fn env_var(&self, key: &str) -> Option<String> {
        self.env.var(key)
    }
}

/// Env is a source of environment variables.
pub trait Env: Debug + Send + Sync + 'static {
    /// Look up a variable, `None` if it is unset or not valid utf-8.
    fn var(&self, key: &str) -> Option<String>;
}

/// The environment of the current process.
#[derive(Debug, Copy, Clone)]
pub struct OsEnv;

impl Env for OsEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var_os(key)?.into_string().ok()
    }
}

/// A fixed set of variables.
#[derive(Debug, Clone, Default)]
pub struct StaticEnv {
    /// Variables visible through this env.
    pub envs: HashMap<String, String>,
}

impl Env for StaticEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.envs.get(key).cloned()
    }
}

#[derive(Debug)]
struct NoEnv;

impl Env for NoEnv {
    fn var(&self, _: &str) -> Option<String> {
        None
    }
}
