//! RAII guard restoring an environment variable on drop.
//!
//! Tests that touch the process environment must also be `#[serial]`.

use std::env;

/// Every variable the harness reads from the environment.
pub const CLCONF_KEYS: [&str; 7] = [
    "CLCONF_SEED",
    "CLCONF_BACKEND",
    "CLCONF_PLATFORM_INDEX",
    "CLCONF_DEVICE_INDEX",
    "CLCONF_DEVICE_TYPE",
    "CLCONF_LOCAL_WORK_SIZE",
    "CLCONF_LENIENT_EXIT",
];

pub struct EnvVarGuard {
    key: String,
    old: Option<String>,
}

impl EnvVarGuard {
    /// Capture the current value of `key`.
    pub fn new(key: &str) -> Self {
        Self { key: key.to_string(), old: env::var(key).ok() }
    }

    /// Capture `key`, then remove it.
    pub fn clear(key: &str) -> Self {
        let guard = Self::new(key);
        unsafe {
            env::remove_var(key);
        }
        guard
    }

    /// Capture `key`, then set it to `val`.
    pub fn set_to(key: &str, val: &str) -> Self {
        let guard = Self::new(key);
        guard.set(val);
        guard
    }

    pub fn set(&self, val: &str) {
        unsafe {
            env::set_var(&self.key, val);
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        unsafe {
            match &self.old {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }
}

/// Clear every `CLCONF_*` variable for the lifetime of the returned guards.
pub fn clean_env() -> Vec<EnvVarGuard> {
    CLCONF_KEYS.iter().map(|key| EnvVarGuard::clear(key)).collect()
}
