//! Harness configuration.
//!
//! Loads [`HarnessConfig`] from an optional TOML file with environment
//! variable overrides via `CLCONF_*` prefixed variables. With no file and no
//! overrides a run targets device 0 of platform 0, any device type.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Seed used when nothing overrides it, so reruns reproduce failures.
pub const DEFAULT_SEED: u64 = 0x5eed_c1c0;

/// Which compute backend executes the kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Software device that executes kernels on the host.
    Host,
    /// Real OpenCL driver through the ICD loader.
    OpenCl,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::OpenCl => write!(f, "opencl"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "host" => Ok(Self::Host),
            "opencl" => Ok(Self::OpenCl),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Device type filter applied during device enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    All,
    Gpu,
    Cpu,
    Accelerator,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Gpu => write!(f, "gpu"),
            Self::Cpu => write!(f, "cpu"),
            Self::Accelerator => write!(f, "accelerator"),
        }
    }
}

impl std::str::FromStr for DeviceKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "gpu" => Ok(Self::Gpu),
            "cpu" => Ok(Self::Cpu),
            "accelerator" => Ok(Self::Accelerator),
            other => Err(format!("unknown device type: {other}")),
        }
    }
}

/// Harness configuration loaded from TOML with environment variable overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Seed for the input generator.
    /// Override: `CLCONF_SEED`
    pub seed: u64,

    /// Backend executing the kernels.
    /// Override: `CLCONF_BACKEND`
    pub backend: BackendKind,

    /// Zero-based platform index.
    /// Override: `CLCONF_PLATFORM_INDEX`
    pub platform_index: usize,

    /// Zero-based device index within the platform.
    /// Override: `CLCONF_DEVICE_INDEX`
    pub device_index: usize,

    /// Device type filter.
    /// Override: `CLCONF_DEVICE_TYPE`
    pub device_type: DeviceKind,

    /// Local work-group size hint; `None` lets the driver pick. In TOML and
    /// in the override, `"auto"` stands for `None`.
    /// Override: `CLCONF_LOCAL_WORK_SIZE` (a number or `auto`)
    #[serde(with = "local_size")]
    pub local_work_size: Option<usize>,

    /// Exit 0 even when mismatches were reported (only fatal errors fail).
    /// Override: `CLCONF_LENIENT_EXIT`
    pub lenient_exit: bool,
}

fn default_backend() -> BackendKind {
    if cfg!(feature = "opencl") { BackendKind::OpenCl } else { BackendKind::Host }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            backend: default_backend(),
            platform_index: 0,
            device_index: 0,
            device_type: DeviceKind::All,
            local_work_size: Some(1),
            lenient_exit: false,
        }
    }
}

/// `local_work_size` as either a number or `"auto"`, since TOML has no null.
mod local_size {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Fixed(usize),
        Named(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(n) => Repr::Fixed(*n),
            None => Repr::Named("auto".into()),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Fixed(n) => Ok(Some(n)),
            Repr::Named(name) if name.eq_ignore_ascii_case("auto") => Ok(None),
            Repr::Named(other) => Err(D::Error::custom(format!(
                "local_work_size must be a number or \"auto\", got \"{other}\""
            ))),
        }
    }
}

/// Errors that can occur when loading or validating a [`HarnessConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid environment override {key}={value}: {reason}")]
    EnvOverride { key: String, value: String, reason: String },
}

impl HarnessConfig {
    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load from a TOML string, then apply environment overrides.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut cfg: HarnessConfig = toml::from_str(toml_str)?;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load only from environment variables, starting from defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.local_work_size == Some(0) {
            return Err(ConfigError::Validation("local_work_size must be > 0".into()));
        }
        Ok(())
    }

    /// Apply `CLCONF_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("CLCONF_SEED") {
            self.seed = parse_seed(&val).map_err(|reason| ConfigError::EnvOverride {
                key: "CLCONF_SEED".into(),
                value: val.clone(),
                reason,
            })?;
        }

        if let Some(val) = lookup("CLCONF_BACKEND") {
            self.backend = val.parse::<BackendKind>().map_err(|reason| {
                ConfigError::EnvOverride { key: "CLCONF_BACKEND".into(), value: val.clone(), reason }
            })?;
        }

        if let Some(val) = lookup("CLCONF_PLATFORM_INDEX") {
            self.platform_index = val.parse::<usize>().map_err(|e| ConfigError::EnvOverride {
                key: "CLCONF_PLATFORM_INDEX".into(),
                value: val.clone(),
                reason: e.to_string(),
            })?;
        }

        if let Some(val) = lookup("CLCONF_DEVICE_INDEX") {
            self.device_index = val.parse::<usize>().map_err(|e| ConfigError::EnvOverride {
                key: "CLCONF_DEVICE_INDEX".into(),
                value: val.clone(),
                reason: e.to_string(),
            })?;
        }

        if let Some(val) = lookup("CLCONF_DEVICE_TYPE") {
            self.device_type = val.parse::<DeviceKind>().map_err(|reason| {
                ConfigError::EnvOverride {
                    key: "CLCONF_DEVICE_TYPE".into(),
                    value: val.clone(),
                    reason,
                }
            })?;
        }

        if let Some(val) = lookup("CLCONF_LOCAL_WORK_SIZE") {
            self.local_work_size = if val.eq_ignore_ascii_case("auto") {
                None
            } else {
                Some(val.parse::<usize>().map_err(|e| ConfigError::EnvOverride {
                    key: "CLCONF_LOCAL_WORK_SIZE".into(),
                    value: val.clone(),
                    reason: e.to_string(),
                })?)
            };
        }

        if let Some(val) = lookup("CLCONF_LENIENT_EXIT") {
            self.lenient_exit = matches!(val.as_str(), "1" | "true" | "yes");
        }

        Ok(())
    }
}

/// Parse a seed in decimal or `0x`-prefixed hexadecimal.
pub fn parse_seed(s: &str) -> Result<u64, String> {
    let trimmed = s.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|e| e.to_string())
}
