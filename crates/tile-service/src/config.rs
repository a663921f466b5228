//! Configuration for layer sessions.

use std::path::Path;

use serde::{Deserialize, Serialize};
use wx_common::{WxError, WxResult};

/// Configuration shared by the sessions of one data service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root URL of the data service tiles.
    pub data_base_url: String,

    /// Number of decoded tiles kept per session.
    pub cache_capacity: usize,

    /// Land/sea mask tile template with `{z}`, `{x}` and `{y}` placeholders.
    pub mask_url: Option<String>,

    /// Deepest zoom the mask tiles are produced for.
    pub mask_depth: u32,

    /// RGBA channel of the mask tiles holding the sea flag (0 = red).
    pub mask_channel: usize,

    /// URL of the serialized sea/land quad-tree.
    pub qtree_url: Option<String>,

    /// Overrides the style's streamline seed spacing when set.
    pub stream_grid_step: Option<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_base_url: "http://localhost:8080/data".to_string(),
            cache_capacity: 256,
            mask_url: None,
            mask_depth: 9,
            mask_channel: 0,
            qtree_url: None,
            stream_grid_step: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("WX_DATA_BASE_URL") {
            config.data_base_url = val;
        }

        if let Ok(val) = std::env::var("WX_CACHE_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                config.cache_capacity = capacity;
            }
        }

        if let Ok(val) = std::env::var("WX_MASK_URL") {
            config.mask_url = Some(val).filter(|v| !v.is_empty());
        }

        if let Ok(val) = std::env::var("WX_MASK_DEPTH") {
            if let Ok(depth) = val.parse() {
                config.mask_depth = depth;
            }
        }

        if let Ok(val) = std::env::var("WX_MASK_CHANNEL") {
            if let Ok(channel) = val.parse() {
                config.mask_channel = channel;
            }
        }

        if let Ok(val) = std::env::var("WX_QTREE_URL") {
            config.qtree_url = Some(val).filter(|v| !v.is_empty());
        }

        config
    }

    /// Parse configuration from YAML; absent keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> WxResult<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> WxResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> WxResult<()> {
        if self.data_base_url.is_empty() {
            return Err(WxError::invalid_config("data_base_url", "must not be empty"));
        }

        if self.cache_capacity == 0 {
            return Err(WxError::invalid_config("cache_capacity", "must be > 0"));
        }

        if self.mask_channel > 3 {
            return Err(WxError::invalid_config(
                "mask_channel",
                format!("must be 0-3, got {}", self.mask_channel),
            ));
        }

        if let Some(template) = &self.mask_url {
            if !["{z}", "{x}", "{y}"].iter().all(|p| template.contains(p)) {
                return Err(WxError::invalid_config(
                    "mask_url",
                    "must contain {z}, {x} and {y} placeholders",
                ));
            }
        }

        if self.stream_grid_step == Some(0) {
            return Err(WxError::invalid_config("stream_grid_step", "must be > 0"));
        }

        Ok(())
    }
}
