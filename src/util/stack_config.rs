// External imports
use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

// Internal imports
use crate::error::ConvRecurrentError;
use crate::recurrent::{check_nonzero, same_padding};
use crate::util::weight_init::WeightInit;

/// Configuration shared by every layer of a convolutional recurrent stack.
///
/// The record is plain data: runners copy what they need out of it at construction
/// time, so changing a config afterwards never affects an existing model.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StackConfig {
    /// Spatial shape `[height, width]` of every hidden state
    pub shape: [usize; 2],
    /// Channels of the input frames fed to the first layer
    pub input_channels: usize,
    /// Height and width of every recurrent convolution kernel (odd)
    pub filter_size: usize,
    /// Hidden channels per layer, bottom layer first
    pub hidden_channels: Vec<usize>,
    pub num_layers: usize,
    #[serde(default)]
    pub weight_init: WeightInit,
}

impl StackConfig {
    pub fn new(
        shape: [usize; 2],
        input_channels: usize,
        filter_size: usize,
        hidden_channels: Vec<usize>,
        num_layers: usize,
    ) -> Self {
        Self {
            shape,
            input_channels,
            filter_size,
            hidden_channels,
            num_layers,
            weight_init: WeightInit::default(),
        }
    }

    pub fn with_weight_init(mut self, weight_init: WeightInit) -> Self {
        self.weight_init = weight_init;
        self
    }

    /// Check every structural invariant of the stack
    pub fn validate(&self) -> Result<(), ConvRecurrentError> {
        same_padding(self.filter_size)?;
        check_nonzero("input channels", self.input_channels)?;
        check_nonzero("height", self.shape[0])?;
        check_nonzero("width", self.shape[1])?;

        if self.num_layers == 0 {
            return Err(ConvRecurrentError::EmptyStack);
        }
        if self.hidden_channels.len() != self.num_layers {
            return Err(ConvRecurrentError::LayerCountMismatch {
                expected: self.num_layers,
                actual: self.hidden_channels.len(),
            });
        }
        for &channels in &self.hidden_channels {
            check_nonzero("hidden channels", channels)?;
        }
        Ok(())
    }

    /// Padding that keeps the spatial shape unchanged through each recurrent convolution
    pub fn padding(&self) -> Result<usize, ConvRecurrentError> {
        same_padding(self.filter_size)
    }

    /// Input channels consumed by `layer`: the frame channels for the bottom layer,
    /// the hidden channels of the layer below otherwise. `None` past the top layer.
    pub fn layer_input_channels(&self, layer: usize) -> Option<usize> {
        if layer >= self.hidden_channels.len() {
            return None;
        }
        match layer {
            0 => Some(self.input_channels),
            _ => self.hidden_channels.get(layer - 1).copied(),
        }
    }

    /// Hidden channels of the top layer, which feed the output projection
    pub fn output_channels(&self) -> Option<usize> {
        self.hidden_channels.last().copied()
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), json).context("Failed to write config file")?;
        info!("Stack config saved to: {}", path.as_ref().display());
        Ok(())
    }

    /// Read and validate a configuration written by [`StackConfig::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: StackConfig =
            serde_json::from_str(&json).context("Failed to parse config")?;
        config.validate().context("Invalid stack config")?;
        info!("Stack config loaded from: {}", path.as_ref().display());
        Ok(config)
    }
}
