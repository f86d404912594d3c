// External imports
use burn::module::Param;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::Initializer;
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

// Internal imports
use crate::constants::{DEFAULT_WEIGHT_MEAN, DEFAULT_WEIGHT_STD};

/// Initialization scheme applied to every convolution of a cell, decoder or stack.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum WeightInit {
    /// Burn's default Kaiming-uniform scheme for both kernel and bias.
    Framework,
    /// Kernel drawn from a normal distribution, bias set to zero.
    Normal { mean: f64, std: f64 },
    /// Kernel and bias all zero. Handy for reproducible fixtures.
    Zeros,
}

impl Default for WeightInit {
    fn default() -> Self {
        WeightInit::Normal {
            mean: DEFAULT_WEIGHT_MEAN,
            std: DEFAULT_WEIGHT_STD,
        }
    }
}

/// Build a 2D convolution from `config` using the requested scheme
pub fn init_conv2d<B: Backend>(
    config: Conv2dConfig,
    init: WeightInit,
    device: &B::Device,
) -> Conv2d<B> {
    match init {
        WeightInit::Framework => config.init(device),
        WeightInit::Normal { mean, std } => {
            let conv = config
                .with_initializer(Initializer::Normal { mean, std })
                .init(device);
            zero_bias(conv)
        }
        WeightInit::Zeros => config.with_initializer(Initializer::Zeros).init(device),
    }
}

/// Replace the bias of `conv` (if any) with zeros, keeping the kernel untouched
pub fn zero_bias<B: Backend>(mut conv: Conv2d<B>) -> Conv2d<B> {
    conv.bias = conv
        .bias
        .take()
        .map(|bias| Param::from_tensor(bias.val().zeros_like()));
    conv
}
