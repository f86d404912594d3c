// External imports
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::tensor::{backend::Backend, Tensor};

// Internal imports
use crate::error::{ConvRecurrentError, Result};
use crate::recurrent::check_nonzero;
use crate::util::weight_init::{init_conv2d, WeightInit};

/// Fuses two equally shaped feature maps with a single unpadded convolution
#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    height: usize,
    width: usize,
    input_channels: usize,
    output_channels: usize,
    filter_size: usize,
    pub(crate) conv: Conv2d<B>,
}

impl<B: Backend> Decoder<B> {
    /// Create a new decoder
    ///
    /// # Arguments
    ///
    /// * `shape` - Spatial shape `[height, width]` of the maps being fused
    /// * `input_channels` - Channel count after concatenating both maps
    /// * `filter_size` - Kernel height and width (no padding is applied)
    /// * `output_channels` - Channels of the fused map
    /// * `weight_init` - Initialization scheme for the convolution
    /// * `device` - The device to allocate tensors on
    pub fn new(
        shape: [usize; 2],
        input_channels: usize,
        filter_size: usize,
        output_channels: usize,
        weight_init: WeightInit,
        device: &B::Device,
    ) -> Result<Self> {
        check_nonzero("decoder input channels", input_channels)?;
        check_nonzero("decoder output channels", output_channels)?;
        check_nonzero("height", shape[0])?;
        check_nonzero("width", shape[1])?;
        // The unpadded kernel has to fit inside the map
        if filter_size == 0 || filter_size > shape[0].min(shape[1]) {
            return Err(ConvRecurrentError::InvalidFilterSize(filter_size));
        }

        let config = Conv2dConfig::new(
            [input_channels, output_channels],
            [filter_size, filter_size],
        );

        Ok(Self {
            height: shape[0],
            width: shape[1],
            input_channels,
            output_channels,
            filter_size,
            conv: init_conv2d(config, weight_init, device),
        })
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.height, self.width]
    }

    pub fn input_channels(&self) -> usize {
        self.input_channels
    }

    pub fn output_channels(&self) -> usize {
        self.output_channels
    }

    pub fn filter_size(&self) -> usize {
        self.filter_size
    }

    /// Concatenate `first` and `second` along channels and convolve.
    ///
    /// The output has `output_channels` channels and loses `filter_size - 1` rows
    /// and columns.
    pub fn forward(&self, first: Tensor<B, 4>, second: Tensor<B, 4>) -> Result<Tensor<B, 4>> {
        let (first_dims, second_dims) = (first.dims(), second.dims());
        if first_dims != second_dims {
            return Err(ConvRecurrentError::ShapeMismatch {
                what: "decoder inputs",
                expected: first_dims.to_vec(),
                actual: second_dims.to_vec(),
            });
        }
        if [first_dims[2], first_dims[3]] != self.shape() {
            return Err(ConvRecurrentError::ShapeMismatch {
                what: "decoder input",
                expected: self.shape().to_vec(),
                actual: vec![first_dims[2], first_dims[3]],
            });
        }
        let combined_channels = first_dims[1] + second_dims[1];
        if combined_channels != self.input_channels {
            return Err(ConvRecurrentError::ChannelMismatch {
                what: "decoder input",
                expected: self.input_channels,
                actual: combined_channels,
            });
        }

        Ok(self.conv.forward(Tensor::cat(vec![first, second], 1)))
    }
}
