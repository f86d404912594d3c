// External imports
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::tensor::{activation, backend::Backend, Tensor};
use log::debug;

// Internal imports
use super::step_1_tensor_preparation::{prepare_sequence, stack_predictions};
use super::step_2_convlstm_cell::{ConvLstmCell, ConvLstmState};
use crate::constants::{PREDICTION_CHANNELS, PROJECTION_KERNEL_SIZE};
use crate::error::{ConvRecurrentError, Result};
use crate::recurrent::{init_states, unroll, validate_stack};
use crate::util::stack_config::StackConfig;
use crate::util::weight_init::{init_conv2d, WeightInit};

/// Stacked ConvLSTM that unrolls a frame sequence and predicts one single-channel
/// map per timestep.
///
/// Layers are processed bottom-up; each layer runs over the full sequence before
/// the next one starts. The top layer's hidden maps pass through a shared 1x1
/// convolution followed by ReLU.
#[derive(Module, Debug)]
pub struct ConvLstm<B: Backend> {
    height: usize,
    width: usize,
    input_channels: usize,
    filter_size: usize,
    pub(crate) cells: Vec<ConvLstmCell<B>>,
    pub(crate) output: Conv2d<B>,
}

impl<B: Backend> ConvLstm<B> {
    /// Create a new ConvLSTM stack from a validated configuration
    pub fn new(config: &StackConfig, device: &B::Device) -> Result<Self> {
        config.validate()?;

        let cells = config
            .hidden_channels
            .iter()
            .enumerate()
            .map(|(layer, &hidden_channels)| {
                let input_channels = config.layer_input_channels(layer).ok_or(
                    ConvRecurrentError::LayerCountMismatch {
                        expected: config.num_layers,
                        actual: config.hidden_channels.len(),
                    },
                )?;
                ConvLstmCell::new(
                    config.shape,
                    input_channels,
                    config.filter_size,
                    hidden_channels,
                    config.weight_init,
                    device,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_cells(cells, config.weight_init, device)
    }

    /// Assemble a stack from existing cells, bottom layer first.
    ///
    /// Fails if the stack is empty, if a layer's input channels differ from the
    /// hidden channels of the layer below, or if the layers disagree on spatial shape.
    pub fn from_cells(
        cells: Vec<ConvLstmCell<B>>,
        weight_init: WeightInit,
        device: &B::Device,
    ) -> Result<Self> {
        validate_stack::<B, _>(&cells)?;

        let (shape, input_channels, filter_size, top_channels) = {
            let first = &cells[0];
            let top = &cells[cells.len() - 1];
            (
                first.shape(),
                first.input_channels(),
                first.filter_size(),
                top.hidden_channels(),
            )
        };

        let output_config = Conv2dConfig::new(
            [top_channels, PREDICTION_CHANNELS],
            [PROJECTION_KERNEL_SIZE, PROJECTION_KERNEL_SIZE],
        );
        let output = init_conv2d(output_config, weight_init, device);

        debug!(
            "Built ConvLSTM stack: layers={} input_channels={} hidden={:?} filter={} shape={:?}",
            cells.len(),
            input_channels,
            cells.iter().map(|c| c.hidden_channels()).collect::<Vec<_>>(),
            filter_size,
            shape
        );

        Ok(Self {
            height: shape[0],
            width: shape[1],
            input_channels,
            filter_size,
            cells,
            output,
        })
    }

    pub fn num_layers(&self) -> usize {
        self.cells.len()
    }

    /// Hidden channels per layer, bottom layer first
    pub fn hidden_channels(&self) -> Vec<usize> {
        self.cells.iter().map(|cell| cell.hidden_channels()).collect()
    }

    pub fn cells(&self) -> &[ConvLstmCell<B>] {
        &self.cells
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.height, self.width]
    }

    pub fn input_channels(&self) -> usize {
        self.input_channels
    }

    pub fn filter_size(&self) -> usize {
        self.filter_size
    }

    /// One zero-initialized (hidden, memory) pair per layer
    pub fn init_hidden(&self, batch_size: usize) -> Vec<ConvLstmState<B>> {
        init_states::<B, _>(&self.cells, batch_size)
    }

    /// Forward pass over a `[batch, time, channels, height, width]` sequence
    ///
    /// # Returns
    ///
    /// One `[batch, 1, height, width]` prediction per timestep, in time order
    pub fn forward(
        &self,
        sequence: Tensor<B, 5>,
        hidden_state: Vec<ConvLstmState<B>>,
    ) -> Result<Vec<Tensor<B, 4>>> {
        let (predictions, _) = self.forward_with_state(sequence, hidden_state)?;
        Ok(predictions)
    }

    /// Forward pass that also returns every layer's state after the last timestep
    pub fn forward_with_state(
        &self,
        sequence: Tensor<B, 5>,
        hidden_state: Vec<ConvLstmState<B>>,
    ) -> Result<(Vec<Tensor<B, 4>>, Vec<ConvLstmState<B>>)> {
        let [batch_size, timesteps, ..] = sequence.dims();
        debug!("ConvLSTM forward: batch={} timesteps={}", batch_size, timesteps);
        let frames = prepare_sequence(sequence, self.input_channels, self.shape())?;

        let (top_outputs, final_state) = unroll(&self.cells, frames, hidden_state)?;

        let predictions = top_outputs
            .into_iter()
            .map(|hidden| activation::relu(self.output.forward(hidden)))
            .collect();

        Ok((predictions, final_state))
    }

    /// Run the stack from zero state and stack the predictions into a
    /// `[batch, time, 1, height, width]` tensor
    pub fn predict(&self, sequence: Tensor<B, 5>) -> Result<Tensor<B, 5>> {
        let batch_size = sequence.dims()[0];
        let hidden_state = self.init_hidden(batch_size);
        stack_predictions(self.forward(sequence, hidden_state)?)
    }
}
