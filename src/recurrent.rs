//! Shared plumbing for convolutional recurrent cells: the cell interface, shape
//! checks and the layer-by-layer unroll used by every stacked runner.

// External imports
use burn::tensor::{backend::Backend, Tensor};

// Internal imports
use crate::error::{ConvRecurrentError, Result};

/// A single-layer, single-timestep recurrent update over feature maps.
pub trait RecurrentCell<B: Backend> {
    /// Carried state between timesteps
    type State: Clone;

    fn input_channels(&self) -> usize;
    fn hidden_channels(&self) -> usize;
    /// Spatial shape `[height, width]` of the hidden state
    fn shape(&self) -> [usize; 2];

    /// Zero-filled state for `batch_size` sequences
    fn init_hidden(&self, batch_size: usize) -> Self::State;

    /// Advance the state by one timestep
    fn forward(&self, input: Tensor<B, 4>, state: Self::State) -> Result<Self::State>;

    /// Feature map the cell emits for the current timestep
    fn output(state: &Self::State) -> Tensor<B, 4>;
}

/// Padding that preserves the spatial shape for a stride-1 convolution
pub fn same_padding(filter_size: usize) -> Result<usize> {
    if filter_size == 0 || filter_size % 2 == 0 {
        return Err(ConvRecurrentError::InvalidFilterSize(filter_size));
    }
    Ok((filter_size - 1) / 2)
}

pub(crate) fn check_nonzero(what: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(ConvRecurrentError::ZeroDimension { what });
    }
    Ok(())
}

/// Check the channel count and spatial shape of a `[batch, channels, height, width]` map
pub(crate) fn check_feature_map(
    what: &'static str,
    dims: [usize; 4],
    channels: usize,
    shape: [usize; 2],
) -> Result<()> {
    if dims[1] != channels {
        return Err(ConvRecurrentError::ChannelMismatch {
            what,
            expected: channels,
            actual: dims[1],
        });
    }
    if [dims[2], dims[3]] != shape {
        return Err(ConvRecurrentError::ShapeMismatch {
            what,
            expected: shape.to_vec(),
            actual: vec![dims[2], dims[3]],
        });
    }
    Ok(())
}

/// Check an input map and a state map for one cell step
pub(crate) fn check_step(
    input: [usize; 4],
    state: [usize; 4],
    input_channels: usize,
    hidden_channels: usize,
    shape: [usize; 2],
) -> Result<()> {
    check_feature_map("cell input", input, input_channels, shape)?;
    check_state_map("hidden state", input[0], state, hidden_channels, shape)
}

/// Check a carried state map against the batch size of the current input
pub(crate) fn check_state_map(
    what: &'static str,
    batch_size: usize,
    state: [usize; 4],
    hidden_channels: usize,
    shape: [usize; 2],
) -> Result<()> {
    if state[0] != batch_size {
        return Err(ConvRecurrentError::BatchMismatch {
            input: batch_size,
            state: state[0],
        });
    }
    check_feature_map(what, state, hidden_channels, shape)
}

/// Verify that a stack of cells chains: every layer consumes what the layer below
/// produces, and all layers share one spatial shape
pub fn validate_stack<B: Backend, C: RecurrentCell<B>>(cells: &[C]) -> Result<()> {
    let first = cells.first().ok_or(ConvRecurrentError::EmptyStack)?;
    let shape = first.shape();

    for (layer, pair) in cells.windows(2).enumerate() {
        let (below, above) = (&pair[0], &pair[1]);
        if above.input_channels() != below.hidden_channels() {
            return Err(ConvRecurrentError::ChannelChain {
                layer: layer + 1,
                expected: above.input_channels(),
                actual: below.hidden_channels(),
            });
        }
        if above.shape() != shape {
            return Err(ConvRecurrentError::SpatialMismatch {
                layer: layer + 1,
                expected: shape,
                actual: above.shape(),
            });
        }
    }
    Ok(())
}

/// Zero-filled state for every layer of a stack, bottom layer first
pub fn init_states<B: Backend, C: RecurrentCell<B>>(
    cells: &[C],
    batch_size: usize,
) -> Vec<C::State> {
    cells.iter().map(|cell| cell.init_hidden(batch_size)).collect()
}

/// Unroll `cells` over a time-ordered list of frames.
///
/// Layers run in order and each one consumes the full output sequence of the layer
/// below. Returns the top layer's per-timestep outputs and every layer's state after
/// the last timestep.
pub fn unroll<B: Backend, C: RecurrentCell<B>>(
    cells: &[C],
    frames: Vec<Tensor<B, 4>>,
    states: Vec<C::State>,
) -> Result<(Vec<Tensor<B, 4>>, Vec<C::State>)> {
    if states.len() != cells.len() {
        return Err(ConvRecurrentError::StateCountMismatch {
            expected: cells.len(),
            actual: states.len(),
        });
    }
    if frames.is_empty() {
        return Err(ConvRecurrentError::EmptySequence);
    }

    let mut layer_input = frames;
    let mut final_states = Vec::with_capacity(cells.len());

    for (cell, mut state) in cells.iter().zip(states) {
        let mut layer_output = Vec::with_capacity(layer_input.len());
        for frame in layer_input {
            state = cell.forward(frame, state)?;
            layer_output.push(C::output(&state));
        }
        final_states.push(state);
        layer_input = layer_output;
    }

    Ok((layer_input, final_states))
}
