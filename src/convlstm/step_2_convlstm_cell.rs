// External imports
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::PaddingConfig2d;
use burn::tensor::{activation, backend::Backend, Tensor};

// Internal imports
use crate::constants::LSTM_GATE_COUNT;
use crate::error::Result;
use crate::recurrent::{check_nonzero, check_state_map, check_step, same_padding, RecurrentCell};
use crate::util::weight_init::{init_conv2d, WeightInit};

/// # Convolutional LSTM Cell
///
/// An LSTM whose input-to-state and state-to-state transitions are convolutions, so
/// the hidden state keeps the spatial layout of the input frames.
///
/// ## Mathematical Representation
///
/// For input map x_t and previous state (h_(t-1), c_(t-1)):
///
/// 1. Gates: [i, f, o, g] = split(W * [x_t, h_(t-1)] + b)
/// 2. Memory: c_t = σ(f) ∘ c_(t-1) + σ(i) ∘ tanh(g)
/// 3. Hidden: h_t = σ(o) ∘ tanh(c_t)
///
/// Where:
/// - `*` is a stride-1 convolution padded to keep height and width
/// - σ is the sigmoid function
/// - ∘ denotes element-wise multiplication
#[derive(Module, Debug)]
pub struct ConvLstmCell<B: Backend> {
    height: usize,
    width: usize,
    input_channels: usize,
    hidden_channels: usize,
    filter_size: usize,

    // Maps [input, hidden] to the four stacked gates
    pub(crate) conv: Conv2d<B>,
}

/// Hidden and memory maps carried between timesteps, each `[batch, hidden, height, width]`
#[derive(Clone, Debug)]
pub struct ConvLstmState<B: Backend> {
    pub hidden: Tensor<B, 4>,
    pub memory: Tensor<B, 4>,
}

/// Pre-activation gate maps, in the order they are split off the convolution output
#[derive(Clone, Debug)]
pub struct ConvLstmGates<B: Backend> {
    pub input: Tensor<B, 4>,
    pub forget: Tensor<B, 4>,
    pub output: Tensor<B, 4>,
    pub candidate: Tensor<B, 4>,
}

impl<B: Backend> ConvLstmCell<B> {
    /// Create a new ConvLSTM cell
    ///
    /// # Arguments
    ///
    /// * `shape` - Spatial shape `[height, width]` of the hidden state
    /// * `input_channels` - Channels of the input map
    /// * `filter_size` - Kernel height and width, must be odd
    /// * `hidden_channels` - Channels of the hidden and memory maps
    /// * `weight_init` - Initialization scheme for the gate convolution
    /// * `device` - The device to allocate tensors on
    pub fn new(
        shape: [usize; 2],
        input_channels: usize,
        filter_size: usize,
        hidden_channels: usize,
        weight_init: WeightInit,
        device: &B::Device,
    ) -> Result<Self> {
        let padding = same_padding(filter_size)?;
        check_nonzero("input channels", input_channels)?;
        check_nonzero("hidden channels", hidden_channels)?;
        check_nonzero("height", shape[0])?;
        check_nonzero("width", shape[1])?;

        let conv_config = Conv2dConfig::new(
            [input_channels + hidden_channels, LSTM_GATE_COUNT * hidden_channels],
            [filter_size, filter_size],
        )
        .with_padding(PaddingConfig2d::Explicit(padding, padding));
        let conv = init_conv2d(conv_config, weight_init, device);

        Ok(Self {
            height: shape[0],
            width: shape[1],
            input_channels,
            hidden_channels,
            filter_size,
            conv,
        })
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.height, self.width]
    }

    pub fn input_channels(&self) -> usize {
        self.input_channels
    }

    pub fn hidden_channels(&self) -> usize {
        self.hidden_channels
    }

    pub fn filter_size(&self) -> usize {
        self.filter_size
    }

    pub fn padding(&self) -> usize {
        (self.filter_size - 1) / 2
    }

    /// Compute the four pre-activation gate maps for one timestep
    pub fn gates(&self, input: Tensor<B, 4>, hidden: Tensor<B, 4>) -> Result<ConvLstmGates<B>> {
        check_step(
            input.dims(),
            hidden.dims(),
            self.input_channels,
            self.hidden_channels,
            self.shape(),
        )?;

        // Concatenate along channels, then split the stacked gates back apart
        let combined = Tensor::cat(vec![input, hidden], 1);
        let gates = self.conv.forward(combined);
        let hc = self.hidden_channels;

        Ok(ConvLstmGates {
            input: gates.clone().narrow(1, 0, hc),
            forget: gates.clone().narrow(1, hc, hc),
            output: gates.clone().narrow(1, 2 * hc, hc),
            candidate: gates.narrow(1, 3 * hc, hc),
        })
    }

    /// Advance the cell by one timestep
    ///
    /// # Arguments
    ///
    /// * `input` - Input map of shape `[batch, input_channels, height, width]`
    /// * `state` - Previous hidden and memory maps
    ///
    /// # Returns
    ///
    /// The next hidden and memory maps
    pub fn forward(&self, input: Tensor<B, 4>, state: ConvLstmState<B>) -> Result<ConvLstmState<B>> {
        let ConvLstmState { hidden, memory } = state;
        let batch_size = input.dims()[0];
        let gates = self.gates(input, hidden)?;
        check_state_map(
            "memory state",
            batch_size,
            memory.dims(),
            self.hidden_channels,
            self.shape(),
        )?;

        let i = activation::sigmoid(gates.input);
        let f = activation::sigmoid(gates.forget);
        let o = activation::sigmoid(gates.output);
        let g = activation::tanh(gates.candidate);

        let memory = f * memory + i * g;
        let hidden = o * activation::tanh(memory.clone());

        Ok(ConvLstmState { hidden, memory })
    }

    /// Zero hidden and memory maps for `batch_size` sequences
    pub fn init_hidden(&self, batch_size: usize) -> ConvLstmState<B> {
        let device = self.conv.weight.device();
        let dims = [batch_size, self.hidden_channels, self.height, self.width];

        ConvLstmState {
            hidden: Tensor::zeros(dims, &device),
            memory: Tensor::zeros(dims, &device),
        }
    }
}

impl<B: Backend> RecurrentCell<B> for ConvLstmCell<B> {
    type State = ConvLstmState<B>;

    fn input_channels(&self) -> usize {
        self.input_channels
    }

    fn hidden_channels(&self) -> usize {
        self.hidden_channels
    }

    fn shape(&self) -> [usize; 2] {
        [self.height, self.width]
    }

    fn init_hidden(&self, batch_size: usize) -> Self::State {
        ConvLstmCell::init_hidden(self, batch_size)
    }

    fn forward(&self, input: Tensor<B, 4>, state: Self::State) -> Result<Self::State> {
        ConvLstmCell::forward(self, input, state)
    }

    fn output(state: &Self::State) -> Tensor<B, 4> {
        state.hidden.clone()
    }
}
