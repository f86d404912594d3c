// External imports
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::PaddingConfig2d;
use burn::tensor::{activation, backend::Backend, Tensor};

// Internal imports
use crate::constants::GRU_GATE_COUNT;
use crate::error::Result;
use crate::recurrent::{check_nonzero, check_step, same_padding, RecurrentCell};
use crate::util::weight_init::{init_conv2d, WeightInit};

/// # Convolutional GRU Cell
///
/// A GRU whose transitions are convolutions over `[batch, channels, height, width]`
/// maps. Like the dense GRU it keeps a single hidden map and no separate memory.
///
/// ## Mathematical Representation
///
/// For input map x_t and previous hidden map h_(t-1):
///
/// 1. Gates: [z, r] = σ(split(W_g * [x_t, h_(t-1)] + b_g))
/// 2. Candidate: n_t = tanh(W_n * [x_t, r ∘ h_(t-1)] + b_n)
/// 3. Hidden: h_t = (1 - z) ∘ h_(t-1) + z ∘ n_t
///
/// Note that z weights the candidate here, not the previous state.
#[derive(Module, Debug)]
pub struct ConvGruCell<B: Backend> {
    height: usize,
    width: usize,
    input_channels: usize,
    hidden_channels: usize,
    filter_size: usize,

    // [input, hidden] -> [update, reset]
    pub(crate) gate_conv: Conv2d<B>,
    // [input, reset * hidden] -> candidate
    pub(crate) candidate_conv: Conv2d<B>,
}

/// Pre-activation update and reset gate maps
#[derive(Clone, Debug)]
pub struct ConvGruGates<B: Backend> {
    pub update: Tensor<B, 4>,
    pub reset: Tensor<B, 4>,
}

impl<B: Backend> ConvGruCell<B> {
    /// Create a new ConvGRU cell
    ///
    /// # Arguments
    ///
    /// * `shape` - Spatial shape `[height, width]` of the hidden state
    /// * `input_channels` - Channels of the input map
    /// * `filter_size` - Kernel height and width, must be odd
    /// * `hidden_channels` - Channels of the hidden map
    /// * `weight_init` - Initialization scheme for both convolutions
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

        let combined_channels = input_channels + hidden_channels;
        let kernel = [filter_size, filter_size];
        let same = PaddingConfig2d::Explicit(padding, padding);

        let gate_config =
            Conv2dConfig::new([combined_channels, GRU_GATE_COUNT * hidden_channels], kernel)
                .with_padding(same.clone());
        let candidate_config =
            Conv2dConfig::new([combined_channels, hidden_channels], kernel).with_padding(same);

        Ok(Self {
            height: shape[0],
            width: shape[1],
            input_channels,
            hidden_channels,
            filter_size,
            gate_conv: init_conv2d(gate_config, weight_init, device),
            candidate_conv: init_conv2d(candidate_config, weight_init, device),
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

    /// Compute the pre-activation update and reset gates for one timestep
    pub fn gates(&self, input: Tensor<B, 4>, hidden: Tensor<B, 4>) -> Result<ConvGruGates<B>> {
        check_step(
            input.dims(),
            hidden.dims(),
            self.input_channels,
            self.hidden_channels,
            self.shape(),
        )?;

        let gates = self.gate_conv.forward(Tensor::cat(vec![input, hidden], 1));
        let hc = self.hidden_channels;

        Ok(ConvGruGates {
            update: gates.clone().narrow(1, 0, hc),
            reset: gates.narrow(1, hc, hc),
        })
    }

    /// Advance the cell by one timestep
    ///
    /// # Arguments
    ///
    /// * `input` - Input map of shape `[batch, input_channels, height, width]`
    /// * `hidden` - Previous hidden map of shape `[batch, hidden_channels, height, width]`
    ///
    /// # Returns
    ///
    /// The next hidden map
    pub fn forward(&self, input: Tensor<B, 4>, hidden: Tensor<B, 4>) -> Result<Tensor<B, 4>> {
        let gates = self.gates(input.clone(), hidden.clone())?;
        let z = activation::sigmoid(gates.update);
        let r = activation::sigmoid(gates.reset);

        let reset_hidden = r * hidden.clone();
        let candidate = activation::tanh(
            self.candidate_conv
                .forward(Tensor::cat(vec![input, reset_hidden], 1)),
        );

        // h = (1 - z) * h_prev + z * candidate
        Ok((Tensor::ones_like(&z) - z.clone()) * hidden + z * candidate)
    }

    /// Zero hidden map for `batch_size` sequences
    pub fn init_hidden(&self, batch_size: usize) -> Tensor<B, 4> {
        let device = self.gate_conv.weight.device();
        Tensor::zeros(
            [batch_size, self.hidden_channels, self.height, self.width],
            &device,
        )
    }
}

impl<B: Backend> RecurrentCell<B> for ConvGruCell<B> {
    type State = Tensor<B, 4>;

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
        ConvGruCell::init_hidden(self, batch_size)
    }

    fn forward(&self, input: Tensor<B, 4>, state: Self::State) -> Result<Self::State> {
        ConvGruCell::forward(self, input, state)
    }

    fn output(state: &Self::State) -> Tensor<B, 4> {
        state.clone()
    }
}
