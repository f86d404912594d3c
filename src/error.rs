// External imports
use thiserror::Error;

/// Precondition violations raised while building or running a recurrent stack.
///
/// None of these are recoverable: they indicate a mis-shaped tensor or an
/// inconsistent configuration and are reported before any tensor work happens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConvRecurrentError {
    #[error("filter size must be a positive odd integer, got {0}")]
    InvalidFilterSize(usize),

    #[error("{what} must be non-zero")]
    ZeroDimension { what: &'static str },

    #[error("a layer stack needs at least one layer")]
    EmptyStack,

    #[error("stack declares {expected} layers but lists {actual} hidden channel counts")]
    LayerCountMismatch { expected: usize, actual: usize },

    #[error("layer {layer} expects {expected} input channels but the layer below produces {actual}")]
    ChannelChain {
        layer: usize,
        expected: usize,
        actual: usize,
    },

    #[error("layer {layer} uses spatial shape {actual:?}, the stack uses {expected:?}")]
    SpatialMismatch {
        layer: usize,
        expected: [usize; 2],
        actual: [usize; 2],
    },

    #[error("{what}: expected {expected} channels, got {actual}")]
    ChannelMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{what}: expected shape {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("batch size mismatch: input has {input}, hidden state has {state}")]
    BatchMismatch { input: usize, state: usize },

    #[error("expected one hidden state per layer ({expected}), got {actual}")]
    StateCountMismatch { expected: usize, actual: usize },

    #[error("sequence must contain at least one timestep")]
    EmptySequence,
}

pub type Result<T> = std::result::Result<T, ConvRecurrentError>;
