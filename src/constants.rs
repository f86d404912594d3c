// Gate layout
pub const LSTM_GATE_COUNT: usize = 4; // input, forget, output, candidate
pub const GRU_GATE_COUNT: usize = 2; // update, reset

// Output projection
pub const PREDICTION_CHANNELS: usize = 1; // single-channel prediction map per timestep
pub const PROJECTION_KERNEL_SIZE: usize = 1;

// Decoder defaults used by the GRU stack
pub const DECODER_FILTER_SIZE: usize = 1;
pub const DECODER_OUTPUT_CHANNELS: usize = 1;

// Weight initialization
pub const DEFAULT_WEIGHT_MEAN: f64 = 0.0;
pub const DEFAULT_WEIGHT_STD: f64 = 0.02;
