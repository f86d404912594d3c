// Re-export tensor preparation functionality from the ConvLSTM implementation
// since ConvGRU consumes the same sequence layout
pub use crate::convlstm::step_1_tensor_preparation::*;
