//! # ConvLSTM Implementation Module
//!
//! Convolutional LSTM layers for spatio-temporal sequence prediction.
//!
//! ## Module Structure:
//!
//! 1. **step_1_tensor_preparation**: Sequence validation, time-major reordering and frame splitting
//! 2. **step_2_convlstm_cell**: Single-step ConvLSTM cell with hidden and memory maps
//! 3. **step_3_convlstm_model_arch**: Multi-layer stack with the 1x1 + ReLU output projection
pub mod step_1_tensor_preparation;
pub mod step_2_convlstm_cell;
pub mod step_3_convlstm_model_arch;
