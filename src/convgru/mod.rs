//! # ConvGRU Implementation Module
//!
//! Convolutional GRU layers. The ConvGRU keeps a single hidden map per layer and
//! needs one convolution fewer per step than the ConvLSTM.
//!
//! ## Module Structure:
//!
//! 1. **step_1_tensor_preparation**: Sequence preparation (re-exported from the ConvLSTM implementation)
//! 2. **step_2_convgru_cell**: Single-step ConvGRU cell with update and reset gates
//! 3. **step_2_decoder**: Two-map fusion convolution owned by the stack
//! 4. **step_3_convgru_model_arch**: Multi-layer stack with the linear 1x1 output projection
pub mod step_1_tensor_preparation;
pub mod step_2_convgru_cell;
pub mod step_2_decoder;
pub mod step_3_convgru_model_arch;
