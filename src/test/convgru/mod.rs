/// Tests for the ConvGRU implementation
///
/// * Cell forward pass, gate split and agreement with the ndarray reference
/// * Linear output projection (no ReLU, unlike the ConvLSTM stack)
/// * Decoder shape handling and its inert role in the stack
/// * Gradient flow through the full unroll under the autodiff backend
pub mod test_convgru;
