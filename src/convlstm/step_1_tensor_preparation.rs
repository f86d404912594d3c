// External imports
use burn::tensor::{backend::Backend, Tensor};

// Internal imports
use crate::error::{ConvRecurrentError, Result};

/// Reorder a `[batch, time, channels, height, width]` sequence to time-major
/// `[time, batch, channels, height, width]`
pub fn to_time_major<B: Backend>(sequence: Tensor<B, 5>) -> Tensor<B, 5> {
    sequence.swap_dims(0, 1)
}

/// Split a time-major sequence into one `[batch, channels, height, width]` map per
/// timestep, in time order
pub fn split_timesteps<B: Backend>(time_major: Tensor<B, 5>) -> Vec<Tensor<B, 4>> {
    let [seq_len, batch_size, channels, height, width] = time_major.dims();

    (0..seq_len)
        .map(|t| {
            time_major
                .clone()
                .narrow(0, t, 1)
                .reshape([batch_size, channels, height, width])
        })
        .collect()
}

/// Validate a batch-major sequence against the stack's input layout
///
/// # Arguments
///
/// * `dims` - Dimensions of the `[batch, time, channels, height, width]` sequence
/// * `channels` - Channels expected by the bottom layer
/// * `shape` - Spatial shape `[height, width]` of the stack
pub fn check_sequence(dims: [usize; 5], channels: usize, shape: [usize; 2]) -> Result<()> {
    if dims[1] == 0 {
        return Err(ConvRecurrentError::EmptySequence);
    }
    if dims[2] != channels {
        return Err(ConvRecurrentError::ChannelMismatch {
            what: "input sequence",
            expected: channels,
            actual: dims[2],
        });
    }
    if [dims[3], dims[4]] != shape {
        return Err(ConvRecurrentError::ShapeMismatch {
            what: "input sequence",
            expected: shape.to_vec(),
            actual: vec![dims[3], dims[4]],
        });
    }
    Ok(())
}

/// Validate, reorder and split a batch-major sequence into per-timestep frames
pub fn prepare_sequence<B: Backend>(
    sequence: Tensor<B, 5>,
    channels: usize,
    shape: [usize; 2],
) -> Result<Vec<Tensor<B, 4>>> {
    check_sequence(sequence.dims(), channels, shape)?;
    Ok(split_timesteps(to_time_major(sequence)))
}

/// Stack per-timestep prediction maps back into a batch-major
/// `[batch, time, channels, height, width]` tensor
pub fn stack_predictions<B: Backend>(predictions: Vec<Tensor<B, 4>>) -> Result<Tensor<B, 5>> {
    if predictions.is_empty() {
        return Err(ConvRecurrentError::EmptySequence);
    }
    Ok(Tensor::stack(predictions, 1))
}
