// External imports
use burn::backend::{Autodiff, NdArray};
use burn::module::Param;
use burn::tensor::backend::Backend;
use burn::tensor::{Distribution, Tensor};

// Internal imports
use crate::convgru::step_2_convgru_cell::ConvGruCell;
use crate::convgru::step_2_decoder::Decoder;
use crate::convgru::step_3_convgru_model_arch::ConvGru;
use crate::convlstm::step_3_convlstm_model_arch::ConvLstm;
use crate::error::ConvRecurrentError;
use crate::test::reference::{self, max_abs_diff, values};
use crate::util::stack_config::StackConfig;
use crate::util::weight_init::WeightInit;

type TestBackend = NdArray<f32>;
type TestAutodiffBackend = Autodiff<NdArray<f32>>;

fn device() -> <TestBackend as Backend>::Device {
    Default::default()
}

fn random<const D: usize>(shape: [usize; D]) -> Tensor<TestBackend, D> {
    Tensor::random(shape, Distribution::Uniform(-1.0, 1.0), &device())
}

#[test]
fn test_convgru_cell_forward_pass() {
    let device = device();
    let cell =
        ConvGruCell::<TestBackend>::new([6, 5], 3, 3, 4, WeightInit::Framework, &device).unwrap();

    let next = cell
        .forward(random([2, 3, 6, 5]), cell.init_hidden(2))
        .unwrap();

    assert_eq!(next.dims(), [2, 4, 6, 5]);
    for val in values(next) {
        assert!(!val.is_nan(), "Hidden state contains NaN values");
    }
}

#[test]
fn test_convgru_gate_split() {
    let device = device();
    let cell =
        ConvGruCell::<TestBackend>::new([4, 4], 2, 5, 3, WeightInit::default(), &device).unwrap();

    let gates = cell
        .gates(random([2, 2, 4, 4]), cell.init_hidden(2))
        .unwrap();

    assert_eq!(gates.update.dims(), [2, 3, 4, 4]);
    assert_eq!(gates.reset.dims(), [2, 3, 4, 4]);
    assert_eq!(
        gates.update.dims()[1] + gates.reset.dims()[1],
        cell.gate_conv.weight.dims()[0]
    );
    assert_eq!(cell.candidate_conv.weight.dims(), [3, 5, 5, 5]);
    assert_eq!(cell.padding(), 2);
}

#[test]
fn test_convgru_cell_matches_reference() {
    let device = device();
    let cell =
        ConvGruCell::<TestBackend>::new([4, 5], 2, 3, 3, WeightInit::Framework, &device).unwrap();

    let input = random([2, 2, 4, 5]);
    let hidden = random([2, 3, 4, 5]);

    let (gate_weight, gate_bias) = reference::conv_params(&cell.gate_conv);
    let (candidate_weight, candidate_bias) = reference::conv_params(&cell.candidate_conv);
    let expected = reference::gru_step(
        &reference::to_array4(input.clone()),
        &reference::to_array4(hidden.clone()),
        (&gate_weight, &gate_bias),
        (&candidate_weight, &candidate_bias),
        cell.padding(),
    );

    let next = cell.forward(input, hidden).unwrap();
    let diff = reference::max_abs_diff_arrays(&reference::to_array4(next), &expected);
    assert!(diff < 1e-4, "Hidden differs from reference by {diff}");
}

#[test]
fn test_convgru_update_gate_blends_states() {
    let device = device();
    let mut cell =
        ConvGruCell::<TestBackend>::new([3, 3], 1, 3, 2, WeightInit::Zeros, &device).unwrap();

    // z = sigmoid(0) = 0.5 and the candidate is tanh(b), independent of the input
    let b = 0.8f32;
    cell.candidate_conv.bias = Some(Param::from_tensor(Tensor::full([2], b, &device)));

    let previous = Tensor::<TestBackend, 4>::full([1, 2, 3, 3], 0.4, &device);
    let next = cell.forward(random([1, 1, 3, 3]), previous).unwrap();

    let expected = 0.5 * 0.4 + 0.5 * b.tanh();
    for val in values(next) {
        assert!((val - expected).abs() < 1e-5, "hidden {val} != {expected}");
    }
}

#[test]
fn test_convgru_init_hidden_is_independent() {
    let device = device();
    let cell =
        ConvGruCell::<TestBackend>::new([2, 3], 1, 3, 4, WeightInit::default(), &device).unwrap();

    let first = cell.init_hidden(3);
    let second = cell.init_hidden(3);
    assert_eq!(first.dims(), [3, 4, 2, 3]);
    assert_eq!(first.dims(), second.dims());

    let first = first + 2.0;
    assert!(values(first).iter().all(|v| *v == 2.0));
    assert!(values(second).iter().all(|v| *v == 0.0));
}

#[test]
fn test_convgru_golden_fixture() {
    let device = device();
    let config = StackConfig::new([4, 4], 1, 3, vec![1], 1).with_weight_init(WeightInit::Zeros);
    let model = ConvGru::<TestBackend>::new(&config, &device).unwrap();

    let input = Tensor::<TestBackend, 5>::zeros([2, 3, 1, 4, 4], &device);
    let predictions = model.forward(input, model.init_hidden(2)).unwrap();

    assert_eq!(predictions.len(), 3, "One prediction per timestep");
    for prediction in predictions {
        assert_eq!(prediction.dims(), [2, 1, 4, 4]);
        assert!(values(prediction).iter().all(|v| *v == 0.0));
    }
}

#[test]
fn test_convgru_output_has_no_activation() {
    let device = device();
    let config = StackConfig::new([4, 4], 1, 3, vec![2], 1).with_weight_init(WeightInit::Zeros);
    let mut gru = ConvGru::<TestBackend>::new(&config, &device).unwrap();
    let mut lstm = ConvLstm::<TestBackend>::new(&config, &device).unwrap();

    let negative = || Some(Param::from_tensor(Tensor::full([1], -0.25f32, &device)));
    gru.output.bias = negative();
    lstm.output.bias = negative();

    let input = random([2, 3, 1, 4, 4]);
    let gru_predictions = gru.forward(input.clone(), gru.init_hidden(2)).unwrap();
    let lstm_predictions = lstm.forward(input, lstm.init_hidden(2)).unwrap();

    for (gru_prediction, lstm_prediction) in gru_predictions.into_iter().zip(lstm_predictions) {
        assert!(values(gru_prediction).iter().all(|v| (*v + 0.25).abs() < 1e-6));
        assert!(values(lstm_prediction).iter().all(|v| *v == 0.0));
    }
}

#[test]
fn test_convgru_matches_manual_unroll() {
    let device = device();
    let config =
        StackConfig::new([5, 4], 2, 3, vec![3, 2], 2).with_weight_init(WeightInit::Framework);
    let model = ConvGru::<TestBackend>::new(&config, &device).unwrap();

    let input = random([2, 3, 2, 5, 4]);
    let (predictions, final_state) = model
        .forward_with_state(input.clone(), model.init_hidden(2))
        .unwrap();
    assert_eq!(predictions.len(), 3);

    let mut states = model.init_hidden(2);
    for (t, prediction) in predictions.into_iter().enumerate() {
        let mut frame = input.clone().narrow(1, t, 1).reshape([2, 2, 5, 4]);
        for (layer, cell) in model.cells().iter().enumerate() {
            frame = cell.forward(frame, states[layer].clone()).unwrap();
            states[layer] = frame.clone();
        }
        let diff = max_abs_diff(prediction, model.output.forward(frame));
        assert!(diff < 1e-5, "Prediction {t} differs by {diff}");
    }

    for (manual, returned) in states.into_iter().zip(final_state) {
        assert!(max_abs_diff(manual, returned) < 1e-5);
    }
}

#[test]
fn test_convgru_predict_is_batch_major() {
    let device = device();
    let config = StackConfig::new([3, 4], 2, 3, vec![2], 1).with_weight_init(WeightInit::Framework);
    let model = ConvGru::<TestBackend>::new(&config, &device).unwrap();

    let stacked = model.predict(random([3, 4, 2, 3, 4])).unwrap();
    assert_eq!(stacked.dims(), [3, 4, 1, 3, 4]);
}

#[test]
fn test_convgru_rejects_broken_stacks() {
    let device = device();
    let init = WeightInit::default();
    let first = ConvGruCell::<TestBackend>::new([4, 4], 1, 3, 4, init, &device).unwrap();
    let second = ConvGruCell::<TestBackend>::new([4, 4], 3, 3, 2, init, &device).unwrap();

    let result = ConvGru::from_cells(vec![first, second], init, &device);
    assert_eq!(
        result.unwrap_err(),
        ConvRecurrentError::ChannelChain { layer: 1, expected: 3, actual: 4 }
    );

    let model =
        ConvGru::<TestBackend>::new(&StackConfig::new([4, 4], 1, 3, vec![2], 1), &device).unwrap();
    let batch = model.forward(random([2, 2, 1, 4, 4]), model.init_hidden(1));
    assert_eq!(
        batch.unwrap_err(),
        ConvRecurrentError::BatchMismatch { input: 2, state: 1 }
    );
}

#[test]
fn test_decoder_fuses_two_maps() {
    let device = device();
    let decoder =
        Decoder::<TestBackend>::new([4, 4], 4, 3, 5, WeightInit::Framework, &device).unwrap();

    let fused = decoder
        .forward(random([2, 2, 4, 4]), random([2, 2, 4, 4]))
        .unwrap();
    // No padding: a 3x3 kernel trims one pixel from every border
    assert_eq!(fused.dims(), [2, 5, 2, 2]);
}

#[test]
fn test_decoder_rejects_mismatched_maps() {
    let device = device();
    let decoder =
        Decoder::<TestBackend>::new([4, 4], 2, 1, 1, WeightInit::default(), &device).unwrap();

    let unequal = decoder.forward(random([2, 1, 4, 4]), random([2, 1, 3, 4]));
    assert!(matches!(
        unequal.unwrap_err(),
        ConvRecurrentError::ShapeMismatch { .. }
    ));

    let channels = decoder.forward(random([2, 2, 4, 4]), random([2, 2, 4, 4]));
    assert!(matches!(
        channels.unwrap_err(),
        ConvRecurrentError::ChannelMismatch { expected: 2, actual: 4, .. }
    ));

    let resized = decoder.forward(random([2, 1, 3, 3]), random([2, 1, 3, 3]));
    assert_eq!(
        resized.unwrap_err(),
        ConvRecurrentError::ShapeMismatch {
            what: "decoder input",
            expected: vec![4, 4],
            actual: vec![3, 3]
        }
    );
}

#[test]
fn test_decoder_rejects_invalid_geometry() {
    let device = device();
    let init = WeightInit::default();

    // A 3x3 kernel without padding does not fit a 2x2 map
    let oversized = Decoder::<TestBackend>::new([2, 2], 2, 3, 1, init, &device);
    assert_eq!(
        oversized.unwrap_err(),
        ConvRecurrentError::InvalidFilterSize(3)
    );

    let narrow = Decoder::<TestBackend>::new([5, 2], 2, 3, 1, init, &device);
    assert_eq!(narrow.unwrap_err(), ConvRecurrentError::InvalidFilterSize(3));

    let empty = Decoder::<TestBackend>::new([0, 4], 2, 1, 1, init, &device);
    assert_eq!(
        empty.unwrap_err(),
        ConvRecurrentError::ZeroDimension { what: "height" }
    );

    let zero_filter = Decoder::<TestBackend>::new([4, 4], 2, 0, 1, init, &device);
    assert_eq!(zero_filter.unwrap_err(), ConvRecurrentError::InvalidFilterSize(0));

    let exact = Decoder::<TestBackend>::new([2, 2], 2, 2, 1, init, &device).unwrap();
    let fused = exact
        .forward(random([1, 1, 2, 2]), random([1, 1, 2, 2]))
        .unwrap();
    assert_eq!(fused.dims(), [1, 1, 1, 1]);
}

#[test]
fn test_convgru_carries_inert_decoder() {
    let device = device();
    let config = StackConfig::new([4, 4], 1, 3, vec![3, 2], 2);
    let model = ConvGru::<TestBackend>::new(&config, &device).unwrap();

    let decoder = model.decoder();
    assert_eq!(decoder.input_channels(), 2);
    assert_eq!(decoder.output_channels(), 1);
    assert_eq!(decoder.filter_size(), 1);
    assert_eq!(decoder.shape(), [4, 4]);

    let fused = decoder
        .forward(random([1, 1, 4, 4]), random([1, 1, 4, 4]))
        .unwrap();
    assert_eq!(fused.dims(), [1, 1, 4, 4]);
}

#[test]
fn test_convgru_gradients_flow_through_unroll() {
    let device = Default::default();
    let config =
        StackConfig::new([4, 4], 1, 3, vec![2, 2], 2).with_weight_init(WeightInit::Framework);
    let model = ConvGru::<TestAutodiffBackend>::new(&config, &device).unwrap();
    let weights_before = values(model.cells()[0].gate_conv.weight.val());

    let input = Tensor::<TestAutodiffBackend, 5>::random(
        [2, 3, 1, 4, 4],
        Distribution::Uniform(-1.0, 1.0),
        &device,
    );
    let predictions = model.forward(input, model.init_hidden(2)).unwrap();
    let loss = predictions
        .into_iter()
        .map(|prediction| prediction.sum())
        .reduce(|acc, sum| acc + sum)
        .unwrap();
    let grads = loss.backward();

    for cell in model.cells() {
        assert!(cell.gate_conv.weight.grad(&grads).is_some());
        assert!(cell.candidate_conv.weight.grad(&grads).is_some());
    }
    assert!(model.output.weight.grad(&grads).is_some());
    // The decoder takes no part in the forward pass
    assert!(model.decoder().conv.weight.grad(&grads).is_none());

    // Forward passes never touch the weights
    assert_eq!(weights_before, values(model.cells()[0].gate_conv.weight.val()));
}
