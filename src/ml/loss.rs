// ============================================================
// Layer 5 — Training Objective
// ============================================================
// total = (1 - aux_ratio) * main + aux_ratio * aux
//
//   main   — token cross-entropy of the last decoder level
//   aux    — depends on the auxiliary loss type:
//              first  → token cross-entropy of the first level,
//                       projected through the shared generator
//              cosine → mean (1 - cos) between first and last
//                       level states over non-pad positions
//
// Pads never contribute to any term.

use burn::{prelude::*, tensor::activation::log_softmax};

use crate::data::batcher::Seq2SeqBatch;
use crate::domain::task::{AuxRatio, AuxType};
use crate::ml::model::Seq2SeqModel;

pub struct LossParts<B: Backend> {
    pub total: Tensor<B, 1>,
    pub main:  Tensor<B, 1>,
    pub aux:   Tensor<B, 1>,
}

/// logits [batch, len, vocab], targets [batch, len] → scalar loss,
/// averaged over non-pad target positions only.
pub fn token_cross_entropy<B: Backend>(
    logits:  Tensor<B, 3>,
    targets: Tensor<B, 2, Int>,
    pad_id:  u32,
) -> Tensor<B, 1> {
    let [batch_size, seq_len, vocab] = logits.dims();
    let rows = batch_size * seq_len;

    let log_probs = log_softmax(logits.reshape([rows, vocab]), 1);
    let targets   = targets.reshape([rows, 1]);
    let keep      = targets.clone().equal_elem(pad_id as i64).bool_not().float();

    let nll = log_probs.gather(1, targets).neg() * keep.clone();
    nll.sum() / keep.sum().clamp_min(1.0)
}

/// Mean cosine distance between two [batch, len, hidden] tensors,
/// skipping positions where `pad_mask` is true.
pub fn cosine_distance<B: Backend>(
    first:    Tensor<B, 3>,
    last:     Tensor<B, 3>,
    pad_mask: Tensor<B, 2, Bool>,
) -> Tensor<B, 1> {
    let [batch_size, seq_len, _] = first.dims();

    let dot   = (first.clone() * last.clone()).sum_dim(2);
    let norms = first.powf_scalar(2.0).sum_dim(2).sqrt() * last.powf_scalar(2.0).sum_dim(2).sqrt();
    let cos   = (dot / norms.clamp_min(1e-8)).reshape([batch_size, seq_len]);

    let keep = pad_mask.bool_not().float();
    let dist = cos.neg().add_scalar(1.0) * keep.clone();
    dist.sum() / keep.sum().clamp_min(1.0)
}

pub fn mix<B: Backend>(main: Tensor<B, 1>, aux: Tensor<B, 1>, ratio: AuxRatio) -> Tensor<B, 1> {
    let r = ratio.value();
    main.mul_scalar(1.0 - r) + aux.mul_scalar(r)
}

pub fn training_loss<B: Backend>(
    model:    &Seq2SeqModel<B>,
    batch:    &Seq2SeqBatch<B>,
    aux_type: AuxType,
    ratio:    AuxRatio,
    pad_id:   u32,
) -> LossParts<B> {
    let output = model.forward(batch);
    let main = token_cross_entropy(output.logits, batch.trg_output.clone(), pad_id);

    let aux = match aux_type {
        AuxType::First => token_cross_entropy(
            model.project(output.states.first),
            batch.trg_output.clone(),
            pad_id,
        ),
        AuxType::Cosine => cosine_distance(
            output.states.first,
            output.states.last,
            batch.trg_pad_mask.clone(),
        ),
    };

    LossParts { total: mix(main.clone(), aux.clone(), ratio), main, aux }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray;

    fn scalar(t: Tensor<TestBackend, 1>) -> f32 {
        t.into_scalar()
    }

    fn states(values: Vec<f32>) -> Tensor<TestBackend, 3> {
        Tensor::from_data(TensorData::new(values, [1, 2, 2]), &Default::default())
    }

    fn no_pad() -> Tensor<TestBackend, 2, Bool> {
        Tensor::from_data(TensorData::new(vec![false, false], [1, 2]), &Default::default())
    }

    #[test]
    fn test_cosine_distance_identical_is_zero() {
        let a = states(vec![1.0, 2.0, 3.0, 4.0]);
        let d = scalar(cosine_distance(a.clone(), a, no_pad()));
        assert!(d.abs() < 1e-5, "got {d}");
    }

    #[test]
    fn test_cosine_distance_opposite_is_two() {
        let a = states(vec![1.0, 0.0, 0.0, 1.0]);
        let b = states(vec![-1.0, 0.0, 0.0, -1.0]);
        let d = scalar(cosine_distance(a, b, no_pad()));
        assert!((d - 2.0).abs() < 1e-5, "got {d}");
    }

    #[test]
    fn test_cosine_distance_ignores_pads() {
        // second position is opposite, but padded
        let a = states(vec![1.0, 0.0, 0.0, 1.0]);
        let b = states(vec![1.0, 0.0, 0.0, -1.0]);
        let mask = Tensor::from_data(TensorData::new(vec![false, true], [1, 2]), &Default::default());
        let d = scalar(cosine_distance(a, b, mask));
        assert!(d.abs() < 1e-5, "got {d}");
    }

    #[test]
    fn test_mix_weights() {
        let device = Default::default();
        let main = Tensor::<TestBackend, 1>::from_floats([2.0], &device);
        let aux  = Tensor::<TestBackend, 1>::from_floats([4.0], &device);

        let at = |r: f64| scalar(mix(main.clone(), aux.clone(), AuxRatio::new(r).unwrap()));
        assert!((at(0.0) - 2.0).abs() < 1e-6);
        assert!((at(1.0) - 4.0).abs() < 1e-6);
        assert!((at(0.25) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_cross_entropy_ignores_padding() {
        let device = Default::default();
        let unpadded = token_cross_entropy(
            Tensor::<TestBackend, 3>::from_floats([[[0.0, 2.0, 0.0]]], &device),
            Tensor::<TestBackend, 2, Int>::from_ints([[1]], &device),
            0,
        );
        let padded = token_cross_entropy(
            Tensor::<TestBackend, 3>::from_floats([[[0.0, 2.0, 0.0], [0.0, 0.0, 0.0]]], &device),
            Tensor::<TestBackend, 2, Int>::from_ints([[1, 0]], &device),
            0,
        );
        let (unpadded, padded) = (scalar(unpadded), scalar(padded));
        // -ln(e^2 / (e^2 + 2))
        assert!((unpadded - 0.239_544_8).abs() < 1e-5, "got {unpadded}");
        assert!((unpadded - padded).abs() < 1e-6, "{unpadded} vs {padded}");
    }

    #[test]
    fn test_cross_entropy_all_pads_is_zero() {
        let device = Default::default();
        let loss = token_cross_entropy(
            Tensor::<TestBackend, 3>::from_floats([[[0.0, 2.0, 0.0]]], &device),
            Tensor::<TestBackend, 2, Int>::from_ints([[0]], &device),
            0,
        );
        assert!(scalar(loss).abs() < 1e-6);
    }

    #[test]
    fn test_cross_entropy_prefers_correct_logits() {
        let device = Default::default();
        let targets = Tensor::<TestBackend, 2, Int>::from_ints([[1, 2]], &device);
        let good = Tensor::<TestBackend, 3>::from_floats(
            [[[0.0, 9.0, 0.0], [0.0, 0.0, 9.0]]], &device,
        );
        let bad = Tensor::<TestBackend, 3>::from_floats(
            [[[9.0, 0.0, 0.0], [9.0, 0.0, 0.0]]], &device,
        );
        let good = scalar(token_cross_entropy(good, targets.clone(), 0));
        let bad  = scalar(token_cross_entropy(bad, targets, 0));
        assert!(good < bad);
    }
}
