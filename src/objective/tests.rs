/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : 目标函数测试
 */

use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2, array};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::distribution::{LN_2PI, normal};
use crate::nn::tests::numeric_grad;
use crate::objective::{NormalizedLatent, ObjectiveTerms, VAR_FLOOR};

fn random_terms(seed: u64, n: usize) -> ObjectiveTerms {
    let mut rng = StdRng::seed_from_u64(seed);
    let m = normal(5, n, &mut rng) * 3.0;
    ObjectiveTerms {
        td: m.row(0).to_owned(),
        ti: m.row(1).to_owned(),
        zlogprob: m.row(2).to_owned(),
        logr: m.row(3).to_owned(),
        reconst_err: m.row(4).mapv(f32::abs),
    }
}

#[test]
fn test_dual_loss_is_sum_of_nonnegative_terms() {
    for seed in 0..20 {
        let terms = random_terms(seed, 8);
        let (losses, _) = terms.evaluate(1.0 / 64.0);
        assert!(losses.d_loss_d >= 0.0);
        assert!(losses.d_loss_i >= 0.0);
        assert_eq!(losses.dual, losses.d_loss_i + losses.d_loss_d);
    }
}

#[test]
fn test_cross_entropy_stays_finite_for_extreme_logits() {
    let terms = ObjectiveTerms {
        td: array![1e4, -1e4],
        ti: array![1e4, -1e4],
        zlogprob: array![0.0, 0.0],
        logr: array![0.0, 0.0],
        reconst_err: array![0.0, 0.0],
    };
    let (losses, _) = terms.evaluate(1.0);
    assert!(losses.dual.is_finite());
    // Td=1e4 标签为 1 时损失为 0；Td=-1e4 时损失约为 1e4，取平均后为 5e3
    assert_abs_diff_eq!(losses.d_loss_d, 5e3, epsilon = 1.0);
}

#[test]
fn test_primal_loss_closed_form() {
    let terms = ObjectiveTerms {
        td: array![1.0, 2.0],
        ti: array![0.0, 0.0],
        zlogprob: array![-3.0, -1.0],
        logr: array![-3.0, -1.0],
        reconst_err: array![10.0, 20.0],
    };
    let (losses, grads) = terms.evaluate(0.25);
    // mean(10 + 1 + 3, 20 + 2 + 1) = 18.5
    assert_abs_diff_eq!(losses.primal, 0.25 * 18.5, epsilon = 1e-6);
    assert_abs_diff_eq!(losses.reconst_err, 15.0, epsilon = 1e-6);
    assert_abs_diff_eq!(grads.primal_reconst, 0.125, epsilon = 1e-7);
    assert_eq!(grads.primal_td, array![0.125, 0.125]);
    assert_eq!(grads.primal_zlogprob, array![-0.125, -0.125]);
}

#[test]
fn test_dual_grads_match_numeric() {
    let terms = random_terms(3, 4);
    let (_, grads) = terms.evaluate(0.1);

    let as_row = |a: &Array1<f32>| a.clone().insert_axis(ndarray::Axis(0));
    let dual_with_td = |td: &Array2<f32>| {
        let mut t = terms.clone();
        t.td = td.row(0).to_owned();
        t.evaluate(0.1).0.dual
    };
    let numeric_td = numeric_grad(&as_row(&terms.td), 1e-2, dual_with_td);
    for (a, b) in grads.dual_td.iter().zip(numeric_td.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-3);
    }

    let dual_with_ti = |ti: &Array2<f32>| {
        let mut t = terms.clone();
        t.ti = ti.row(0).to_owned();
        t.evaluate(0.1).0.dual
    };
    let numeric_ti = numeric_grad(&as_row(&terms.ti), 1e-2, dual_with_ti);
    for (a, b) in grads.dual_ti.iter().zip(numeric_ti.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-3);
    }
}

#[test]
fn test_zero_variance_uses_floor() {
    let z = array![[1.0, 0.5]];
    let mean = array![[0.0, 0.5]];
    let var = array![[0.0, 3.0]];
    let normalized = NormalizedLatent::new(&z, &mean, &var);

    assert_eq!(normalized.z_std[[0, 0]], VAR_FLOOR.sqrt());
    assert_ne!(normalized.z_std[[0, 0]], 0.0);
    assert_abs_diff_eq!(normalized.z_norm[[0, 0]], 100.0, epsilon = 1e-3);
    assert_abs_diff_eq!(normalized.z_std[[0, 1]], (3.0f32 + VAR_FLOOR).sqrt(), epsilon = 1e-7);
    assert_eq!(normalized.z_norm[[0, 1]], 0.0);
}

#[test]
fn test_log_density_closed_form() {
    let z = array![[0.0, 0.0, 0.0]];
    let mean = array![[0.0, 0.0, 0.0]];
    let var = array![[1.0, 1.0, 1.0]];
    let normalized = NormalizedLatent::new(&z, &mean, &var);
    let logr = normalized.log_density(&var);
    assert_abs_diff_eq!(logr[0], -1.5 * LN_2PI, epsilon = 1e-5);
}

#[test]
fn test_normalize_backward_matches_numeric() {
    let z = array![[0.4, -1.2], [2.0, 0.3]];
    let mean = array![[0.1, -0.5], [1.0, 0.0]];
    let var = array![[0.5, 2.0], [0.05, 1.5]];
    let c = array![[1.0, -0.3], [0.6, 2.0]];

    let grad = NormalizedLatent::new(&z, &mean, &var).backward(&c);
    let f = |z: &Array2<f32>, m: &Array2<f32>, v: &Array2<f32>| {
        (NormalizedLatent::new(z, m, v).z_norm * &c).sum()
    };

    let dz = numeric_grad(&z, 1e-3, |z| f(z, &mean, &var));
    let dm = numeric_grad(&mean, 1e-3, |m| f(&z, m, &var));
    let dv = numeric_grad(&var, 1e-3, |v| f(&z, &mean, v));
    for (analytic, numeric) in [(&grad.z, &dz), (&grad.mean, &dm), (&grad.var, &dv)] {
        for (a, b) in analytic.iter().zip(numeric.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 5e-2);
        }
    }
}
