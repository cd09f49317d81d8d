use approx::assert_abs_diff_eq;
use ndarray::array;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::distribution::{LN_2PI, Prior};
use crate::errors::AvbError;

#[test]
fn test_only_gauss_is_supported() {
    assert_eq!(Prior::from_name("gauss").unwrap(), Prior::Gauss);
    for name in ["uniform", "laplace", ""] {
        let err = Prior::from_name(name).unwrap_err();
        assert!(matches!(err, AvbError::NotImplemented(_)), "{name}");
    }
}

#[test]
fn test_sample_shape_and_moments() {
    let mut rng = StdRng::seed_from_u64(7);
    let z = Prior::Gauss.sample(2000, 3, &mut rng);
    assert_eq!(z.shape(), &[2000, 3]);

    let mean = z.mean().unwrap();
    let var = z.mapv(|v| (v - mean) * (v - mean)).mean().unwrap();
    assert_abs_diff_eq!(mean, 0.0, epsilon = 0.05);
    assert_abs_diff_eq!(var, 1.0, epsilon = 0.1);
}

#[test]
fn test_sample_is_reproducible_with_seed() {
    let a = Prior::Gauss.sample(4, 2, &mut StdRng::seed_from_u64(42));
    let b = Prior::Gauss.sample(4, 2, &mut StdRng::seed_from_u64(42));
    assert_eq!(a, b);
}

#[test]
fn test_log_prob_matches_closed_form() {
    let z = array![[0.0, 0.0], [1.0, -2.0]];
    let log_prob = Prior::Gauss.log_prob(&z);
    assert_abs_diff_eq!(log_prob[0], -LN_2PI, epsilon = 1e-6);
    assert_abs_diff_eq!(log_prob[1], -0.5 * (5.0 + 2.0 * LN_2PI), epsilon = 1e-6);
}

#[test]
fn test_log_prob_grad_is_negative_z() {
    let z = array![[0.5, -1.5]];
    assert_eq!(Prior::Gauss.log_prob_grad(&z), array![[-0.5, 1.5]]);
}
