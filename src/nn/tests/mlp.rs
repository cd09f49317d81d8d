use approx::assert_abs_diff_eq;
use ndarray::array;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::numeric_grad;
use crate::errors::AvbError;
use crate::nn::{Activation, Gradients, Mlp, Module, Param};

#[test]
fn test_mlp_dims_and_names() {
    let mut rng = StdRng::seed_from_u64(1);
    let mlp = Mlp::new(
        "decoder",
        &[2, 8, 4],
        Activation::LeakyRelu(0.2),
        Activation::Identity,
        &mut rng,
    )
    .unwrap();
    assert_eq!(mlp.in_features(), 2);
    assert_eq!(mlp.out_features(), 4);
    let names: Vec<_> = mlp.parameters().iter().map(|p| p.name().to_string()).collect();
    assert_eq!(names, ["decoder/fc1_W", "decoder/fc1_b", "decoder/fc2_W", "decoder/fc2_b"]);
}

#[test]
fn test_mlp_rejects_degenerate_dims() {
    let mut rng = StdRng::seed_from_u64(1);
    for dims in [&[3][..], &[3, 0, 2][..]] {
        let err = Mlp::new("m", dims, Activation::Tanh, Activation::Identity, &mut rng).err();
        assert!(matches!(err, Some(AvbError::InvalidConfig(_))));
    }
}

#[test]
fn test_mlp_backward_matches_numeric_input_grad() {
    let mut rng = StdRng::seed_from_u64(5);
    let mlp = Mlp::new("m", &[3, 5, 2], Activation::Tanh, Activation::Identity, &mut rng).unwrap();
    let x = array![[0.2, -0.4, 0.9], [-1.0, 0.3, 0.1]];
    let c = array![[1.0, 0.5], [-0.7, 2.0]];

    let (_, tape) = mlp.forward(&x).unwrap();
    let mut grads = Gradients::new();
    let dx = mlp.backward(&tape, &c, &mut grads).unwrap();

    let expected = numeric_grad(&x, 1e-2, |x| (mlp.forward(x).unwrap().0 * &c).sum());
    for (a, b) in dx.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 2e-3);
    }
    assert_eq!(grads.len(), 4);
}

#[test]
fn test_mlp_backward_matches_numeric_param_grad() {
    let mut rng = StdRng::seed_from_u64(9);
    let mut mlp =
        Mlp::new("m", &[2, 3, 1], Activation::LeakyRelu(0.2), Activation::Identity, &mut rng)
            .unwrap();
    let x = array![[0.5, -0.25], [1.5, 0.75]];
    let c = array![[1.0], [1.0]];

    let (_, tape) = mlp.forward(&x).unwrap();
    let mut grads = Gradients::new();
    mlp.backward(&tape, &c, &mut grads).unwrap();
    let analytic = grads.get("m/fc1_W").unwrap().clone();

    let w = mlp.parameters()[0].value().clone();
    let numeric = numeric_grad(&w, 1e-3, |w| {
        mlp.parameters_mut()[0].value_mut().assign(w);
        mlp.forward(&x).unwrap().0.sum()
    });
    for (a, b) in analytic.iter().zip(numeric.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 5e-3);
    }

    // 未参与计算的参数不会出现在梯度表里
    let stranger = Param::zeros("other/fc1_W", (1, 1));
    assert!(grads.restrict_to([&stranger]).is_empty());
}
