mod mlp;

use ndarray::Array2;

/// 数值梯度：对 `x` 的每个元素做中心差分
pub(crate) fn numeric_grad<F>(x: &Array2<f32>, eps: f32, mut f: F) -> Array2<f32>
where
    F: FnMut(&Array2<f32>) -> f32,
{
    let mut grad = Array2::zeros(x.raw_dim());
    for idx in 0..x.len() {
        let (r, c) = (idx / x.ncols(), idx % x.ncols());
        let mut plus = x.clone();
        plus[[r, c]] += eps;
        let mut minus = x.clone();
        minus[[r, c]] -= eps;
        grad[[r, c]] = (f(&plus) - f(&minus)) / (2.0 * eps);
    }
    grad
}
