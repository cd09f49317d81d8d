/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : 无参数的逐元素函数
 */

use ndarray::{Array, Dimension, Zip};

pub fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// 数值稳定的 sigmoid 交叉熵：`max(l, 0) - l*y + ln(1 + e^{-|l|})`
///
/// 对任意 logits 与 [0, 1] 内的 labels 都非负
pub fn sigmoid_cross_entropy(logit: f32, label: f32) -> f32 {
    logit.max(0.0) - logit * label + (-logit.abs()).exp().ln_1p()
}

/// 逐元素的 sigmoid 交叉熵
pub fn sigmoid_cross_entropy_with_logits<D: Dimension>(
    logits: &Array<f32, D>,
    labels: &Array<f32, D>,
) -> Array<f32, D> {
    Zip::from(logits)
        .and(labels)
        .map_collect(|&l, &y| sigmoid_cross_entropy(l, y))
}

/// sigmoid 交叉熵对 logits 的梯度：`sigmoid(l) - y`
pub fn sigmoid_cross_entropy_grad<D: Dimension>(
    logits: &Array<f32, D>,
    labels: &Array<f32, D>,
) -> Array<f32, D> {
    Zip::from(logits)
        .and(labels)
        .map_collect(|&l, &y| sigmoid(l) - y)
}
