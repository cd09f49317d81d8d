/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : 重建误差与解码器均值
 *
 * 模型内部的图像值域为 [-1, 1]。
 */

use ndarray::{Array1, Array4, Axis};
use serde::{Deserialize, Serialize};

use crate::errors::{AvbError, AvbResult};
use crate::nn::functional::{sigmoid, sigmoid_cross_entropy_grad, sigmoid_cross_entropy_with_logits};

/// 解码器的条件分布族 p(x|z)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CondDist {
    /// 逐像素伯努利：解码器输出 logits，标签为 `0.5 * x + 0.5`
    Bernoulli,
    /// 单位方差高斯：解码器输出即均值
    Gauss,
}

fn check_same_shape(decoder_out: &Array4<f32>, x_real: &Array4<f32>) -> AvbResult<()> {
    if decoder_out.shape() != x_real.shape() {
        return Err(AvbError::shape_mismatch(
            x_real.shape(),
            decoder_out.shape(),
            "解码器输出与真实数据",
        ));
    }
    Ok(())
}

fn per_sample_sum(err: Array4<f32>) -> Array1<f32> {
    err.sum_axis(Axis(3)).sum_axis(Axis(2)).sum_axis(Axis(1))
}

/// 逐样本重建误差（负对数似然，忽略常数项）
pub fn get_reconstr_err(
    decoder_out: &Array4<f32>,
    x_real: &Array4<f32>,
    cond_dist: CondDist,
) -> AvbResult<Array1<f32>> {
    check_same_shape(decoder_out, x_real)?;
    let err = match cond_dist {
        CondDist::Bernoulli => {
            let labels = x_real.mapv(|v| 0.5 * v + 0.5);
            sigmoid_cross_entropy_with_logits(decoder_out, &labels)
        }
        CondDist::Gauss => (x_real - decoder_out).mapv(|d| 0.5 * d * d),
    };
    Ok(per_sample_sum(err))
}

/// 逐样本重建误差对解码器输出的梯度（每个样本的误差单独求导）
pub fn reconstr_err_grad(
    decoder_out: &Array4<f32>,
    x_real: &Array4<f32>,
    cond_dist: CondDist,
) -> AvbResult<Array4<f32>> {
    check_same_shape(decoder_out, x_real)?;
    Ok(match cond_dist {
        CondDist::Bernoulli => {
            let labels = x_real.mapv(|v| 0.5 * v + 0.5);
            sigmoid_cross_entropy_grad(decoder_out, &labels)
        }
        CondDist::Gauss => decoder_out - x_real,
    })
}

/// 由解码器输出得到均值图像（值域与模型内部一致）
pub fn get_decoder_mean(decoder_out: &Array4<f32>, cond_dist: CondDist) -> Array4<f32> {
    match cond_dist {
        CondDist::Bernoulli => decoder_out.mapv(|v| 2.0 * sigmoid(v) - 1.0),
        CondDist::Gauss => decoder_out.clone(),
    }
}
