/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : 隐变量先验分布：采样与解析对数密度
 */

use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::errors::{AvbError, AvbResult};

#[cfg(test)]
mod tests;

/// `ln(2π)`
pub const LN_2PI: f32 = 1.837_877_1;

/// 隐变量先验
///
/// 目前只支持标准高斯先验，其他分布族（包括 `uniform`）一律报 `NotImplemented`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prior {
    Gauss,
}

impl Prior {
    /// 根据配置中的 `z_dist` 名称构建先验
    pub fn from_name(z_dist: &str) -> AvbResult<Self> {
        match z_dist {
            "gauss" => Ok(Self::Gauss),
            other => Err(AvbError::NotImplemented(format!(
                "先验分布`{other}`，目前只支持`gauss`"
            ))),
        }
    }

    /// 采样形状为 `[batch_size, z_dim]` 的一批独立隐变量
    pub fn sample<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        z_dim: usize,
        rng: &mut R,
    ) -> Array2<f32> {
        match self {
            Self::Gauss => normal(batch_size, z_dim, rng),
        }
    }

    /// 逐样本对数密度：`-0.5 * Σ_j (z_j² + ln 2π)`
    pub fn log_prob(&self, z: &Array2<f32>) -> Array1<f32> {
        match self {
            Self::Gauss => z
                .map(|v| -0.5 * (v * v + LN_2PI))
                .sum_axis(Axis(1)),
        }
    }

    /// 对数密度对 `z` 的梯度（逐样本独立）
    pub fn log_prob_grad(&self, z: &Array2<f32>) -> Array2<f32> {
        match self {
            Self::Gauss => z.mapv(|v| -v),
        }
    }
}

/// 形状为 `[rows, cols]` 的标准正态矩阵
pub fn normal<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Array2<f32> {
    Array2::from_shape_simple_fn((rows, cols), || rng.sample::<f32, _>(StandardNormal))
}
