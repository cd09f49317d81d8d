/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : 逐元素激活函数
 */

use ndarray::{Array2, Zip};

/// 逐元素激活函数
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    /// `max(x, αx)`
    LeakyRelu(f32),
    Tanh,
    Identity,
}

impl Activation {
    pub fn forward(&self, pre: &Array2<f32>) -> Array2<f32> {
        match *self {
            Self::LeakyRelu(alpha) => pre.mapv(|v| if v > 0.0 { v } else { alpha * v }),
            Self::Tanh => pre.mapv(f32::tanh),
            Self::Identity => pre.clone(),
        }
    }

    /// 由激活前的值 `pre` 和上游梯度求激活前的梯度
    pub fn backward(&self, pre: &Array2<f32>, grad_out: &Array2<f32>) -> Array2<f32> {
        match *self {
            Self::LeakyRelu(alpha) => Zip::from(pre)
                .and(grad_out)
                .map_collect(|&p, &g| if p > 0.0 { g } else { alpha * g }),
            Self::Tanh => Zip::from(pre).and(grad_out).map_collect(|&p, &g| {
                let t = p.tanh();
                g * (1.0 - t * t)
            }),
            Self::Identity => grad_out.clone(),
        }
    }
}
