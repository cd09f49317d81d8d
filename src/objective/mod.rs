/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : AVB 的 primal / dual 目标函数
 *
 * 判别器分数 T 的两个用途：
 * - `Td = T(x, z_real)`：与编码器（近似后验）的样本配对，标签为 1
 * - `Ti = T(x, z_sampled)`：与先验样本配对，标签为 0
 * 解析已知的对数密度作为偏置从 logits 中减去（不参与学习），
 * 使得 T 可以解释为后验/先验对数密度比的估计。
 *
 * dual   = mean(CE(Td - logr, 1)) + mean(CE(Ti - zlogprob, 0))
 * primal = factor * mean(reconst_err + Td - zlogprob)
 */

use ndarray::{Array1, Array2, Axis, Zip};

use crate::distribution::LN_2PI;
use crate::nn::functional::{sigmoid, sigmoid_cross_entropy};

#[cfg(test)]
mod tests;

/// 计算 `z_std` 前加在方差上的数值下限
pub const VAR_FLOOR: f32 = 1e-4;

/// adaptive contrast 下经过标准化的隐变量
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLatent {
    /// `(z - mean) / z_std`
    pub z_norm: Array2<f32>,
    /// `sqrt(var + VAR_FLOOR)`
    pub z_std: Array2<f32>,
}

/// 标准化的反向结果：损失对 `z`、`mean`、`var` 的梯度
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedGrad {
    pub z: Array2<f32>,
    pub mean: Array2<f32>,
    pub var: Array2<f32>,
}

impl NormalizedLatent {
    pub fn new(z: &Array2<f32>, mean: &Array2<f32>, var: &Array2<f32>) -> Self {
        let z_std = var.mapv(|v| (v + VAR_FLOOR).sqrt());
        let z_norm = (z - mean) / &z_std;
        Self { z_norm, z_std }
    }

    /// 由损失对 `z_norm` 的梯度求对 `z`、`mean`、`var` 的梯度
    ///
    /// z_norm = (z - m) / sqrt(v + floor)
    /// => ∂/∂z = g / std, ∂/∂m = -g / std, ∂/∂v = -g * z_norm / (2 std²)
    pub fn backward(&self, grad_z_norm: &Array2<f32>) -> NormalizedGrad {
        let z = grad_z_norm / &self.z_std;
        let mean = z.mapv(|g| -g);
        let var = Zip::from(grad_z_norm)
            .and(&self.z_norm)
            .and(&self.z_std)
            .map_collect(|&g, &n, &s| -0.5 * g * n / (s * s));
        NormalizedGrad { z, mean, var }
    }

    /// 编码器隐含高斯 N(mean, var) 在 `z_real` 处的对数密度：
    /// `-0.5 * Σ (z_norm² + ln var + ln 2π)`
    pub fn log_density(&self, var: &Array2<f32>) -> Array1<f32> {
        Zip::from(&self.z_norm)
            .and(var)
            .map_collect(|&n, &v| -0.5 * (n * n + v.ln() + LN_2PI))
            .sum_axis(Axis(1))
    }
}

/// 构造目标函数所需的逐样本量
#[derive(Debug, Clone)]
pub struct ObjectiveTerms {
    /// 判别器对 (x, 编码器隐变量) 的分数
    pub td: Array1<f32>,
    /// 判别器对 (x, 先验样本) 的分数
    pub ti: Array1<f32>,
    /// 先验在 `z_real` 处的对数密度
    pub zlogprob: Array1<f32>,
    /// `Td` 的偏置；非 adaptive contrast 时与 `zlogprob` 完全相同
    pub logr: Array1<f32>,
    /// 逐样本重建误差
    pub reconst_err: Array1<f32>,
}

/// 一步训练的标量损失
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Losses {
    pub primal: f32,
    pub dual: f32,
    pub d_loss_d: f32,
    pub d_loss_i: f32,
    /// 重建误差的批均值（仅用于摘要）
    pub reconst_err: f32,
}

/// 两个损失对逐样本量的梯度
#[derive(Debug, Clone)]
pub struct LossGrads {
    /// ∂primal/∂Td
    pub primal_td: Array1<f32>,
    /// ∂primal/∂zlogprob
    pub primal_zlogprob: Array1<f32>,
    /// ∂primal/∂reconst_err（每个样本相同）
    pub primal_reconst: f32,
    /// ∂dual/∂Td
    pub dual_td: Array1<f32>,
    /// ∂dual/∂Ti
    pub dual_ti: Array1<f32>,
}

impl ObjectiveTerms {
    pub fn batch_size(&self) -> usize {
        self.td.len()
    }

    /// 计算 primal / dual 损失及其对逐样本量的梯度
    ///
    /// `factor` 为 `1 / (H * W * C)`
    pub fn evaluate(&self, factor: f32) -> (Losses, LossGrads) {
        let n = self.batch_size().max(1) as f32;

        let primal_per_sample = &self.reconst_err + &self.td - &self.zlogprob;
        let primal = factor * primal_per_sample.sum() / n;

        let logits_d = &self.td - &self.logr;
        let logits_i = &self.ti - &self.zlogprob;
        let d_loss_d = logits_d.mapv(|l| sigmoid_cross_entropy(l, 1.0)).sum() / n;
        let d_loss_i = logits_i.mapv(|l| sigmoid_cross_entropy(l, 0.0)).sum() / n;

        let losses = Losses {
            primal,
            dual: d_loss_i + d_loss_d,
            d_loss_d,
            d_loss_i,
            reconst_err: self.reconst_err.sum() / n,
        };

        let g = factor / n;
        let grads = LossGrads {
            primal_td: Array1::from_elem(self.td.len(), g),
            primal_zlogprob: Array1::from_elem(self.td.len(), -g),
            primal_reconst: g,
            dual_td: logits_d.mapv(|l| (sigmoid(l) - 1.0) / n),
            dual_ti: logits_i.mapv(|l| sigmoid(l) / n),
        };
        (losses, grads)
    }
}
