/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : Adam优化器实现
 */

use std::collections::HashMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::errors::{AvbError, AvbResult};
use crate::nn::Param;

/// Adam优化器
///
/// 矩估计以参数名为键，因此可以随检查点一起序列化，恢复训练后继续累积。
/// 不同参数组（如 AVB 的 primal 与 adversary）各自持有一个独立的实例。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    /// 一阶矩估计
    m: HashMap<String, Array2<f32>>,
    /// 二阶矩估计
    v: HashMap<String, Array2<f32>>,
    /// 时间步
    t: usize,
}

impl Adam {
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            m: HashMap::new(),
            v: HashMap::new(),
            t: 0,
        }
    }

    /// 使用默认参数创建Adam优化器
    pub fn new_default(learning_rate: f32) -> Self {
        Self::new(learning_rate, 0.9, 0.999, 1e-8)
    }

    /// 把已计算好的梯度应用到 `params` 上
    ///
    /// `grads` 中每一项都必须能在 `params` 里按名称找到；
    /// `params` 中没有出现在 `grads` 里的参数保持不变。
    /// 返回实际更新的参数个数。
    pub fn apply<'a>(
        &mut self,
        params: impl IntoIterator<Item = &'a mut Param>,
        grads: &[(String, Array2<f32>)],
    ) -> AvbResult<usize> {
        self.t += 1;

        let mut by_name: HashMap<String, &mut Param> = params
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();

        for (name, gradient) in grads {
            let param = by_name
                .get_mut(name)
                .ok_or_else(|| AvbError::Checkpoint(format!("优化器找不到参数`{name}`")))?;
            if param.shape() != gradient.shape() {
                return Err(AvbError::shape_mismatch(
                    param.shape(),
                    gradient.shape(),
                    format!("参数`{name}`的梯度"),
                ));
            }
            self.adam_update_with_gradient(param, gradient);
        }
        Ok(grads.len())
    }

    /// Adam 参数更新的核心逻辑
    fn adam_update_with_gradient(&mut self, param: &mut Param, gradient: &Array2<f32>) {
        let (beta1, beta2) = (self.beta1, self.beta2);

        // 原地更新一阶矩估计: m = β1 * m + (1 - β1) * g
        let m = self
            .m
            .entry(param.name().to_string())
            .or_insert_with(|| Array2::zeros(gradient.raw_dim()));
        m.zip_mut_with(gradient, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);

        // 原地更新二阶矩估计: v = β2 * v + (1 - β2) * g²
        let v = self
            .v
            .entry(param.name().to_string())
            .or_insert_with(|| Array2::zeros(gradient.raw_dim()));
        v.zip_mut_with(gradient, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        // 偏差修正
        let bias1 = 1.0 - beta1.powi(self.t as i32);
        let bias2 = 1.0 - beta2.powi(self.t as i32);

        // 参数更新: θ = θ - α * m_hat / (√v_hat + ε)
        let (lr, eps) = (self.learning_rate, self.epsilon);
        let m = &self.m[param.name()];
        let v = &self.v[param.name()];
        ndarray::Zip::from(param.value_mut())
            .and(m)
            .and(v)
            .for_each(|theta, &m, &v| {
                let m_hat = m / bias1;
                let v_hat = v / bias2;
                *theta -= lr * m_hat / (v_hat.sqrt() + eps);
            });
    }

    /// 重置累积状态（矩估计和时间步）
    pub fn reset(&mut self) {
        self.m.clear();
        self.v.clear();
        self.t = 0;
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, lr: f32) {
        self.learning_rate = lr;
    }

    /// 已执行的更新次数
    pub fn step_count(&self) -> usize {
        self.t
    }
}
