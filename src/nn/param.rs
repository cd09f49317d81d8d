/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : 可训练参数
 */

use ndarray::Array2;
use rand::Rng;

use crate::distribution::normal;

/// 可训练参数：带全局唯一名称的二维矩阵
///
/// 名称形如 `encoder/fc1_W`，优化器的矩估计、检查点都以名称为键
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    value: Array2<f32>,
}

impl Param {
    pub fn new(name: impl Into<String>, value: Array2<f32>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// 全零初始化（用于偏置）
    pub fn zeros(name: impl Into<String>, shape: (usize, usize)) -> Self {
        Self::new(name, Array2::zeros(shape))
    }

    /// Kaiming 正态初始化：`N(0, 2 / fan_in)`，适合 (Leaky)ReLU
    pub fn kaiming<R: Rng + ?Sized>(
        name: impl Into<String>,
        shape: (usize, usize),
        rng: &mut R,
    ) -> Self {
        let std = (2.0 / shape.0.max(1) as f32).sqrt();
        Self::new(name, normal(shape.0, shape.1, rng) * std)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Array2<f32> {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Array2<f32> {
        &mut self.value
    }

    pub fn shape(&self) -> &[usize] {
        self.value.shape()
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}
