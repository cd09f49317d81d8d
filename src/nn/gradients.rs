/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : 按参数名累加的梯度表
 */

use std::collections::HashMap;

use ndarray::Array2;

use super::Param;
use crate::errors::{AvbError, AvbResult};

/// 某个优化器实际要应用的梯度：`(参数名, 梯度)` 列表
pub type GradientList = Vec<(String, Array2<f32>)>;

/// 一个损失对所有参与计算的参数的梯度
///
/// 同一参数在一次反向中可能被多次使用（如判别器同时评估 `Td` 和 `Ti`），
/// 因此梯度按名称累加。没有参与该损失的参数在表中没有条目。
#[derive(Debug, Default, Clone)]
pub struct Gradients {
    grads: HashMap<String, Array2<f32>>,
}

impl Gradients {
    pub fn new() -> Self {
        Self::default()
    }

    /// 把 `grad` 累加到名为 `name` 的参数上
    ///
    /// 同名条目的形状必须一致，不做广播
    pub fn accumulate(&mut self, name: &str, grad: Array2<f32>) -> AvbResult<()> {
        match self.grads.get_mut(name) {
            Some(existing) if existing.shape() != grad.shape() => Err(AvbError::shape_mismatch(
                existing.shape(),
                grad.shape(),
                format!("参数`{name}`的梯度"),
            )),
            Some(existing) => {
                *existing += &grad;
                Ok(())
            }
            None => {
                self.grads.insert(name.to_string(), grad);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Array2<f32>> {
        self.grads.get(name)
    }

    pub fn len(&self) -> usize {
        self.grads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grads.is_empty()
    }

    /// 只保留属于 `params` 的梯度
    ///
    /// 没有梯度的参数（未参与该损失的计算）会被直接过滤掉，这不是错误
    pub fn restrict_to<'a>(&self, params: impl IntoIterator<Item = &'a Param>) -> GradientList {
        params
            .into_iter()
            .filter_map(|param| {
                self.grads
                    .get(param.name())
                    .map(|grad| (param.name().to_string(), grad.clone()))
            })
            .collect()
    }
}
