/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : 多层感知机（三个子模型的默认主体）
 */

use ndarray::Array2;
use rand::Rng;

use super::{Activation, Gradients, Linear, Module, Param};
use crate::errors::{AvbError, AvbResult};

/// 多层感知机：隐藏层统一使用 `hidden_activation`，最后一层使用 `output_activation`
pub struct Mlp {
    layers: Vec<Linear>,
    hidden_activation: Activation,
    output_activation: Activation,
}

/// 一次前向的缓存：每层的输入和激活前的值
#[derive(Debug, Clone)]
pub struct MlpTape {
    inputs: Vec<Array2<f32>>,
    pre_activations: Vec<Array2<f32>>,
}

impl Mlp {
    /// 创建 MLP
    ///
    /// `dims` 依次为输入维度、各隐藏层维度、输出维度，至少两项；
    /// 各层名称为 `{name}/fc{i}`（i 从 1 开始）
    pub fn new<R: Rng + ?Sized>(
        name: &str,
        dims: &[usize],
        hidden_activation: Activation,
        output_activation: Activation,
        rng: &mut R,
    ) -> AvbResult<Self> {
        if dims.len() < 2 || dims.contains(&0) {
            return Err(AvbError::InvalidConfig(format!(
                "MLP `{name}` 的维度列表{dims:?}至少需要2个正数"
            )));
        }
        let layers = dims
            .windows(2)
            .enumerate()
            .map(|(i, w)| Linear::new(w[0], w[1], true, &format!("{name}/fc{}", i + 1), &mut *rng))
            .collect();
        Ok(Self {
            layers,
            hidden_activation,
            output_activation,
        })
    }

    pub fn in_features(&self) -> usize {
        self.layers[0].in_features()
    }

    pub fn out_features(&self) -> usize {
        self.layers[self.layers.len() - 1].out_features()
    }

    fn activation(&self, index: usize) -> Activation {
        if index + 1 == self.layers.len() {
            self.output_activation
        } else {
            self.hidden_activation
        }
    }

    pub fn forward(&self, x: &Array2<f32>) -> AvbResult<(Array2<f32>, MlpTape)> {
        let mut tape = MlpTape {
            inputs: Vec::with_capacity(self.layers.len()),
            pre_activations: Vec::with_capacity(self.layers.len()),
        };
        let mut h = x.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            let pre = layer.forward(&h)?;
            let out = self.activation(i).forward(&pre);
            tape.inputs.push(h);
            tape.pre_activations.push(pre);
            h = out;
        }
        Ok((h, tape))
    }

    /// 反向传播，返回损失对 MLP 输入的梯度
    pub fn backward(
        &self,
        tape: &MlpTape,
        grad_out: &Array2<f32>,
        grads: &mut Gradients,
    ) -> AvbResult<Array2<f32>> {
        let mut grad = grad_out.clone();
        for (i, layer) in self.layers.iter().enumerate().rev() {
            let grad_pre = self.activation(i).backward(&tape.pre_activations[i], &grad);
            grad = layer.backward(&tape.inputs[i], &grad_pre, grads)?;
        }
        Ok(grad)
    }
}

impl Module for Mlp {
    fn parameters(&self) -> Vec<&Param> {
        self.layers.iter().flat_map(|l| l.parameters()).collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Param> {
        self.layers.iter_mut().flat_map(|l| l.parameters_mut()).collect()
    }
}
