/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : Linear (全连接) 层
 */

use ndarray::{Array2, Axis};
use rand::Rng;

use crate::errors::{AvbError, AvbResult};
use crate::nn::{Gradients, Module, Param};

/// Linear (全连接) 层：`output = x @ W + b`
///
/// # 输入/输出形状
/// - 输入：[batch_size, in_features]
/// - 输出：[batch_size, out_features]
///
/// # 使用示例
/// ```ignore
/// let fc = Linear::new(784, 128, true, "encoder/fc1", &mut rng);
/// let h = fc.forward(&x)?;
/// let dx = fc.backward(&x, &dh, &mut grads)?;
/// ```
pub struct Linear {
    /// 权重参数 [in_features, out_features]
    weights: Param,
    /// 偏置参数 [1, out_features]（可选）
    bias: Option<Param>,
    in_features: usize,
    out_features: usize,
}

impl Linear {
    /// 创建新的 Linear 层
    ///
    /// 权重使用 Kaiming 初始化，偏置零初始化；参数名为 `{name}_W` / `{name}_b`
    pub fn new<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        use_bias: bool,
        name: &str,
        rng: &mut R,
    ) -> Self {
        let weights = Param::kaiming(format!("{name}_W"), (in_features, out_features), rng);
        let bias = use_bias.then(|| Param::zeros(format!("{name}_b"), (1, out_features)));
        Self {
            weights,
            bias,
            in_features,
            out_features,
        }
    }

    /// 前向传播：计算 `x @ W + b`
    pub fn forward(&self, x: &Array2<f32>) -> AvbResult<Array2<f32>> {
        if x.ncols() != self.in_features {
            return Err(AvbError::shape_mismatch(
                &[x.nrows(), self.in_features],
                x.shape(),
                format!("Linear `{}` 的输入", self.weights.name()),
            ));
        }
        let mut output = x.dot(self.weights.value());
        if let Some(ref bias) = self.bias {
            output += bias.value();
        }
        Ok(output)
    }

    /// 反向传播
    ///
    /// - `x`: 前向时的输入
    /// - `grad_out`: 损失对输出的梯度 [batch_size, out_features]
    ///
    /// 参数梯度累加进 `grads`，返回损失对输入的梯度 [batch_size, in_features]
    pub fn backward(
        &self,
        x: &Array2<f32>,
        grad_out: &Array2<f32>,
        grads: &mut Gradients,
    ) -> AvbResult<Array2<f32>> {
        grads.accumulate(self.weights.name(), x.t().dot(grad_out))?;
        if let Some(ref bias) = self.bias {
            grads.accumulate(bias.name(), grad_out.sum_axis(Axis(0)).insert_axis(Axis(0)))?;
        }
        Ok(grad_out.dot(&self.weights.value().t()))
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn weights(&self) -> &Param {
        &self.weights
    }

    pub fn bias(&self) -> Option<&Param> {
        self.bias.as_ref()
    }
}

impl Module for Linear {
    fn parameters(&self) -> Vec<&Param> {
        let mut params = vec![&self.weights];
        params.extend(self.bias.as_ref());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Param> {
        let mut params = vec![&mut self.weights];
        params.extend(self.bias.as_mut());
        params
    }
}
