/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : AVB 的三个子模型（编码器、解码器、判别器）的调用约定及默认实现
 *
 * 训练循环只通过这里的 trait 与子模型交互：
 * - `Encoder`:   (x_real, is_training) -> EncoderOutput
 * - `Decoder`:   (z, is_training) -> decoder_output
 * - `Adversary`: (x, z, is_training) -> 每个样本一个分数
 *
 * 每次前向都返回一个 tape，反向时交回给同一个子模型，参数梯度按名称累加进 `Gradients`。
 * 默认实现都基于 `Mlp`，图像在进入网络前被展平为 [batch, H*W*C]。
 */

mod adversary;
mod decoder;
mod encoder;
mod reconstruction;

pub use adversary::MlpAdversary;
pub use decoder::MlpDecoder;
pub use encoder::{ContrastEncoder, ContrastTape, ImplicitEncoder};
pub use reconstruction::{CondDist, get_decoder_mean, get_reconstr_err, reconstr_err_grad};

use ndarray::{Array1, Array2, Array4};
use rand::Rng;

use crate::errors::{AvbError, AvbResult};
use crate::nn::{Gradients, Module};


/// 编码器输出的形态，由配置项 `is_ac` 决定，训练开始前解析一次
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatentMode {
    /// 只输出隐变量 `z`
    Plain,
    /// adaptive contrast：额外输出 `z` 的均值与方差
    Contrast,
}

/// 编码器输出
///
/// 反向传播时同样用这个类型携带损失对各输出的梯度（形状与前向一一对应）
#[derive(Debug, Clone, PartialEq)]
pub enum EncoderOutput {
    PlainLatent {
        z: Array2<f32>,
    },
    ContrastLatent {
        z: Array2<f32>,
        mean: Array2<f32>,
        var: Array2<f32>,
    },
}

/// 损失对编码器输出的梯度
pub type LatentGrad = EncoderOutput;

impl EncoderOutput {
    /// 隐变量 `z_real`
    pub fn z(&self) -> &Array2<f32> {
        match self {
            Self::PlainLatent { z } | Self::ContrastLatent { z, .. } => z,
        }
    }

    pub fn mode(&self) -> LatentMode {
        match self {
            Self::PlainLatent { .. } => LatentMode::Plain,
            Self::ContrastLatent { .. } => LatentMode::Contrast,
        }
    }
}

/// 编码器：把真实数据映射为隐变量
pub trait Encoder: Module {
    type Tape;

    /// 该编码器产出的 `EncoderOutput` 形态
    fn latent_mode(&self) -> LatentMode;

    fn encode<R: Rng + ?Sized>(
        &self,
        x: &Array4<f32>,
        is_training: bool,
        rng: &mut R,
    ) -> AvbResult<(EncoderOutput, Self::Tape)>;

    /// `grad` 的形态必须与前向输出一致
    fn backward(
        &self,
        tape: &Self::Tape,
        grad: &LatentGrad,
        grads: &mut Gradients,
    ) -> AvbResult<()>;
}

/// 解码器：由隐变量重建数据
pub trait Decoder: Module {
    type Tape;

    /// 返回 [batch, H, W, C] 的解码器输出（其含义由 `CondDist` 决定）
    fn decode(&self, z: &Array2<f32>, is_training: bool) -> AvbResult<(Array4<f32>, Self::Tape)>;

    /// 返回损失对 `z` 的梯度
    fn backward(
        &self,
        tape: &Self::Tape,
        grad_out: &Array4<f32>,
        grads: &mut Gradients,
    ) -> AvbResult<Array2<f32>>;
}

/// 判别器：为 (x, z) 对打分，用于估计后验与先验的对数密度比
pub trait Adversary: Module {
    type Tape;

    fn score(
        &self,
        x: &Array4<f32>,
        z: &Array2<f32>,
        is_training: bool,
    ) -> AvbResult<(Array1<f32>, Self::Tape)>;

    /// 返回损失对 `z` 的梯度（对 `x` 的梯度没有用处，不返回）
    fn backward(
        &self,
        tape: &Self::Tape,
        grad_score: &Array1<f32>,
        grads: &mut Gradients,
    ) -> AvbResult<Array2<f32>>;
}

/// [batch, H, W, C] -> [batch, H*W*C]
pub(crate) fn flatten_images(x: &Array4<f32>) -> AvbResult<Array2<f32>> {
    let (batch, h, w, c) = x.dim();
    x.as_standard_layout()
        .into_owned()
        .into_shape((batch, h * w * c))
        .map_err(|e| AvbError::shape_mismatch(&[batch, h * w * c], x.shape(), e.to_string()))
}

/// [batch, H*W*C] -> [batch, H, W, C]
pub(crate) fn unflatten_images(x: Array2<f32>, image_shape: [usize; 3]) -> AvbResult<Array4<f32>> {
    let [h, w, c] = image_shape;
    let batch = x.nrows();
    if x.ncols() != h * w * c {
        return Err(AvbError::shape_mismatch(
            &[batch, h * w * c],
            x.shape(),
            "解码器输出无法还原为图像",
        ));
    }
    x.as_standard_layout()
        .into_owned()
        .into_shape((batch, h, w, c))
        .map_err(|e| {
            AvbError::shape_mismatch(&[batch, h, w, c], &[batch, h * w * c], e.to_string())
        })
}

/// 检查一批图像是否为 [batch, H, W, C]
pub(crate) fn check_images(x: &Array4<f32>, image_shape: [usize; 3], who: &str) -> AvbResult<()> {
    let (batch, h, w, c) = x.dim();
    if [h, w, c] != image_shape {
        let [eh, ew, ec] = image_shape;
        return Err(AvbError::shape_mismatch(&[batch, eh, ew, ec], x.shape(), who));
    }
    Ok(())
}
