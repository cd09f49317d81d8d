/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : 默认编码器
 *
 * AVB 的编码器是隐式的：`z = f(x, ε)`，噪声 ε 与展平后的图像拼接后送入 MLP，
 * 因此后验分布不需要有解析形式。
 */

use ndarray::{Array2, Array4, Axis, concatenate, s};
use rand::Rng;

use super::{Encoder, EncoderOutput, LatentGrad, LatentMode, check_images, flatten_images};
use crate::distribution::normal;
use crate::errors::{AvbError, AvbResult};
use crate::nn::{Activation, Gradients, Mlp, MlpTape, Module, Param};

fn body_dims(input: usize, hidden: &[usize], z_dim: usize) -> Vec<usize> {
    let mut dims = Vec::with_capacity(hidden.len() + 2);
    dims.push(input);
    dims.extend_from_slice(hidden);
    dims.push(z_dim);
    dims
}

/// 拼接图像与噪声：[batch, H*W*C + noise_dim]
fn with_noise<R: Rng + ?Sized>(
    x_flat: &Array2<f32>,
    noise_dim: usize,
    rng: &mut R,
) -> AvbResult<Array2<f32>> {
    let eps = normal(x_flat.nrows(), noise_dim, rng);
    concatenate(Axis(1), &[x_flat.view(), eps.view()])
        .map_err(|e| AvbError::shape_mismatch(x_flat.shape(), eps.shape(), e.to_string()))
}

/// 隐式编码器：`z = MLP([x, ε])`，输出 `PlainLatent`
pub struct ImplicitEncoder {
    body: Mlp,
    image_shape: [usize; 3],
    noise_dim: usize,
}

impl ImplicitEncoder {
    pub fn new<R: Rng + ?Sized>(
        image_shape: [usize; 3],
        z_dim: usize,
        noise_dim: usize,
        hidden: &[usize],
        rng: &mut R,
    ) -> AvbResult<Self> {
        let input = image_shape.iter().product::<usize>() + noise_dim;
        let body = Mlp::new(
            "encoder",
            &body_dims(input, hidden, z_dim),
            Activation::LeakyRelu(0.2),
            Activation::Identity,
            rng,
        )?;
        Ok(Self {
            body,
            image_shape,
            noise_dim,
        })
    }
}

impl Module for ImplicitEncoder {
    fn parameters(&self) -> Vec<&Param> {
        self.body.parameters()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Param> {
        self.body.parameters_mut()
    }
}

impl Encoder for ImplicitEncoder {
    type Tape = MlpTape;

    fn latent_mode(&self) -> LatentMode {
        LatentMode::Plain
    }

    fn encode<R: Rng + ?Sized>(
        &self,
        x: &Array4<f32>,
        _is_training: bool,
        rng: &mut R,
    ) -> AvbResult<(EncoderOutput, MlpTape)> {
        check_images(x, self.image_shape, "编码器输入")?;
        let input = with_noise(&flatten_images(x)?, self.noise_dim, rng)?;
        let (z, tape) = self.body.forward(&input)?;
        Ok((EncoderOutput::PlainLatent { z }, tape))
    }

    fn backward(&self, tape: &MlpTape, grad: &LatentGrad, grads: &mut Gradients) -> AvbResult<()> {
        match grad {
            EncoderOutput::PlainLatent { z } => {
                self.body.backward(tape, z, grads)?;
                Ok(())
            }
            EncoderOutput::ContrastLatent { .. } => Err(AvbError::InvalidConfig(
                "ImplicitEncoder 只接受 PlainLatent 形态的梯度".to_string(),
            )),
        }
    }
}

/// adaptive contrast 编码器
///
/// 对同一个 x 抽取 `n_samples` 份噪声，经同一个隐式 MLP 得到多份 z，
/// 用样本均值/方差作为 `z_mean` / `z_var` 的估计，第一份样本作为 `z_real`。
/// 梯度会经过矩估计流回所有样本。
pub struct ContrastEncoder {
    body: Mlp,
    image_shape: [usize; 3],
    noise_dim: usize,
    n_samples: usize,
}

/// `ContrastEncoder` 一次前向的缓存
pub struct ContrastTape {
    mlp: MlpTape,
    /// 所有样本的输出，按样本分块：第 k 块为 [k*batch, (k+1)*batch)
    zs: Array2<f32>,
    mean: Array2<f32>,
    batch: usize,
}

impl ContrastEncoder {
    pub fn new<R: Rng + ?Sized>(
        image_shape: [usize; 3],
        z_dim: usize,
        noise_dim: usize,
        hidden: &[usize],
        n_samples: usize,
        rng: &mut R,
    ) -> AvbResult<Self> {
        if n_samples < 2 {
            return Err(AvbError::InvalidConfig(
                "ContrastEncoder 估计方差至少需要2份样本".to_string(),
            ));
        }
        let input = image_shape.iter().product::<usize>() + noise_dim;
        let body = Mlp::new(
            "encoder",
            &body_dims(input, hidden, z_dim),
            Activation::LeakyRelu(0.2),
            Activation::Identity,
            rng,
        )?;
        Ok(Self {
            body,
            image_shape,
            noise_dim,
            n_samples,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }
}

impl Module for ContrastEncoder {
    fn parameters(&self) -> Vec<&Param> {
        self.body.parameters()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Param> {
        self.body.parameters_mut()
    }
}

impl Encoder for ContrastEncoder {
    type Tape = ContrastTape;

    fn latent_mode(&self) -> LatentMode {
        LatentMode::Contrast
    }

    fn encode<R: Rng + ?Sized>(
        &self,
        x: &Array4<f32>,
        _is_training: bool,
        rng: &mut R,
    ) -> AvbResult<(EncoderOutput, ContrastTape)> {
        check_images(x, self.image_shape, "编码器输入")?;
        let x_flat = flatten_images(x)?;
        let batch = x_flat.nrows();

        let inputs = (0..self.n_samples)
            .map(|_| with_noise(&x_flat, self.noise_dim, &mut *rng))
            .collect::<AvbResult<Vec<_>>>()?;
        let views: Vec<_> = inputs.iter().map(|a| a.view()).collect();
        let stacked = concatenate(Axis(0), &views)
            .map_err(|e| AvbError::shape_mismatch(x_flat.shape(), &[], e.to_string()))?;

        let (zs, mlp) = self.body.forward(&stacked)?;
        let k = self.n_samples as f32;

        let mut mean: Array2<f32> = Array2::zeros((batch, zs.ncols()));
        for i in 0..self.n_samples {
            mean += &zs.slice(s![i * batch..(i + 1) * batch, ..]);
        }
        mean /= k;

        let mut var: Array2<f32> = Array2::zeros(mean.raw_dim());
        for i in 0..self.n_samples {
            let diff = &zs.slice(s![i * batch..(i + 1) * batch, ..]) - &mean;
            var += &(&diff * &diff);
        }
        var /= k;

        let z = zs.slice(s![0..batch, ..]).to_owned();
        let output = EncoderOutput::ContrastLatent {
            z,
            mean: mean.clone(),
            var,
        };
        Ok((output, ContrastTape { mlp, zs, mean, batch }))
    }

    fn backward(
        &self,
        tape: &ContrastTape,
        grad: &LatentGrad,
        grads: &mut Gradients,
    ) -> AvbResult<()> {
        let EncoderOutput::ContrastLatent {
            z: dz,
            mean: dmean,
            var: dvar,
        } = grad
        else {
            return Err(AvbError::InvalidConfig(
                "ContrastEncoder 只接受 ContrastLatent 形态的梯度".to_string(),
            ));
        };

        // mean = Σ z_k / K,  var = Σ (z_k - mean)² / K
        // => ∂/∂z_k = dmean / K + dvar * 2(z_k - mean) / K（Σ(z_k - mean) = 0，故均值项消去）
        let k = self.n_samples as f32;
        let batch = tape.batch;
        let mut dzs: Array2<f32> = Array2::zeros(tape.zs.raw_dim());
        for i in 0..self.n_samples {
            let diff = &tape.zs.slice(s![i * batch..(i + 1) * batch, ..]) - &tape.mean;
            let mut block = dzs.slice_mut(s![i * batch..(i + 1) * batch, ..]);
            block.assign(&(dmean / k));
            block += &(&diff * dvar * (2.0 / k));
            if i == 0 {
                block += dz;
            }
        }
        self.body.backward(&tape.mlp, &dzs, grads)?;
        Ok(())
    }
}
