/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : 默认解码器
 */

use ndarray::{Array2, Array4};
use rand::Rng;

use super::{Decoder, check_images, flatten_images, unflatten_images};
use crate::errors::AvbResult;
use crate::nn::{Activation, Gradients, Mlp, MlpTape, Module, Param};

/// MLP 解码器：`z -> [batch, H, W, C]`
///
/// 输出层不加激活，输出的含义由 `CondDist` 决定（bernoulli 时为 logits，gauss 时为均值）
pub struct MlpDecoder {
    body: Mlp,
    image_shape: [usize; 3],
}

impl MlpDecoder {
    pub fn new<R: Rng + ?Sized>(
        z_dim: usize,
        hidden: &[usize],
        image_shape: [usize; 3],
        rng: &mut R,
    ) -> AvbResult<Self> {
        let mut dims = vec![z_dim];
        dims.extend_from_slice(hidden);
        dims.push(image_shape.iter().product());
        let body = Mlp::new(
            "decoder",
            &dims,
            Activation::LeakyRelu(0.2),
            Activation::Identity,
            rng,
        )?;
        Ok(Self { body, image_shape })
    }
}

impl Module for MlpDecoder {
    fn parameters(&self) -> Vec<&Param> {
        self.body.parameters()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Param> {
        self.body.parameters_mut()
    }
}

impl Decoder for MlpDecoder {
    type Tape = MlpTape;

    fn decode(&self, z: &Array2<f32>, _is_training: bool) -> AvbResult<(Array4<f32>, MlpTape)> {
        let (out, tape) = self.body.forward(z)?;
        Ok((unflatten_images(out, self.image_shape)?, tape))
    }

    fn backward(
        &self,
        tape: &MlpTape,
        grad_out: &Array4<f32>,
        grads: &mut Gradients,
    ) -> AvbResult<Array2<f32>> {
        check_images(grad_out, self.image_shape, "解码器输出的梯度")?;
        let grad = flatten_images(grad_out)?;
        self.body.backward(tape, &grad, grads)
    }
}
