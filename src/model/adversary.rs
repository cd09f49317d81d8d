/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : 默认判别器 T(x, z)
 */

use ndarray::{Array1, Array2, Array4, Axis, concatenate, s};
use rand::Rng;

use super::{Adversary, check_images, flatten_images};
use crate::errors::{AvbError, AvbResult};
use crate::nn::{Activation, Gradients, Mlp, MlpTape, Module, Param};

/// MLP 判别器：`T(x, z) = MLP([x, z])`，每个样本输出一个未经 sigmoid 的分数
pub struct MlpAdversary {
    body: Mlp,
    image_shape: [usize; 3],
    z_dim: usize,
}

/// `MlpAdversary` 一次前向的缓存
pub struct AdversaryTape {
    mlp: MlpTape,
    x_width: usize,
}

impl MlpAdversary {
    pub fn new<R: Rng + ?Sized>(
        image_shape: [usize; 3],
        z_dim: usize,
        hidden: &[usize],
        rng: &mut R,
    ) -> AvbResult<Self> {
        let mut dims = vec![image_shape.iter().product::<usize>() + z_dim];
        dims.extend_from_slice(hidden);
        dims.push(1);
        let body = Mlp::new(
            "adversary",
            &dims,
            Activation::LeakyRelu(0.2),
            Activation::Identity,
            rng,
        )?;
        Ok(Self {
            body,
            image_shape,
            z_dim,
        })
    }
}

impl Module for MlpAdversary {
    fn parameters(&self) -> Vec<&Param> {
        self.body.parameters()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Param> {
        self.body.parameters_mut()
    }
}

impl Adversary for MlpAdversary {
    type Tape = AdversaryTape;

    fn score(
        &self,
        x: &Array4<f32>,
        z: &Array2<f32>,
        _is_training: bool,
    ) -> AvbResult<(Array1<f32>, AdversaryTape)> {
        check_images(x, self.image_shape, "判别器输入")?;
        if z.ncols() != self.z_dim || z.nrows() != x.dim().0 {
            return Err(AvbError::shape_mismatch(
                &[x.dim().0, self.z_dim],
                z.shape(),
                "判别器的隐变量输入",
            ));
        }
        let x_flat = flatten_images(x)?;
        let input = concatenate(Axis(1), &[x_flat.view(), z.view()])
            .map_err(|e| AvbError::shape_mismatch(x_flat.shape(), z.shape(), e.to_string()))?;
        let (out, mlp) = self.body.forward(&input)?;
        let scores = out.index_axis_move(Axis(1), 0);
        Ok((
            scores,
            AdversaryTape {
                mlp,
                x_width: x_flat.ncols(),
            },
        ))
    }

    fn backward(
        &self,
        tape: &AdversaryTape,
        grad_score: &Array1<f32>,
        grads: &mut Gradients,
    ) -> AvbResult<Array2<f32>> {
        let grad_out = grad_score.clone().insert_axis(Axis(1));
        let grad_in = self.body.backward(&tape.mlp, &grad_out, grads)?;
        Ok(grad_in.slice(s![.., tape.x_width..]).to_owned())
    }
}
