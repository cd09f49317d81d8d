/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : 两阶段训练步：先算出两个分区的全部梯度，再分别应用
 *
 * 阶段一 `compute_gradients` 只借用三个子模型的不可变引用，
 * 所以 primal 与 dual 的梯度一定基于同一份参数快照；
 * 阶段二 `apply` 拿到可变引用后才更新参数，两个优化器互不影响。
 */

use ndarray::{Array2, Array4, Zip};
use rand::Rng;

use super::TrainState;
use crate::config::TrainConfig;
use crate::distribution::Prior;
use crate::errors::{AvbError, AvbResult};
use crate::model::{
    Adversary, CondDist, Decoder, Encoder, EncoderOutput, LatentMode, get_decoder_mean,
    get_reconstr_err, reconstr_err_grad,
};
use crate::nn::{GradientList, Gradients, Module, ensure_unique_names};
use crate::objective::{Losses, NormalizedLatent, ObjectiveTerms};

/// 一步训练中两个优化器各自要应用的梯度，以及计算梯度时的损失
#[derive(Debug, Clone)]
pub struct GradientSet {
    /// 编码器 + 解码器参数对 primal 损失的梯度
    pub primal: GradientList,
    /// 判别器参数对 dual 损失的梯度
    pub adversary: GradientList,
    pub losses: Losses,
    pub terms: ObjectiveTerms,
}

/// 单步训练所需的、在配置阶段就确定下来的量
#[derive(Debug, Clone)]
pub struct TrainStep {
    prior: Prior,
    cond_dist: CondDist,
    mode: LatentMode,
    factor: f32,
    batch_size: usize,
    z_dim: usize,
    image_shape: [usize; 3],
}

impl TrainStep {
    /// 不支持的先验在这里立即报 `NotImplemented`，早于任何张量计算
    pub fn new(config: &TrainConfig) -> AvbResult<Self> {
        let prior = Prior::from_name(&config.z_dist)?;
        config.validate()?;
        Ok(Self {
            prior,
            cond_dist: config.cond_dist,
            mode: config.latent_mode(),
            factor: config.factor(),
            batch_size: config.batch_size,
            z_dim: config.z_dim,
            image_shape: config.image_shape(),
        })
    }

    pub fn prior(&self) -> Prior {
        self.prior
    }

    pub fn latent_mode(&self) -> LatentMode {
        self.mode
    }

    /// 三个子模型的参数名必须互不相同（梯度按名称累加）
    pub fn check_param_names<E, D, A>(
        &self,
        encoder: &E,
        decoder: &D,
        adversary: &A,
    ) -> AvbResult<()>
    where
        E: Module,
        D: Module,
        A: Module,
    {
        ensure_unique_names(
            encoder
                .parameters()
                .into_iter()
                .chain(decoder.parameters())
                .chain(adversary.parameters()),
        )
    }

    /// 阶段一：构造两个目标函数并反向传播
    ///
    /// 每个损失的梯度单独累加，再只保留各自优化器负责的参数；
    /// 未参与该损失的参数被过滤掉。
    pub fn compute_gradients<E, D, A, R>(
        &self,
        encoder: &E,
        decoder: &D,
        adversary: &A,
        x_real: &Array4<f32>,
        rng: &mut R,
    ) -> AvbResult<GradientSet>
    where
        E: Encoder,
        D: Decoder,
        A: Adversary,
        R: Rng + ?Sized,
    {
        let (batch, h, w, c) = x_real.dim();
        if [h, w, c] != self.image_shape || batch != self.batch_size {
            let [eh, ew, ec] = self.image_shape;
            return Err(AvbError::shape_mismatch(
                &[self.batch_size, eh, ew, ec],
                x_real.shape(),
                "真实数据批次",
            ));
        }
        self.check_param_names(encoder, decoder, adversary)?;

        let z_sampled = self.prior.sample(batch, self.z_dim, rng);
        let (latent, enc_tape) = encoder.encode(x_real, true, rng)?;
        if latent.mode() != self.mode {
            return Err(AvbError::InvalidConfig(format!(
                "编码器输出{:?}形态，但配置要求{:?}",
                latent.mode(),
                self.mode
            )));
        }
        let z_real = latent.z();

        // 判别器看到的“后验”隐变量：adaptive contrast 时为标准化后的 z_norm
        let normalized = match &latent {
            EncoderOutput::PlainLatent { .. } => None,
            EncoderOutput::ContrastLatent { z, mean, var } => {
                Some(NormalizedLatent::new(z, mean, var))
            }
        };
        let td_input = normalized.as_ref().map_or(z_real, |n| &n.z_norm);

        let (td, td_tape) = adversary.score(x_real, td_input, true)?;
        let (ti, ti_tape) = adversary.score(x_real, &z_sampled, true)?;

        let zlogprob = self.prior.log_prob(z_real);
        let logr = match (&latent, &normalized) {
            (EncoderOutput::ContrastLatent { var, .. }, Some(n)) => n.log_density(var),
            _ => zlogprob.clone(),
        };

        let (decoder_out, dec_tape) = decoder.decode(z_real, true)?;
        let reconst_err = get_reconstr_err(&decoder_out, x_real, self.cond_dist)?;

        let terms = ObjectiveTerms {
            td,
            ti,
            zlogprob,
            logr,
            reconst_err,
        };
        let (losses, loss_grads) = terms.evaluate(self.factor);

        // ---------- primal：对编码器与解码器求导 ----------
        let mut primal_grads = Gradients::new();

        let grad_decoder_out =
            reconstr_err_grad(&decoder_out, x_real, self.cond_dist)? * loss_grads.primal_reconst;
        let mut grad_z = decoder.backward(&dec_tape, &grad_decoder_out, &mut primal_grads)?;

        // zlogprob 项：∂primal/∂z = ∂primal/∂zlogprob * ∇log p(z)
        let log_prob_grad = self.prior.log_prob_grad(z_real);
        Zip::from(grad_z.rows_mut())
            .and(log_prob_grad.rows())
            .and(&loss_grads.primal_zlogprob)
            .for_each(|mut g, lp, &s| g.scaled_add(s, &lp));

        // Td 项经判别器流回其隐变量输入（判别器参数的梯度稍后会被过滤掉）
        let grad_td_input =
            adversary.backward(&td_tape, &loss_grads.primal_td, &mut primal_grads)?;
        let latent_grad = match &normalized {
            None => {
                grad_z += &grad_td_input;
                EncoderOutput::PlainLatent { z: grad_z }
            }
            Some(n) => {
                let g = n.backward(&grad_td_input);
                grad_z += &g.z;
                EncoderOutput::ContrastLatent {
                    z: grad_z,
                    mean: g.mean,
                    var: g.var,
                }
            }
        };
        encoder.backward(&enc_tape, &latent_grad, &mut primal_grads)?;

        // ---------- dual：只对判别器求导 ----------
        let mut dual_grads = Gradients::new();
        adversary.backward(&td_tape, &loss_grads.dual_td, &mut dual_grads)?;
        adversary.backward(&ti_tape, &loss_grads.dual_ti, &mut dual_grads)?;

        let primal =
            primal_grads.restrict_to(encoder.parameters().into_iter().chain(decoder.parameters()));
        let adversary_grads = dual_grads.restrict_to(adversary.parameters());

        Ok(GradientSet {
            primal,
            adversary: adversary_grads,
            losses,
            terms,
        })
    }

    /// 阶段二：两个优化器分别更新自己的参数分区
    pub fn apply<E, D, A>(
        &self,
        state: &mut TrainState,
        encoder: &mut E,
        decoder: &mut D,
        adversary: &mut A,
        grads: &GradientSet,
    ) -> AvbResult<()>
    where
        E: Encoder,
        D: Decoder,
        A: Adversary,
    {
        let primal_params = encoder
            .parameters_mut()
            .into_iter()
            .chain(decoder.parameters_mut());
        state.primal_optimizer.apply(primal_params, &grads.primal)?;
        state
            .adversary_optimizer
            .apply(adversary.parameters_mut(), &grads.adversary)?;
        Ok(())
    }

    /// 由固定的隐变量解码出样本（值域与模型内部一致）
    pub fn sample<D: Decoder>(&self, decoder: &D, z: &Array2<f32>) -> AvbResult<Array4<f32>> {
        let (out, _) = decoder.decode(z, false)?;
        Ok(get_decoder_mean(&out, self.cond_dist))
    }
}
