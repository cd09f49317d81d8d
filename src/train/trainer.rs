/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : AVB 训练主循环
 *
 * 状态：Initializing -> Running <-> CheckpointSampling -> Stopping -> Terminated
 */

use std::fs;

use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::checkpoint::TrainState;
use super::step::TrainStep;
use super::supervisor::{StopHandle, Supervisor};
use crate::config::TrainConfig;
use crate::data::BatchSource;
use crate::errors::{AvbError, AvbResult};
use crate::model::{Adversary, Decoder, Encoder};
use crate::objective::Losses;
use crate::vision::{ImageSink, PngGridWriter, SAMPLE_GRID, rescale_to_display};

pub const REAL_IMAGES_FILE: &str = "real.png";

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";

/// 训练循环所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Running,
    CheckpointSampling,
    Stopping,
    Terminated,
}

/// 一次 `train` 调用的结果
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOutcome {
    /// 开始时（恢复检查点后）的全局步数
    pub initial_step: u64,
    pub final_step: u64,
    /// 本次实际执行的迭代数
    pub iterations: usize,
    pub stopped_early: bool,
    /// 写出的图片数（含 real.png）
    pub images_written: usize,
    pub last_losses: Option<Losses>,
}

/// 训练器：持有配置、随机数发生器与图片写出端，子模型由调用者持有
pub struct Trainer<W: ImageSink = PngGridWriter> {
    config: TrainConfig,
    step: TrainStep,
    stop: StopHandle,
    sink: W,
    rng: StdRng,
    phase: Phase,
}

impl Trainer<PngGridWriter> {
    /// 配置非法或先验不受支持时立即失败
    pub fn new(config: TrainConfig) -> AvbResult<Self> {
        let step = TrainStep::new(&config)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            step,
            stop: StopHandle::new(),
            sink: PngGridWriter,
            rng,
            phase: Phase::Initializing,
        })
    }
}

impl<W: ImageSink> Trainer<W> {
    /// 替换图片写出端
    pub fn with_image_sink<S: ImageSink>(self, sink: S) -> Trainer<S> {
        Trainer {
            config: self.config,
            step: self.step,
            stop: self.stop,
            sink,
            rng: self.rng,
            phase: self.phase,
        }
    }

    /// 用于从其他线程请求停止
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn image_sink(&self) -> &W {
        &self.sink
    }

    fn enter(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::trace!(from = ?self.phase, to = ?phase, "训练阶段切换");
            self.phase = phase;
        }
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(self.config.nsteps as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(PROGRESS_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb
    }

    /// 训练 `nsteps` 次迭代（或直到收到停止请求）
    pub fn train<E, D, A, B>(
        &mut self,
        encoder: &mut E,
        decoder: &mut D,
        adversary: &mut A,
        data: &mut B,
    ) -> AvbResult<TrainOutcome>
    where
        E: Encoder,
        D: Decoder,
        A: Adversary,
        B: BatchSource + ?Sized,
    {
        // ---------- Initializing ----------
        self.enter(Phase::Initializing);
        if encoder.latent_mode() != self.step.latent_mode() {
            return Err(AvbError::InvalidConfig(format!(
                "is_ac={}要求{:?}形态的编码器，实际为{:?}",
                self.config.is_ac,
                self.step.latent_mode(),
                encoder.latent_mode()
            )));
        }
        self.step.check_param_names(&*encoder, &*decoder, &*adversary)?;

        let mut supervisor = Supervisor::new(&self.config, self.stop.clone())?;
        fs::create_dir_all(self.config.samples_dir())?;

        let mut state = TrainState::new(&self.config);
        supervisor.restore(&mut state, encoder, decoder, adversary)?;
        let initial_step = state.global_step;

        // 固定的测试隐变量，整个训练过程中不变
        let z_test = self
            .step
            .prior()
            .sample(self.config.batch_size, self.config.z_dim, &mut self.rng);

        let x_first = data.next_batch()?;
        self.sink.save_images(
            &rescale_to_display(&x_first),
            SAMPLE_GRID,
            &self.config.sample_dir.join(REAL_IMAGES_FILE),
        )?;
        let mut images_written = 1;

        tracing::info!(
            initial_step,
            nsteps = self.config.nsteps,
            is_ac = self.config.is_ac,
            encoder_params = encoder.num_params(),
            decoder_params = decoder.num_params(),
            adversary_params = adversary.num_params(),
            "开始训练"
        );

        // ---------- Running ----------
        self.enter(Phase::Running);
        let progress = self.progress_bar();
        let mut iterations = 0;
        let mut last_losses = None;
        let mut stopped_early = false;

        for _ in 0..self.config.nsteps {
            if supervisor.should_stop() {
                stopped_early = true;
                break;
            }
            let niter = state.global_step;

            let x_real = data.next_batch()?;
            let grads = self.step.compute_gradients(
                &*encoder,
                &*decoder,
                &*adversary,
                &x_real,
                &mut self.rng,
            )?;
            self.step.apply(&mut state, encoder, decoder, adversary, &grads)?;
            // 汇报的是本步更新前（计算梯度时）的损失，不再额外做一次前向
            let losses = grads.losses;

            progress.set_message(format!(
                "Loss_g: {:.4}, Loss_d: {:.4}",
                losses.primal, losses.dual
            ));
            progress.inc(1);
            state.global_step += 1;
            iterations += 1;
            last_losses = Some(losses);

            supervisor.maybe_write_summary(niter, &losses)?;
            supervisor.maybe_save(&state, &*encoder, &*decoder, &*adversary)?;

            if niter % self.config.ntest as u64 == 0 {
                self.enter(Phase::CheckpointSampling);
                let samples = self.step.sample(&*decoder, &z_test)?;
                let path = self.config.samples_dir().join(format!("train_{niter:06}.png"));
                self.sink
                    .save_images(&rescale_to_display(&samples), SAMPLE_GRID, &path)?;
                images_written += 1;
                tracing::debug!(step = niter, path = %path.display(), "采样图片已写出");
                self.enter(Phase::Running);
            }
        }

        // ---------- Stopping / Terminated ----------
        self.enter(Phase::Stopping);
        progress.finish();
        if stopped_early {
            tracing::info!(step = state.global_step, iterations, "收到停止请求，提前结束训练");
        }
        supervisor.save(&state, &*encoder, &*decoder, &*adversary)?;
        tracing::info!(step = state.global_step, "训练结束，最终检查点已保存");
        self.enter(Phase::Terminated);

        Ok(TrainOutcome {
            initial_step,
            final_step: state.global_step,
            iterations,
            stopped_early,
            images_written,
            last_losses,
        })
    }
}
