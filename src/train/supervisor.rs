/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 训练监督：停止请求、按时间间隔写摘要与检查点
 */

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::checkpoint::{TrainState, restore_checkpoint, save_checkpoint};
use crate::config::TrainConfig;
use crate::errors::AvbResult;
use crate::nn::Module;
use crate::objective::Losses;

pub const SUMMARY_FILE: &str = "summaries.jsonl";

/// 外部请求停止训练的句柄，可跨线程克隆
///
/// 训练循环在每次迭代开始前检查一次，已开始的迭代会完整执行
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// `summaries.jsonl` 中的一行
#[derive(Debug, Clone, Serialize)]
struct SummaryRecord {
    step: u64,
    loss_primal: f32,
    loss_dual: f32,
    d_loss_d: f32,
    d_loss_i: f32,
    reconst_err: f32,
}

pub struct Supervisor {
    log_dir: PathBuf,
    summary_interval: Duration,
    save_interval: Duration,
    last_summary: Instant,
    last_save: Instant,
    stop: StopHandle,
}

impl Supervisor {
    pub fn new(config: &TrainConfig, stop: StopHandle) -> AvbResult<Self> {
        fs::create_dir_all(&config.log_dir)?;
        let now = Instant::now();
        Ok(Self {
            log_dir: config.log_dir.clone(),
            summary_interval: Duration::from_secs(config.save_summaries_secs),
            save_interval: Duration::from_secs(config.save_model_secs),
            last_summary: now,
            last_save: now,
            stop,
        })
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn should_stop(&self) -> bool {
        self.stop.is_stop_requested()
    }

    /// 若 `log_dir` 中已有检查点则恢复，返回是否恢复
    pub fn restore<E: Module, D: Module, A: Module>(
        &self,
        state: &mut TrainState,
        encoder: &mut E,
        decoder: &mut D,
        adversary: &mut A,
    ) -> AvbResult<bool> {
        match restore_checkpoint(&self.log_dir, state, encoder, decoder, adversary)? {
            Some(step) => {
                tracing::info!(step, dir = %self.log_dir.display(), "从检查点恢复训练");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 追加一行摘要
    pub fn write_summary(&mut self, step: u64, losses: &Losses) -> AvbResult<()> {
        let record = SummaryRecord {
            step,
            loss_primal: losses.primal,
            loss_dual: losses.dual,
            d_loss_d: losses.d_loss_d,
            d_loss_i: losses.d_loss_i,
            reconst_err: losses.reconst_err,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_dir.join(SUMMARY_FILE))?;
        serde_json::to_writer(&mut file, &record)?;
        writeln!(file)?;
        self.last_summary = Instant::now();
        Ok(())
    }

    /// 距上次写摘要超过间隔时写一次，返回是否写入
    pub fn maybe_write_summary(&mut self, step: u64, losses: &Losses) -> AvbResult<bool> {
        if self.last_summary.elapsed() < self.summary_interval {
            return Ok(false);
        }
        self.write_summary(step, losses)?;
        Ok(true)
    }

    pub fn save<E: Module, D: Module, A: Module>(
        &mut self,
        state: &TrainState,
        encoder: &E,
        decoder: &D,
        adversary: &A,
    ) -> AvbResult<()> {
        save_checkpoint(&self.log_dir, state, encoder, decoder, adversary)?;
        self.last_save = Instant::now();
        Ok(())
    }

    /// 距上次保存超过间隔时写一次检查点，返回是否写入
    pub fn maybe_save<E: Module, D: Module, A: Module>(
        &mut self,
        state: &TrainState,
        encoder: &E,
        decoder: &D,
        adversary: &A,
    ) -> AvbResult<bool> {
        if self.last_save.elapsed() < self.save_interval {
            return Ok(false);
        }
        self.save(state, encoder, decoder, adversary)?;
        tracing::info!(step = state.global_step, "定时检查点已保存");
        Ok(true)
    }
}
