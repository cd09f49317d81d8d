/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : AVB 训练：单步计算、检查点、监督与主循环
 */

mod checkpoint;
mod step;
mod supervisor;
mod trainer;

pub use checkpoint::{
    CHECKPOINT_META_FILE, CheckpointMeta, TrainState, checkpoint_blob_file, read_checkpoint_meta,
    restore_checkpoint, save_checkpoint,
};
pub use step::{GradientSet, TrainStep};
pub use supervisor::{SUMMARY_FILE, StopHandle, Supervisor};
pub use trainer::{Phase, REAL_IMAGES_FILE, TrainOutcome, Trainer};

use crate::config::TrainConfig;
use crate::data::BatchSource;
use crate::errors::AvbResult;
use crate::model::{Adversary, Decoder, Encoder};


/// 用默认的 PNG 写出端按 `config` 训练一次
pub fn train<E, D, A, B>(
    encoder: &mut E,
    decoder: &mut D,
    adversary: &mut A,
    data: &mut B,
    config: &TrainConfig,
) -> AvbResult<TrainOutcome>
where
    E: Encoder,
    D: Decoder,
    A: Adversary,
    B: BatchSource + ?Sized,
{
    Trainer::new(config.clone())?.train(encoder, decoder, adversary, data)
}
