/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 训练状态与检查点的保存/恢复
 *
 * log_dir 下的文件：
 * - `checkpoint.json`：元信息（全局步数、参数文件名、各子模型参数量）
 * - `model.ckpt-{step}.bin`：bincode 编码的三个子模型参数 + 两个优化器的矩估计 + 全局步数
 *
 * 保存顺序：先写新的参数文件，再改写 `checkpoint.json` 指向它，最后删掉旧的参数文件。
 * 每个文件都先写临时文件再 rename；`checkpoint.json` 是提交点，
 * 在它被替换之前中断，恢复时读到的仍是上一份完整的检查点。
 */

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::TrainConfig;
use crate::errors::{AvbError, AvbResult};
use crate::nn::optimizer::Adam;
use crate::nn::{Module, StateDict};

pub const CHECKPOINT_META_FILE: &str = "checkpoint.json";
const CHECKPOINT_BLOB_PREFIX: &str = "model.ckpt-";
const CHECKPOINT_BLOB_SUFFIX: &str = ".bin";

/// 第 `step` 步的参数文件名
pub fn checkpoint_blob_file(step: u64) -> String {
    format!("{CHECKPOINT_BLOB_PREFIX}{step}{CHECKPOINT_BLOB_SUFFIX}")
}

/// Adam 的 beta2 与 epsilon（两个优化器共用）
const ADAM_BETA2: f32 = 0.999;
const ADAM_EPSILON: f32 = 1e-8;

/// 跨迭代持久的训练状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainState {
    /// 已完成的训练步数，只增不减，恢复训练后接着计数
    pub global_step: u64,
    /// 编码器 + 解码器
    pub primal_optimizer: Adam,
    /// 判别器
    pub adversary_optimizer: Adam,
}

impl TrainState {
    pub fn new(config: &TrainConfig) -> Self {
        Self {
            global_step: 0,
            primal_optimizer: Adam::new(
                config.learning_rate,
                config.beta1,
                ADAM_BETA2,
                ADAM_EPSILON,
            ),
            adversary_optimizer: Adam::new(
                config.learning_rate_adversary,
                config.beta1,
                ADAM_BETA2,
                ADAM_EPSILON,
            ),
        }
    }
}

/// `checkpoint.json` 的内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub global_step: u64,
    pub model_file: String,
    pub encoder_params: usize,
    pub decoder_params: usize,
    pub adversary_params: usize,
}

#[derive(Serialize, Deserialize)]
struct CheckpointBlob {
    state: TrainState,
    encoder: StateDict,
    decoder: StateDict,
    adversary: StateDict,
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// 先写临时文件，flush 后 rename 到目标位置
fn write_atomically<F>(path: &Path, write: F) -> AvbResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> AvbResult<()>,
{
    let tmp = tmp_path(path);
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        write(&mut writer)?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// 删除 `log_dir` 中除 `keep` 以外的参数文件（含未完成的临时文件）
fn remove_stale_blobs(log_dir: &Path, keep: &str) -> AvbResult<()> {
    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let is_blob = name.starts_with(CHECKPOINT_BLOB_PREFIX)
            && (name.ends_with(CHECKPOINT_BLOB_SUFFIX) || name.ends_with(".tmp"));
        if is_blob && name != keep {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "旧参数文件删除失败");
            }
        }
    }
    Ok(())
}

/// 把当前训练状态写入 `log_dir`
pub fn save_checkpoint<E, D, A>(
    log_dir: &Path,
    state: &TrainState,
    encoder: &E,
    decoder: &D,
    adversary: &A,
) -> AvbResult<CheckpointMeta>
where
    E: Module,
    D: Module,
    A: Module,
{
    fs::create_dir_all(log_dir)?;

    let blob = CheckpointBlob {
        state: state.clone(),
        encoder: encoder.state_dict(),
        decoder: decoder.state_dict(),
        adversary: adversary.state_dict(),
    };
    let model_file = checkpoint_blob_file(state.global_step);
    write_atomically(&log_dir.join(&model_file), |w| {
        bincode::serialize_into(w, &blob)?;
        Ok(())
    })?;

    let meta = CheckpointMeta {
        global_step: state.global_step,
        model_file: model_file.clone(),
        encoder_params: encoder.num_params(),
        decoder_params: decoder.num_params(),
        adversary_params: adversary.num_params(),
    };
    write_atomically(&log_dir.join(CHECKPOINT_META_FILE), |w| {
        serde_json::to_writer_pretty(w, &meta)?;
        Ok(())
    })?;
    remove_stale_blobs(log_dir, &model_file)?;

    tracing::debug!(step = state.global_step, dir = %log_dir.display(), "检查点已保存");
    Ok(meta)
}

/// 读取 `log_dir` 中的检查点元信息；没有检查点时返回 `None`
pub fn read_checkpoint_meta(log_dir: &Path) -> AvbResult<Option<CheckpointMeta>> {
    let path = log_dir.join(CHECKPOINT_META_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let meta = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    Ok(Some(meta))
}

/// 从 `log_dir` 恢复参数与训练状态，返回恢复到的全局步数
///
/// 学习率沿用当前配置，不从检查点中恢复
pub fn restore_checkpoint<E, D, A>(
    log_dir: &Path,
    state: &mut TrainState,
    encoder: &mut E,
    decoder: &mut D,
    adversary: &mut A,
) -> AvbResult<Option<u64>>
where
    E: Module,
    D: Module,
    A: Module,
{
    let Some(meta) = read_checkpoint_meta(log_dir)? else {
        return Ok(None);
    };

    let blob_path = log_dir.join(&meta.model_file);
    if !blob_path.exists() {
        return Err(AvbError::Checkpoint(format!(
            "`{}`指向的参数文件`{}`不存在",
            CHECKPOINT_META_FILE,
            blob_path.display()
        )));
    }
    let blob: CheckpointBlob =
        bincode::deserialize_from(BufReader::new(File::open(&blob_path)?))?;
    if blob.state.global_step != meta.global_step {
        return Err(AvbError::Checkpoint(format!(
            "元信息步数{}与参数文件步数{}不一致",
            meta.global_step, blob.state.global_step
        )));
    }

    encoder.load_state_dict(&blob.encoder)?;
    decoder.load_state_dict(&blob.decoder)?;
    adversary.load_state_dict(&blob.adversary)?;

    let primal_lr = state.primal_optimizer.learning_rate();
    let adversary_lr = state.adversary_optimizer.learning_rate();
    *state = blob.state;
    state.primal_optimizer.set_learning_rate(primal_lr);
    state.adversary_optimizer.set_learning_rate(adversary_lr);

    Ok(Some(state.global_step))
}
