/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : 训练配置
 *
 * 配置是一份扁平的键值表，训练开始时读取一次，整个训练期间不可变。
 * 除必填键外，其余键均有默认值。
 */

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{AvbError, AvbResult};
use crate::model::{CondDist, LatentMode};

#[cfg(test)]
mod tests;

const fn default_save_summaries_secs() -> u64 {
    15
}

const fn default_save_model_secs() -> u64 {
    600
}

const fn default_show_progress() -> bool {
    true
}

const fn default_beta1() -> f32 {
    0.5
}

/// AVB 训练配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// 是否启用 adaptive contrast（编码器额外输出均值与方差）
    pub is_ac: bool,
    /// 图像边长（图像为 `output_size x output_size`）
    pub output_size: usize,
    /// 图像通道数
    pub c_dim: usize,
    pub batch_size: usize,
    /// 解码器的条件分布族
    pub cond_dist: CondDist,
    /// 隐变量维度
    pub z_dim: usize,
    /// 先验分布名称，目前只支持 `"gauss"`
    pub z_dist: String,
    /// 编码器+解码器（primal）的学习率
    pub learning_rate: f32,
    /// 判别器（adversary）的学习率
    pub learning_rate_adversary: f32,
    /// 检查点与摘要的存放目录
    pub log_dir: PathBuf,
    /// 采样图片的存放目录
    pub sample_dir: PathBuf,
    /// 训练迭代次数
    pub nsteps: usize,
    /// 每隔多少步采样一次
    pub ntest: usize,

    /// 随机种子（为空时使用系统熵）
    #[serde(default)]
    pub seed: Option<u64>,
    /// 写入摘要的时间间隔（秒）
    #[serde(default = "default_save_summaries_secs")]
    pub save_summaries_secs: u64,
    /// 写入检查点的时间间隔（秒）
    #[serde(default = "default_save_model_secs")]
    pub save_model_secs: u64,
    /// 是否显示进度条
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
    /// 两个 Adam 优化器共用的 beta1（GAN 类训练常用 0.5）
    #[serde(default = "default_beta1")]
    pub beta1: f32,
}

impl TrainConfig {
    /// 从 JSON 字符串解析配置，并做合法性检查
    pub fn from_json_str(json: &str) -> AvbResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件读取配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> AvbResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// 检查数值型配置项
    ///
    /// 注意：`z_dist` 不在这里检查，不支持的先验由 [`crate::distribution::Prior::from_name`]
    /// 报 `NotImplemented`，而不是配置错误
    pub fn validate(&self) -> AvbResult<()> {
        let positive = [
            ("output_size", self.output_size),
            ("c_dim", self.c_dim),
            ("batch_size", self.batch_size),
            ("z_dim", self.z_dim),
            ("ntest", self.ntest),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(AvbError::InvalidConfig(format!("{name}须大于0")));
            }
        }
        if !(self.learning_rate > 0.0 && self.learning_rate_adversary > 0.0) {
            return Err(AvbError::InvalidConfig("学习率须大于0".to_string()));
        }
        if !(0.0..1.0).contains(&self.beta1) {
            return Err(AvbError::InvalidConfig("beta1须在[0, 1)范围内".to_string()));
        }
        Ok(())
    }

    /// 由 `is_ac` 决定的隐变量模式（只在构建训练器时解析一次）
    pub fn latent_mode(&self) -> LatentMode {
        if self.is_ac {
            LatentMode::Contrast
        } else {
            LatentMode::Plain
        }
    }

    /// 单张图像的形状 `[H, W, C]`
    pub fn image_shape(&self) -> [usize; 3] {
        [self.output_size, self.output_size, self.c_dim]
    }

    /// primal 损失的逐像素归一化因子 `1 / (H * W * C)`
    pub fn factor(&self) -> f32 {
        1.0 / (self.output_size * self.output_size * self.c_dim) as f32
    }

    /// 采样图片所在的子目录
    pub fn samples_dir(&self) -> PathBuf {
        self.sample_dir.join("samples")
    }
}
