//! # AVB
//!
//! `avb`项目用纯rust实现[对抗变分贝叶斯](https://arxiv.org/abs/1701.04722)（Adversarial Variational Bayes）
//! 的训练流程：编码器不必给出显式的后验密度，而是由一个判别器估计后验与先验的对数密度比，
//! 编码器/解码器（primal）与判别器（dual）各用一个Adam优化器交替地在同一批数据上更新。
//!
//! 主要模块：
//! - `config`：训练配置（JSON）
//! - `distribution`：隐变量先验
//! - `nn`：基于ndarray的全连接网络、手写反向传播与Adam
//! - `model`：编码器、解码器、判别器的调用约定与默认实现
//! - `objective`：primal / dual 目标函数及adaptive contrast
//! - `train`：两阶段训练步、检查点、训练主循环
//! - `data`、`vision`：取数与采样图片输出
//!

pub mod config;
pub mod data;
pub mod distribution;
pub mod errors;
pub mod model;
pub mod nn;
pub mod objective;
pub mod train;
pub mod vision;

pub use config::TrainConfig;
pub use errors::{AvbError, AvbResult};
pub use train::{StopHandle, TrainOutcome, Trainer, train};
