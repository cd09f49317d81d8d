/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : AVB 训练过程中所有可能出现的错误类型
 */

use thiserror::Error;

/// 整个 crate 统一使用的结果类型
pub type AvbResult<T> = Result<T, AvbError>;

#[derive(Error, Debug)]
pub enum AvbError {
    /// 尚未支持的功能（如非高斯先验）
    #[error("尚未实现：{0}")]
    NotImplemented(String),

    /// 配置项非法
    #[error("配置错误：{0}")]
    InvalidConfig(String),

    /// 张量形状不匹配
    #[error("形状不匹配（{message}）：期望{expected:?}，实际{got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },

    /// 检查点内容与当前模型不一致
    #[error("检查点错误：{0}")]
    Checkpoint(String),

    #[error("IO 错误：{0}")]
    Io(#[from] std::io::Error),

    #[error("图像错误：{0}")]
    Image(#[from] image::ImageError),

    #[error("JSON 错误：{0}")]
    Json(#[from] serde_json::Error),

    #[error("二进制序列化错误：{0}")]
    Bincode(#[from] bincode::Error),
}

impl AvbError {
    /// 构造形状不匹配错误的便捷方法
    pub fn shape_mismatch(expected: &[usize], got: &[usize], message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
            message: message.into(),
        }
    }
}
