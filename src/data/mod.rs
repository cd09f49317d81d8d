//! 数据加载模块
//!
//! 训练循环每次迭代从 [`BatchSource`] 取一批 `[batch, H, W, C]`、值域 `[-1, 1]` 的真实图像。
//!
//! # 主要组件
//!
//! - [`BatchSource`]: 训练循环依赖的取数接口
//! - [`ImageDataset`]: 内存中的一组图像
//! - [`BatchLoader`]: 循环不止、可打乱的批量加载器
//! - [`synthetic`]: 用于演示和测试的合成“条纹”数据集
//!
//! # 使用示例
//!
//! ```ignore
//! use avb::data::{BatchLoader, BatchSource, synthetic};
//!
//! let dataset = synthetic::bars(512, 8, 42);
//! let mut loader = BatchLoader::new(dataset, 64)?.shuffle(true).seed(42);
//! let x_real = loader.next_batch()?;
//! ```

mod dataloader;
pub mod synthetic;

#[cfg(test)]
mod tests;

pub use dataloader::{BatchLoader, BatchSource, ImageDataset};
