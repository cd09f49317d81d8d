/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : 负责神经网络（neural network）的构建
 *
 * 与通用的计算图不同，这里每一层都显式地给出前向与反向：
 * - 前向返回输出以及反向所需的缓存（tape），层本身保持不可变
 * - 反向把参数梯度按参数名累加进 `Gradients`，并返回对输入的梯度
 *
 * 由于前向/反向都只需要 `&self`，“先算完所有梯度、再统一更新参数”的两阶段训练步
 * 可以直接由借用规则保证。
 */

mod activation;
pub mod functional;
mod gradients;
pub mod layer;
mod mlp;
mod module;
pub mod optimizer;
mod param;

pub use activation::Activation;
pub use gradients::{GradientList, Gradients};
pub use layer::Linear;
pub use mlp::{Mlp, MlpTape};
pub use module::{Module, StateDict, ensure_unique_names};
pub use optimizer::Adam;
pub use param::Param;

#[cfg(test)]
pub(crate) mod tests;
