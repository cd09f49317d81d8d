/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : Module trait 定义
 */

use std::collections::{BTreeMap, HashSet};

use ndarray::Array2;

use super::Param;
use crate::errors::{AvbError, AvbResult};

/// 参数名到参数值的有序映射（用于检查点）
pub type StateDict = BTreeMap<String, Array2<f32>>;

/// 模块 trait
///
/// # 设计原则
/// - `forward()` **不是** trait 方法（签名各异）
/// - `parameters()` / `parameters_mut()` 签名一致，放入 trait
/// - 保存/加载参数基于参数名，由默认方法实现
pub trait Module {
    /// 获取所有可训练参数
    fn parameters(&self) -> Vec<&Param>;

    /// 获取所有可训练参数的可变引用（供优化器和加载检查点使用）
    fn parameters_mut(&mut self) -> Vec<&mut Param>;

    /// 标量参数总数
    fn num_params(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }

    /// 导出所有参数
    fn state_dict(&self) -> StateDict {
        self.parameters()
            .into_iter()
            .map(|p| (p.name().to_string(), p.value().clone()))
            .collect()
    }

    /// 按名称加载参数，名称缺失或形状不一致都会报错
    fn load_state_dict(&mut self, state: &StateDict) -> AvbResult<()> {
        for param in self.parameters_mut() {
            let value = state
                .get(param.name())
                .ok_or_else(|| AvbError::Checkpoint(format!("缺少参数`{}`", param.name())))?;
            if value.shape() != param.shape() {
                return Err(AvbError::shape_mismatch(
                    param.shape(),
                    value.shape(),
                    format!("加载参数`{}`", param.name()),
                ));
            }
            param.value_mut().assign(value);
        }
        Ok(())
    }
}

/// 检查一组参数的名称互不相同
///
/// 梯度与检查点都按参数名索引，多个模块合在一起训练时名称必须全局唯一
pub fn ensure_unique_names<'a>(params: impl IntoIterator<Item = &'a Param>) -> AvbResult<()> {
    let mut seen = HashSet::new();
    for param in params {
        if !seen.insert(param.name()) {
            return Err(AvbError::InvalidConfig(format!(
                "参数名`{}`重复，各子模型的参数名必须互不相同",
                param.name()
            )));
        }
    }
    Ok(())
}
