/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : Layer 模块
 */

mod linear;

pub use linear::Linear;
