/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : 优化器模块
 */

mod adam;

pub use adam::Adam;
