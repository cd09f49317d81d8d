/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 本模块负责把一批图像张量拼成网格并保存为图片。
 *                 在本模块中，不严谨地说：
 *                 1. 单通道的图像按灰度图保存，3通道的按RGB图保存；
 *                 2. 传入的张量须已处于显示值域[0, 1]，超出部分会被截断。
 */

use std::fs;
use std::path::Path;

use image::{GrayImage, Luma, Rgb, RgbImage};
use ndarray::{Array4, ArrayView3, Axis};

use crate::errors::{AvbError, AvbResult};

#[cfg(test)]
mod tests;

/// 采样图片的网格：8 行 8 列，即最多 64 张
pub const SAMPLE_GRID: [usize; 2] = [8, 8];

/// 模型内部值域 [-1, 1] -> 显示值域 [0, 1]
pub fn rescale_to_display(images: &Array4<f32>) -> Array4<f32> {
    images.mapv(|v| 0.5 * (v + 1.0))
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// 图片写出端
///
/// 训练循环只依赖这个 trait，测试中可以换成只记录调用的实现
pub trait ImageSink {
    /// 把 `images`（[batch, H, W, C]，显示值域）拼成 `grid` = [行, 列] 的网格写到 `path`
    fn save_images(&mut self, images: &Array4<f32>, grid: [usize; 2], path: &Path) -> AvbResult<()>;
}

/// 默认实现：用 `image` crate 写出 PNG 文件
#[derive(Debug, Clone, Copy, Default)]
pub struct PngGridWriter;

impl ImageSink for PngGridWriter {
    fn save_images(
        &mut self,
        images: &Array4<f32>,
        grid: [usize; 2],
        path: &Path,
    ) -> AvbResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        match images.dim().3 {
            1 => tile_luma(images, grid)?.save(path)?,
            3 => tile_rgb(images, grid)?.save(path)?,
            c => {
                return Err(AvbError::NotImplemented(format!(
                    "保存{c}通道的图像，目前只支持1或3通道"
                )));
            }
        }
        Ok(())
    }
}

/// 第 `index` 张图片在网格中左上角的像素坐标；超出网格的图片被丢弃
fn cell_origin(index: usize, grid: [usize; 2], h: usize, w: usize) -> Option<(u32, u32)> {
    let [rows, cols] = grid;
    if index >= rows * cols {
        return None;
    }
    let (row, col) = (index / cols, index % cols);
    Some(((col * w) as u32, (row * h) as u32))
}

fn check_grid(images: &Array4<f32>, grid: [usize; 2]) -> AvbResult<(usize, usize)> {
    let [rows, cols] = grid;
    if rows == 0 || cols == 0 {
        return Err(AvbError::InvalidConfig(format!("图片网格{grid:?}不能为空")));
    }
    let (_, h, w, _) = images.dim();
    Ok((h, w))
}

fn for_each_cell<F>(images: &Array4<f32>, grid: [usize; 2], h: usize, w: usize, mut put: F)
where
    F: FnMut(u32, u32, ArrayView3<f32>),
{
    for (index, image) in images.axis_iter(Axis(0)).enumerate() {
        let Some((x0, y0)) = cell_origin(index, grid, h, w) else {
            break;
        };
        put(x0, y0, image);
    }
}

/// 单通道图片拼成灰度网格，空格子保持黑色
pub fn tile_luma(images: &Array4<f32>, grid: [usize; 2]) -> AvbResult<GrayImage> {
    let (h, w) = check_grid(images, grid)?;
    let [rows, cols] = grid;
    let mut canvas = GrayImage::new((cols * w) as u32, (rows * h) as u32);
    for_each_cell(images, grid, h, w, |x0, y0, image| {
        for ((y, x, _), &v) in image.indexed_iter() {
            canvas.put_pixel(x0 + x as u32, y0 + y as u32, Luma([to_u8(v)]));
        }
    });
    Ok(canvas)
}

/// 3通道图片拼成RGB网格
pub fn tile_rgb(images: &Array4<f32>, grid: [usize; 2]) -> AvbResult<RgbImage> {
    let (h, w) = check_grid(images, grid)?;
    let [rows, cols] = grid;
    let mut canvas = RgbImage::new((cols * w) as u32, (rows * h) as u32);
    for_each_cell(images, grid, h, w, |x0, y0, image| {
        for y in 0..h {
            for x in 0..w {
                let pixel = Rgb([
                    to_u8(image[[y, x, 0]]),
                    to_u8(image[[y, x, 1]]),
                    to_u8(image[[y, x, 2]]),
                ]);
                canvas.put_pixel(x0 + x as u32, y0 + y as u32, pixel);
            }
        }
    });
    Ok(canvas)
}
