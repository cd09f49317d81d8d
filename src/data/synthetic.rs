/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 合成“条纹”数据集：每张单通道图像上有一条横线或竖线
 *
 * 背景为 -1，条纹为 1，再叠加少量高斯噪声后截断到 [-1, 1]。
 * 数据分布有 2*size 个离散模式，适合在几秒内观察 AVB 的重建与采样效果。
 */

use ndarray::{Array4, s};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use super::ImageDataset;

const NOISE_STD: f32 = 0.05;

/// 生成 `n` 张 `size x size x 1` 的条纹图像
pub fn bars(n: usize, size: usize, seed: u64) -> ImageDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut images = Array4::from_elem((n, size, size, 1), -1.0f32);
    if size == 0 {
        return ImageDataset::new(images);
    }

    for mut image in images.outer_iter_mut() {
        let position = rng.gen_range(0..size);
        if rng.gen_bool(0.5) {
            image.slice_mut(s![position, .., ..]).fill(1.0);
        } else {
            image.slice_mut(s![.., position, ..]).fill(1.0);
        }
    }

    images.mapv_inplace(|v| {
        let noise: f32 = rng.sample(StandardNormal);
        (v + NOISE_STD * noise).clamp(-1.0, 1.0)
    });
    ImageDataset::new(images)
}
