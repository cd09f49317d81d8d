/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : BatchLoader - 无限循环的图像批量加载器
 *
 * 与按 epoch 迭代的加载器不同，训练循环只关心“下一批”：
 * - 每批大小固定（不足一批的尾部丢弃）
 * - 一轮取完后重新生成索引，打乱时每轮顺序不同
 */

use ndarray::{Array4, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::errors::{AvbError, AvbResult};

/// 训练循环的数据来源
pub trait BatchSource {
    /// 取下一批 `[batch, H, W, C]` 图像
    fn next_batch(&mut self) -> AvbResult<Array4<f32>>;
}

/// 内存中的一组图像，第一维为样本数
#[derive(Debug, Clone)]
pub struct ImageDataset {
    images: Array4<f32>,
}

impl ImageDataset {
    pub fn new(images: Array4<f32>) -> Self {
        Self { images }
    }

    pub fn len(&self) -> usize {
        self.images.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 单张图像的形状 `[H, W, C]`
    pub fn image_shape(&self) -> [usize; 3] {
        let (_, h, w, c) = self.images.dim();
        [h, w, c]
    }

    pub fn images(&self) -> &Array4<f32> {
        &self.images
    }
}

/// 批量加载器
///
/// # 示例
/// ```ignore
/// let mut loader = BatchLoader::new(dataset, 32)?.shuffle(true).seed(42);
/// let x_real = loader.next_batch()?;
/// ```
pub struct BatchLoader {
    dataset: ImageDataset,
    batch_size: usize,
    shuffle: bool,
    rng: StdRng,
    indices: Vec<usize>,
    cursor: usize,
    epoch: usize,
}

impl BatchLoader {
    /// 数据集至少要能凑出一整批
    pub fn new(dataset: ImageDataset, batch_size: usize) -> AvbResult<Self> {
        if batch_size == 0 {
            return Err(AvbError::InvalidConfig("batch_size须大于0".to_string()));
        }
        if dataset.len() < batch_size {
            return Err(AvbError::InvalidConfig(format!(
                "数据集只有{}个样本，不足一批（{batch_size}）",
                dataset.len()
            )));
        }
        let indices = (0..dataset.len()).collect();
        Ok(Self {
            dataset,
            batch_size,
            shuffle: false,
            rng: StdRng::from_entropy(),
            indices,
            cursor: 0,
            epoch: 0,
        })
    }

    /// 设置是否打乱数据
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self.reset();
        self
    }

    /// 设置随机种子（用于 shuffle）
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self.reset();
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// 已完整取完的轮数
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn dataset(&self) -> &ImageDataset {
        &self.dataset
    }

    fn reset(&mut self) {
        self.indices = (0..self.dataset.len()).collect();
        if self.shuffle {
            self.indices.shuffle(&mut self.rng);
        }
        self.cursor = 0;
    }
}

impl BatchSource for BatchLoader {
    fn next_batch(&mut self) -> AvbResult<Array4<f32>> {
        if self.cursor + self.batch_size > self.indices.len() {
            self.epoch += 1;
            self.reset();
        }
        let batch_indices = &self.indices[self.cursor..self.cursor + self.batch_size];
        self.cursor += self.batch_size;
        Ok(self.dataset.images.select(Axis(0), batch_indices))
    }
}
