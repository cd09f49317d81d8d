//! BatchLoader 单元测试

use ndarray::Array4;

use crate::data::{BatchLoader, BatchSource, ImageDataset};
use crate::errors::AvbError;

/// 第 i 张图像的所有像素都等于 i
fn indexed_dataset(n: usize) -> ImageDataset {
    ImageDataset::new(Array4::from_shape_fn((n, 2, 2, 1), |(i, _, _, _)| i as f32))
}

fn ids(batch: &Array4<f32>) -> Vec<usize> {
    batch.outer_iter().map(|image| image[[0, 0, 0]] as usize).collect()
}

#[test]
fn test_image_dataset() {
    let dataset = indexed_dataset(3);
    assert_eq!(dataset.len(), 3);
    assert!(!dataset.is_empty());
    assert_eq!(dataset.image_shape(), [2, 2, 1]);
}

#[test]
fn test_loader_sequential_batches_wrap_around() {
    let mut loader = BatchLoader::new(indexed_dataset(5), 2).unwrap();
    assert_eq!(ids(&loader.next_batch().unwrap()), vec![0, 1]);
    assert_eq!(ids(&loader.next_batch().unwrap()), vec![2, 3]);
    assert_eq!(loader.epoch(), 0);
    // 尾部不足一批的样本 4 被丢弃，开始新的一轮
    assert_eq!(ids(&loader.next_batch().unwrap()), vec![0, 1]);
    assert_eq!(loader.epoch(), 1);
}

#[test]
fn test_loader_batch_shape() {
    let mut loader = BatchLoader::new(indexed_dataset(10), 4).unwrap();
    assert_eq!(loader.batch_size(), 4);
    for _ in 0..7 {
        assert_eq!(loader.next_batch().unwrap().shape(), &[4, 2, 2, 1]);
    }
}

#[test]
fn test_loader_shuffle_with_seed() {
    // 使用相同种子，两个加载器应该产生相同的批次
    let mut loader1 = BatchLoader::new(indexed_dataset(10), 3).unwrap().shuffle(true).seed(42);
    let mut loader2 = BatchLoader::new(indexed_dataset(10), 3).unwrap().shuffle(true).seed(42);
    for _ in 0..5 {
        assert_eq!(loader1.next_batch().unwrap(), loader2.next_batch().unwrap());
    }
}

#[test]
fn test_loader_shuffle_is_permutation_within_epoch() {
    let mut loader = BatchLoader::new(indexed_dataset(6), 2).unwrap().shuffle(true).seed(7);
    let mut seen: Vec<usize> = (0..3).flat_map(|_| ids(&loader.next_batch().unwrap())).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..6).collect::<Vec<_>>());
}

#[test]
fn test_loader_rejects_too_small_dataset() {
    let err = BatchLoader::new(indexed_dataset(3), 4).err();
    assert!(matches!(err, Some(AvbError::InvalidConfig(_))));
    let err = BatchLoader::new(indexed_dataset(3), 0).err();
    assert!(matches!(err, Some(AvbError::InvalidConfig(_))));
}
