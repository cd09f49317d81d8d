use ndarray::Array4;

use crate::errors::AvbError;
use crate::vision::{ImageSink, PngGridWriter, rescale_to_display, tile_luma, tile_rgb};

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓值域↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[test]
fn test_rescale_to_display() {
    let x = Array4::from_shape_vec((1, 1, 3, 1), vec![-1.0, 0.0, 1.0]).unwrap();
    let y = rescale_to_display(&x);
    assert_eq!(y.iter().copied().collect::<Vec<_>>(), vec![0.0, 0.5, 1.0]);
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑值域↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓拼图↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[test]
fn test_tile_luma_layout() {
    // 3 张 1x2 的图片放进 2x2 网格，第 4 格为空
    let images = Array4::from_shape_vec((3, 1, 2, 1), vec![0.0, 1.0, 1.0, 1.0, 0.5, 0.0]).unwrap();
    let canvas = tile_luma(&images, [2, 2]).unwrap();
    assert_eq!(canvas.dimensions(), (4, 2));
    assert_eq!(canvas.get_pixel(0, 0)[0], 0);
    assert_eq!(canvas.get_pixel(1, 0)[0], 255);
    assert_eq!(canvas.get_pixel(2, 0)[0], 255);
    assert_eq!(canvas.get_pixel(0, 1)[0], 128);
    assert_eq!(canvas.get_pixel(1, 1)[0], 0);
    assert_eq!(canvas.get_pixel(3, 1)[0], 0);
}

#[test]
fn test_tile_drops_images_beyond_grid() {
    let images = Array4::<f32>::ones((5, 1, 1, 1));
    let canvas = tile_luma(&images, [1, 2]).unwrap();
    assert_eq!(canvas.dimensions(), (2, 1));
}

#[test]
fn test_tile_clamps_out_of_range_values() {
    let images = Array4::from_shape_vec((1, 1, 2, 1), vec![-0.5, 1.5]).unwrap();
    let canvas = tile_luma(&images, [1, 1]).unwrap();
    assert_eq!(canvas.get_pixel(0, 0)[0], 0);
    assert_eq!(canvas.get_pixel(0, 1)[0], 255);
}

#[test]
fn test_tile_rgb() {
    let images = Array4::from_shape_vec((1, 1, 1, 3), vec![1.0, 0.0, 0.5]).unwrap();
    let canvas = tile_rgb(&images, [1, 1]).unwrap();
    assert_eq!(canvas.get_pixel(0, 0).0, [255, 0, 128]);
}

#[test]
fn test_empty_grid_is_rejected() {
    let images = Array4::<f32>::zeros((1, 2, 2, 1));
    assert!(matches!(tile_luma(&images, [0, 8]), Err(AvbError::InvalidConfig(_))));
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑拼图↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓保存、载入↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[test]
fn test_png_writer_creates_parent_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("samples").join("grid.png");
    let images = Array4::<f32>::from_elem((4, 3, 3, 1), 0.25);
    PngGridWriter.save_images(&images, [2, 2], &path).unwrap();

    let loaded = image::open(&path).unwrap().to_luma8();
    assert_eq!(loaded.dimensions(), (6, 6));
    assert_eq!(loaded.get_pixel(5, 5)[0], 64);
}

#[test]
fn test_png_writer_rejects_unsupported_channels() {
    let dir = tempfile::tempdir().unwrap();
    let images = Array4::<f32>::zeros((1, 2, 2, 2));
    let err = PngGridWriter
        .save_images(&images, [1, 1], &dir.path().join("x.png"))
        .unwrap_err();
    assert!(matches!(err, AvbError::NotImplemented(_)));
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑保存、载入↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
