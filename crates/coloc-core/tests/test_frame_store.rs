#[allow(dead_code)]
mod common;

use approx::assert_abs_diff_eq;
use ndarray::Array2;
use tempfile::TempDir;

use coloc_core::error::{ColocError, ErrorKind};
use coloc_core::io::{check_stack_path, LoaderConfig};
use coloc_core::preprocess::{FrameStore, NormalizeScope, Threshold};

fn write_two_frame_rgb(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("stack.tif");
    let f0 = [
        common::random_channel(6, 4, 1),
        common::random_channel(6, 4, 2),
    ];
    let f1 = [
        common::random_channel(6, 4, 3),
        common::random_channel(6, 4, 4),
    ];
    common::write_rgb_tiff(&path, 4, 6, &[common::to_rgb8(&f0), common::to_rgb8(&f1)]);
    path
}

#[test]
fn test_open_rgb_stack() {
    let dir = TempDir::new().unwrap();
    let path = write_two_frame_rgb(&dir);
    let store = FrameStore::open(&path, &LoaderConfig::default()).unwrap();

    assert_eq!(store.frame_count(), 2);
    assert_eq!(store.channel_count(), 3);
    assert_eq!(store.dims(), (6, 4));
    let info = store.info().unwrap();
    assert_eq!(info.total_frames, 2);
    assert_eq!((info.width, info.height), (4, 6));
    assert_eq!(info.bit_depth, 8);

    let expected = common::random_channel(6, 4, 3)[[5, 2]].clamp(0.0, 255.0) as u8;
    assert_eq!(store.raw_slice(1, 0).unwrap()[[5, 2]], expected as f32);
    // The unused blue channel is written as zeros.
    assert!(store.raw_slice(0, 2).unwrap().iter().all(|&v| v == 0.0));
}

#[test]
fn test_reshape_to_square() {
    let dir = TempDir::new().unwrap();
    let path = write_two_frame_rgb(&dir);
    let mut store = FrameStore::open(&path, &LoaderConfig::default()).unwrap();

    assert!(store.reshape_square());
    assert_eq!(store.dims(), (4, 4));
    assert_eq!(store.frame_count(), 2);
    assert_eq!(store.channel_count(), 3);
    assert_eq!(store.normalized().data.shape(), store.raw().data.shape());
    assert!(!store.reshape_square());
}

#[test]
fn test_reshape_stays_within_source_range() {
    let dir = TempDir::new().unwrap();
    let path = write_two_frame_rgb(&dir);
    let mut store = FrameStore::open(&path, &LoaderConfig::default()).unwrap();
    let before = store.raw_slice(0, 0).unwrap().to_owned();
    let (lo, hi) = before
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    store.reshape_square();
    for &v in store.raw_slice(0, 0).unwrap().iter() {
        assert!(v >= lo && v <= hi);
    }
}

#[test]
fn test_reshape_keeps_constant_slice_constant() {
    let stack = common::build_stack(&[vec![
        Array2::from_elem((6, 24), 42.0f32),
        common::random_channel(6, 24, 9),
    ]]);
    let mut store = FrameStore::from_stack(stack).unwrap();
    assert!(store.reshape_square());
    assert_eq!(store.dims(), (6, 6));
    assert!(store.raw_slice(0, 0).unwrap().iter().all(|&v| v == 42.0));
}

#[test]
fn test_reshape_keeps_thin_feature_on_large_downscale() {
    let mut line = Array2::<f32>::zeros((8, 64));
    line.column_mut(7).fill(255.0);
    let stack = common::build_stack(&[vec![line, common::random_channel(8, 64, 5)]]);
    let mut store = FrameStore::from_stack(stack).unwrap();

    assert!(store.reshape_square());
    assert_eq!(store.dims(), (8, 8));
    let out = store.raw_slice(0, 0).unwrap();
    for row in out.rows() {
        assert!(row[0] > 0.0, "line lost after downscale: {row}");
        assert!(row.iter().all(|&v| (0.0..=255.0).contains(&v)));
    }
}

#[test]
fn test_missing_file_rejected() {
    let dir = TempDir::new().unwrap();
    let err = FrameStore::open(&dir.path().join("absent.tif"), &LoaderConfig::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_wrong_extension_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stack.png");
    std::fs::write(&path, b"not a tiff").unwrap();
    let err = check_stack_path(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_uppercase_extension_accepted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("STACK.TIFF");
    std::fs::write(&path, b"").unwrap();
    assert!(check_stack_path(&path).is_ok());
}

#[test]
fn test_grayscale_hyperstack_grouping() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hyper.tiff");
    let pages: Vec<Vec<u8>> = (0..4u8).map(|i| vec![i * 10 + 1; 5 * 5]).collect();
    common::write_gray_tiff(&path, 5, 5, &pages);

    let loader = LoaderConfig {
        channels_per_frame: Some(2),
    };
    let store = FrameStore::open(&path, &loader).unwrap();
    assert_eq!(store.frame_count(), 2);
    assert_eq!(store.channel_count(), 2);
    assert_eq!(store.raw_slice(1, 0).unwrap()[[0, 0]], 21.0);
    assert_eq!(store.raw_slice(1, 1).unwrap()[[4, 4]], 31.0);

    let flat = FrameStore::open(&path, &LoaderConfig::default()).unwrap();
    assert_eq!(flat.frame_count(), 4);
    assert_eq!(flat.channel_count(), 1);
}

#[test]
fn test_normalize_leaves_raw_untouched() {
    let stack = common::build_stack(&[vec![
        common::random_channel(8, 8, 1),
        common::random_channel(8, 8, 2),
    ]]);
    let original = stack.data.clone();
    let mut store = FrameStore::from_stack(stack).unwrap();
    store.normalize_all(Threshold::Cutoff(0.5), NormalizeScope::PerFrame);

    assert_eq!(store.raw().data, original);
    let max = store
        .normalized_slice(0, 1)
        .unwrap()
        .iter()
        .cloned()
        .fold(0.0f32, f32::max);
    assert_abs_diff_eq!(max, 1.0);
}

#[test]
fn test_renormalize_starts_from_raw() {
    let stack = common::build_stack(&[vec![
        common::random_channel(8, 8, 1),
        common::random_channel(8, 8, 2),
    ]]);
    let mut store = FrameStore::from_stack(stack).unwrap();
    store.normalize_all(Threshold::Cutoff(0.9), NormalizeScope::PerFrame);
    store.normalize_all(Threshold::Off, NormalizeScope::PerFrame);
    let zeros = store
        .normalized_slice(0, 0)
        .unwrap()
        .iter()
        .filter(|&&v| v == 0.0)
        .count();
    // Only the minimum maps to zero once the cutoff is gone.
    assert_eq!(zeros, 1);
}

#[test]
fn test_index_out_of_range() {
    let stack = common::build_stack(&[vec![Array2::zeros((3, 3)), Array2::ones((3, 3))]]);
    let store = FrameStore::from_stack(stack).unwrap();
    assert!(matches!(
        store.raw_frame(3).unwrap_err(),
        ColocError::FrameIndexOutOfRange { index: 3, total: 1 }
    ));
    assert!(matches!(
        store.normalized_slice(0, 2).unwrap_err(),
        ColocError::ChannelIndexOutOfRange { index: 2, total: 2 }
    ));
}
