use std::fs::File;
use std::path::Path;

use ndarray::{Array2, Array4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tiff::encoder::{colortype, TiffEncoder};

use coloc_core::frame::ImageStack;

/// Uniform random intensities in [0, 255), reproducible from `seed`.
pub fn random_channel(h: usize, w: usize, seed: u64) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((h, w), |_| rng.random_range(0.0..255.0f32))
}

/// Background of `background` with bright squares of side `size` whose
/// top-left corners are given as (row, col).
pub fn blob_channel(h: usize, w: usize, corners: &[(usize, usize)], size: usize) -> Array2<f32> {
    let mut data = Array2::<f32>::from_elem((h, w), 10.0);
    for &(r0, c0) in corners {
        for r in r0..(r0 + size).min(h) {
            for c in c0..(c0 + size).min(w) {
                data[[r, c]] = 200.0;
            }
        }
    }
    data
}

/// Stack several frames, each given as its list of channels.
pub fn build_stack(frames: &[Vec<Array2<f32>>]) -> ImageStack {
    let (h, w) = frames[0][0].dim();
    let channels = frames[0].len();
    let mut data = Array4::<f32>::zeros((h, w, channels, frames.len()));
    for (f, chans) in frames.iter().enumerate() {
        for (c, chan) in chans.iter().enumerate() {
            for ((r, col), &v) in chan.indexed_iter() {
                data[[r, col, c, f]] = v;
            }
        }
    }
    ImageStack::new(data)
}

/// Interleave up to three channels into 8-bit RGB samples.
pub fn to_rgb8(channels: &[Array2<f32>]) -> Vec<u8> {
    let (h, w) = channels[0].dim();
    let mut out = Vec::with_capacity(h * w * 3);
    for r in 0..h {
        for c in 0..w {
            for s in 0..3 {
                let v = channels.get(s).map(|ch| ch[[r, c]]).unwrap_or(0.0);
                out.push(v.clamp(0.0, 255.0) as u8);
            }
        }
    }
    out
}

/// Write a multi-page 8-bit RGB TIFF, one page per frame.
pub fn write_rgb_tiff(path: &Path, width: u32, height: u32, pages: &[Vec<u8>]) {
    let file = File::create(path).expect("create tiff");
    let mut encoder = TiffEncoder::new(file).expect("tiff encoder");
    for page in pages {
        encoder
            .write_image::<colortype::RGB8>(width, height, page)
            .expect("write rgb page");
    }
}

/// Write a multi-page 8-bit grayscale TIFF.
pub fn write_gray_tiff(path: &Path, width: u32, height: u32, pages: &[Vec<u8>]) {
    let file = File::create(path).expect("create tiff");
    let mut encoder = TiffEncoder::new(file).expect("tiff encoder");
    for page in pages {
        encoder
            .write_image::<colortype::Gray8>(width, height, page)
            .expect("write gray page");
    }
}
