//! Square reshape by bicubic resampling.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};
use ndarray::{s, Array2, Array4, ArrayView2};
use rayon::prelude::*;

use crate::consts::PARALLEL_SLICE_THRESHOLD;
use crate::frame::ImageStack;

/// Resample a 2-D image to `out_h x out_w` with Catmull-Rom filtering.
///
/// Float pixels are clamped to [0, 1] by the resizer, so the slice is mapped
/// into that range and back. The output therefore stays within the input's
/// value range, and a constant slice stays constant.
pub fn resample_bicubic(src: &ArrayView2<f32>, out_h: usize, out_w: usize) -> Array2<f32> {
    let (h, w) = src.dim();
    if (h, w) == (out_h, out_w) {
        return src.to_owned();
    }
    let (lo, hi) = src
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = hi - lo;
    if !(range > 0.0) {
        return Array2::from_elem((out_h, out_w), if lo.is_finite() { lo } else { 0.0 });
    }

    let unit: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(w as u32, h as u32, |x, y| {
            Luma([(src[[y as usize, x as usize]] - lo) / range])
        });
    let resized = imageops::resize(&unit, out_w as u32, out_h as u32, FilterType::CatmullRom);
    Array2::from_shape_fn((out_h, out_w), |(row, col)| {
        (lo + resized.get_pixel(col as u32, row as u32)[0] * range).clamp(lo, hi)
    })
}

/// Resample every frame/channel of the stack to `min(h, w)` square.
///
/// The target side is derived from the stack's current shape, so a square
/// stack comes back unchanged.
pub fn reshape_square(stack: &ImageStack) -> ImageStack {
    if stack.is_square() {
        return stack.clone();
    }
    let side = stack.height().min(stack.width());
    let (channels, frames) = (stack.channel_count(), stack.frame_count());

    let slices: Vec<(usize, usize)> = (0..frames)
        .flat_map(|f| (0..channels).map(move |c| (c, f)))
        .collect();
    let resample = |&(c, f): &(usize, usize)| {
        resample_bicubic(&stack.data.slice(s![.., .., c, f]), side, side)
    };
    let resampled: Vec<Array2<f32>> = if slices.len() >= PARALLEL_SLICE_THRESHOLD {
        slices.par_iter().map(resample).collect()
    } else {
        slices.iter().map(resample).collect()
    };

    let mut data = Array4::<f32>::zeros((side, side, channels, frames));
    for (&(c, f), slice) in slices.iter().zip(resampled.iter()) {
        data.slice_mut(s![.., .., c, f]).assign(slice);
    }
    ImageStack::new(data)
}
