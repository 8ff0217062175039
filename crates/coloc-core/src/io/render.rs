use std::path::Path;

use image::imageops;
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_circle_mut;
use ndarray::ArrayView3;

use crate::consts::MARKER_RADIUS;
use crate::error::{ColocError, Result};
use crate::frame::PlotPoint;

pub const ICA_MARKER: Rgb<u8> = Rgb([255, 255, 255]);
pub const PAIR_MARKER: Rgb<u8> = Rgb([0, 255, 0]);

/// Compose two channels of a frame into an 8-bit RGB image: the first
/// channel in red, the second in green. Each channel is scaled by its own
/// maximum so raw and normalized frames render alike.
pub fn composite(frame: &ArrayView3<f32>, channels: [usize; 2]) -> Result<RgbImage> {
    let (h, w, n) = frame.dim();
    for &c in &channels {
        if c >= n {
            return Err(ColocError::ChannelIndexOutOfRange { index: c, total: n });
        }
    }
    let scale = |c: usize| {
        let max = frame
            .index_axis(ndarray::Axis(2), c)
            .iter()
            .cloned()
            .fold(0.0f32, f32::max);
        if max > 0.0 {
            255.0 / max
        } else {
            0.0
        }
    };
    let (sr, sg) = (scale(channels[0]), scale(channels[1]));

    let mut img = RgbImage::new(w as u32, h as u32);
    for row in 0..h {
        for col in 0..w {
            let r = (frame[[row, col, channels[0]]].max(0.0) * sr).min(255.0) as u8;
            let g = (frame[[row, col, channels[1]]].max(0.0) * sg).min(255.0) as u8;
            img.put_pixel(col as u32, row as u32, Rgb([r, g, 0]));
        }
    }
    Ok(img)
}

/// Render the original/normalized pair with markers on both halves and save
/// it as PNG.
pub fn save_annotated_pair(
    path: &Path,
    original: &ArrayView3<f32>,
    normalized: &ArrayView3<f32>,
    channels: [usize; 2],
    markers: &[PlotPoint],
    color: Rgb<u8>,
) -> Result<()> {
    let mut left = composite(original, channels)?;
    let mut right = composite(normalized, channels)?;
    // Each half clips its own markers.
    for p in markers {
        let center = (p.x as i32, p.y as i32);
        draw_hollow_circle_mut(&mut left, center, MARKER_RADIUS, color);
        draw_hollow_circle_mut(&mut right, center, MARKER_RADIUS, color);
    }

    let mut img = RgbImage::new(
        left.width() + right.width(),
        left.height().max(right.height()),
    );
    imageops::replace(&mut img, &left, 0, 0);
    imageops::replace(&mut img, &right, left.width() as i64, 0);
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_markers_drawn_on_both_halves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pair.png");
        let frame = Array3::<f32>::zeros((21, 21, 2));
        let markers = [PlotPoint { x: 10, y: 10 }];
        save_annotated_pair(&path, &frame.view(), &frame.view(), [0, 1], &markers, PAIR_MARKER)
            .unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (42, 21));
        assert_eq!(*img.get_pixel(15, 10), PAIR_MARKER);
        assert_eq!(*img.get_pixel(21 + 15, 10), PAIR_MARKER);
        assert_eq!(*img.get_pixel(10, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_marker_near_border_is_clipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edge.png");
        let frame = Array3::<f32>::zeros((21, 21, 2));
        let markers = [PlotPoint { x: 20, y: 10 }];
        save_annotated_pair(&path, &frame.view(), &frame.view(), [0, 1], &markers, ICA_MARKER)
            .unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(*img.get_pixel(15, 10), ICA_MARKER);
        assert_eq!(*img.get_pixel(21 + 15, 10), ICA_MARKER);
        // The left half's circle does not spill into the right half.
        assert_eq!(*img.get_pixel(21 + 4, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_composite_scales_each_channel() {
        let mut frame = Array3::<f32>::zeros((2, 2, 2));
        frame[[0, 0, 0]] = 4.0;
        frame[[1, 1, 1]] = 0.5;
        let img = composite(&frame.view(), [0, 1]).unwrap();
        assert_eq!(*img.get_pixel(0, 0), Rgb([255, 0, 0]));
        assert_eq!(*img.get_pixel(1, 1), Rgb([0, 255, 0]));
    }
}
