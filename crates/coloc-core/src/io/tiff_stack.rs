//! Multi-page TIFF stack loading.
//!
//! Every page of the file is decoded. A page's samples per pixel become the
//! channels of one frame, unless `channels_per_frame` is set, in which case
//! consecutive single-sample pages are grouped into one multi-channel frame
//! (the layout ImageJ writes for composite hyperstacks).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::Array4;
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;
use tracing::debug;

use crate::consts::STACK_EXTENSIONS;
use crate::error::{ColocError, Result};
use crate::frame::{ImageStack, SourceInfo};

/// How pages of the source file map onto frames and channels.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Group this many consecutive grayscale pages into one frame.
    #[serde(default)]
    pub channels_per_frame: Option<usize>,
}

struct DecodedPage {
    width: usize,
    height: usize,
    samples: usize,
    bit_depth: u8,
    values: Vec<f32>,
}

/// Fail with `InvalidInput` unless `path` exists and has a stack extension.
pub fn check_stack_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(ColocError::invalid(format!(
            "source file {} does not exist",
            path.display()
        )));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext {
        Some(ref e) if STACK_EXTENSIONS.contains(&e.as_str()) => Ok(()),
        _ => Err(ColocError::invalid(format!(
            "{} is not a recognised image stack (expected .tif or .tiff)",
            path.display()
        ))),
    }
}

/// Load a TIFF stack into a `(height, width, channel, frame)` array.
pub fn read_stack(path: &Path, config: &LoaderConfig) -> Result<(ImageStack, SourceInfo)> {
    check_stack_path(path)?;

    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?;
    let mut pages = Vec::new();
    loop {
        pages.push(decode_page(&mut decoder, pages.len())?);
        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }
    debug!(pages = pages.len(), path = %path.display(), "Decoded TIFF pages");

    let stack = assemble(&pages, config)?;
    let first = &pages[0];
    let info = SourceInfo {
        filename: path.to_path_buf(),
        total_frames: stack.frame_count(),
        channels: stack.channel_count(),
        width: first.width as u32,
        height: first.height as u32,
        bit_depth: first.bit_depth,
    };
    Ok((stack, info))
}

fn decode_page(decoder: &mut Decoder<BufReader<File>>, index: usize) -> Result<DecodedPage> {
    let (w, h) = decoder.dimensions()?;
    let (samples, bit_depth) = match decoder.colortype()? {
        ColorType::Gray(b) => (1, b),
        ColorType::GrayA(b) => (2, b),
        ColorType::RGB(b) => (3, b),
        ColorType::RGBA(b) => (4, b),
        other => {
            return Err(ColocError::invalid(format!(
                "page {index}: unsupported TIFF color type {other:?}"
            )))
        }
    };
    let values = samples_to_f32(decoder.read_image()?);
    let (width, height) = (w as usize, h as usize);
    if values.len() != width * height * samples {
        return Err(ColocError::invalid(format!(
            "page {index}: expected {} samples, decoded {}",
            width * height * samples,
            values.len()
        )));
    }
    Ok(DecodedPage {
        width,
        height,
        samples,
        bit_depth,
        values,
    })
}

fn convert<T: AsPrimitive<f32>>(buf: Vec<T>) -> Vec<f32> {
    buf.into_iter().map(|v| v.as_()).collect()
}

#[allow(unreachable_patterns)]
fn samples_to_f32(result: DecodingResult) -> Vec<f32> {
    match result {
        DecodingResult::U8(buf) => convert(buf),
        DecodingResult::U16(buf) => convert(buf),
        DecodingResult::U32(buf) => convert(buf),
        DecodingResult::U64(buf) => convert(buf),
        DecodingResult::I8(buf) => convert(buf),
        DecodingResult::I16(buf) => convert(buf),
        DecodingResult::I32(buf) => convert(buf),
        DecodingResult::I64(buf) => convert(buf),
        DecodingResult::F32(buf) => buf,
        DecodingResult::F64(buf) => convert(buf),
        _ => Vec::new(),
    }
}

fn assemble(pages: &[DecodedPage], config: &LoaderConfig) -> Result<ImageStack> {
    let first = &pages[0];
    let (h, w) = (first.height, first.width);
    for (i, page) in pages.iter().enumerate() {
        if page.width != w || page.height != h || page.samples != first.samples {
            return Err(ColocError::invalid(format!(
                "page {i} is {}x{} with {} samples, page 0 is {}x{} with {}",
                page.width, page.height, page.samples, w, h, first.samples
            )));
        }
    }

    let (channels, frames) = match config.channels_per_frame {
        Some(0) => {
            return Err(ColocError::config("channels_per_frame must be at least 1"));
        }
        Some(n) => {
            if first.samples != 1 {
                return Err(ColocError::invalid(
                    "channels_per_frame requires single-sample (grayscale) pages",
                ));
            }
            if pages.len() % n != 0 {
                return Err(ColocError::invalid(format!(
                    "{} pages cannot be grouped into frames of {n} channels",
                    pages.len()
                )));
            }
            (n, pages.len() / n)
        }
        None => (first.samples, pages.len()),
    };

    let mut data = Array4::<f32>::zeros((h, w, channels, frames));
    for (i, page) in pages.iter().enumerate() {
        let (frame, channel_base) = if config.channels_per_frame.is_some() {
            (i / channels, i % channels)
        } else {
            (i, 0)
        };
        for row in 0..h {
            for col in 0..w {
                let base = (row * w + col) * page.samples;
                for s in 0..page.samples {
                    data[[row, col, channel_base + s, frame]] = page.values[base + s];
                }
            }
        }
    }
    Ok(ImageStack::new(data))
}
