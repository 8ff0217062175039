pub mod render;
pub mod tiff_stack;

pub use tiff_stack::{check_stack_path, read_stack, LoaderConfig};
