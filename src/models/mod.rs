//! Data models for IDLens.

mod image;
mod record;

pub use image::{ImageFormat, ImageUnit};
pub use record::{Classification, ErrorCheck, Identification, ImageRecord, StageResults};
