mod image_transcoder;

pub use image_transcoder::{ImageTranscoder, transcode};
