//! facecast-media — Frame codec and drawing primitives.
//!
//! Decodes browser data-URI frames into RGB rasters, downsamples them for
//! detection, draws face boxes and labels, and re-encodes JPEG payloads.

pub mod annotate;
pub mod codec;
pub mod frame;

pub use codec::{decode_data_uri, encode_base64, encode_jpeg, MediaError};
pub use frame::{resize_to_width, FaceLocation, ScaledFrame};

pub use image::RgbImage;
