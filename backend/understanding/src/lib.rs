//! Vision understanding for BlindSpot: image framing and the model providers
//! the description pipeline talks to.

pub mod image;
pub mod providers;

pub use image::{frame_image, mime_from_extension, sniff_image_mime};
pub use providers::{
    build_provider, GeminiProvider, MockReply, MockVisionProvider, OpenAiProvider,
};
