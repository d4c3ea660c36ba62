mod cancel;
mod codec;
pub mod compress;
mod encode;
pub mod error;
pub mod ffmpeg;
pub mod plan;
pub mod storage;
pub mod thumbnail;
pub mod upload;

pub use cancel::CancelToken;
pub use codec::{CODEC_PREFERENCE, OutputCodec, select_output_codec};
pub use compress::{CompressedVideo, CompressionOptions, compress_video};
pub use encode::fit_dimensions;
pub use error::MediaError;
pub use ffmpeg::ffprobe::{VideoMetadata, probe_video};
pub use plan::CompressionPlan;
pub use thumbnail::generate_thumbnail;
pub use upload::{PreparedUpload, PreparedVideo, UploadOptions, prepare_for_upload};
