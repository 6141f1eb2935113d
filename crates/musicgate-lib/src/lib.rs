//! Core library for the musicgate HTTP gateway.
//!
//! Everything here is independent of the HTTP surface:
//!
//! - [`casing`]: recursive camelCase key normalization over JSON values
//! - [`stream`]: stream format filtering and best-audio selection
//! - [`ytmusic`]: YouTube Music search adapter ([`SongSearch`])
//! - [`resolver`]: YouTube stream format resolver ([`StreamResolver`])
//! - [`upstream`]: music-metadata service forwarding ([`MetadataUpstream`])
//!
//! Adapters are exposed as object-safe async traits so the service layer can
//! hold them as `Arc<dyn ...>` and tests can substitute fakes.

pub mod casing;
pub mod error;
pub mod resolver;
pub mod stream;
pub mod upstream;
pub mod ytmusic;

pub use error::{Error, Result};
pub use resolver::{is_valid_video_id, StreamResolver, YoutubeResolver, YOUTUBE_BASE_URL};
pub use stream::{rank_audio_formats, select_best_audio, StreamCandidate, StreamFormat};
pub use upstream::{HttpMetadataClient, MetadataUpstream};
pub use ytmusic::{SongResult, SongSearch, YtMusicClient, YtMusicOptions, YTMUSIC_BASE_URL};
