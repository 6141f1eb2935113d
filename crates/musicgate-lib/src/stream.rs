//! Stream format selection.
//!
//! A resolver hands back every format the player advertises: muxed video,
//! video-only, audio-only, some with direct URLs and some that are
//! signature-protected. [`select_best_audio`] reduces that list to the single
//! candidate a client should play.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Mime-type markers that indicate the stream carries audio.
const AUDIO_MARKERS: [&str; 2] = ["audio", "mp4a"];

/// One entry of a resolver's format list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamFormat {
    /// Format tag, when the resolver exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itag: Option<u32>,

    /// Direct playable URL. Absent for signature-protected formats.
    #[serde(default)]
    pub url: Option<String>,

    /// Media type, e.g. `audio/webm; codecs="opus"`.
    #[serde(default)]
    pub mime_type: Option<String>,

    /// Average bitrate in bits per second.
    #[serde(default)]
    pub bitrate: Option<u64>,
}

impl StreamFormat {
    /// The playable URL, if present and non-empty.
    pub fn playable_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }

    /// Whether the mime type advertises an audio track.
    pub fn is_audio_capable(&self) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|mime| AUDIO_MARKERS.iter().any(|marker| mime.contains(marker)))
    }
}

/// The selected audio stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamCandidate {
    pub url: String,
    pub mime_type: String,
    pub bitrate: u64,
}

/// Filter `formats` to playable audio and order them best first.
///
/// The sort is stable, so formats with equal bitrate keep the resolver's
/// relative order.
pub fn rank_audio_formats(formats: &[StreamFormat]) -> Vec<StreamCandidate> {
    let mut candidates: Vec<StreamCandidate> = formats
        .iter()
        .filter(|format| format.is_audio_capable())
        .filter_map(|format| {
            format.playable_url().map(|url| StreamCandidate {
                url: url.to_string(),
                mime_type: format.mime_type.clone().unwrap_or_default(),
                bitrate: format.bitrate.unwrap_or(0),
            })
        })
        .collect();

    candidates.sort_by(|a, b| b.bitrate.cmp(&a.bitrate));
    candidates
}

/// Pick the highest-bitrate audio-capable format with a playable URL.
///
/// Returns [`Error::NoAudioFormats`] when nothing qualifies, after logging the
/// mime type and URL presence of every input format.
pub fn select_best_audio(formats: &[StreamFormat]) -> Result<StreamCandidate> {
    let mut ranked = rank_audio_formats(formats);

    if ranked.is_empty() {
        let summary: Vec<(Option<&str>, bool)> = formats
            .iter()
            .map(|format| (format.mime_type.as_deref(), format.playable_url().is_some()))
            .collect();
        warn!(
            format_count = formats.len(),
            formats = ?summary,
            "no usable audio format; listing (mime_type, has_url) for every format"
        );
        return Err(Error::NoAudioFormats);
    }

    let best = ranked.swap_remove(0);
    debug!(
        mime_type = %best.mime_type,
        bitrate = best.bitrate,
        "selected audio stream"
    );
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_markers() {
        let opus = StreamFormat {
            mime_type: Some("audio/webm; codecs=\"opus\"".to_string()),
            ..Default::default()
        };
        let muxed = StreamFormat {
            mime_type: Some("video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"".to_string()),
            ..Default::default()
        };
        let silent = StreamFormat {
            mime_type: Some("video/webm; codecs=\"vp9\"".to_string()),
            ..Default::default()
        };

        assert!(opus.is_audio_capable());
        assert!(muxed.is_audio_capable());
        assert!(!silent.is_audio_capable());
        assert!(!StreamFormat::default().is_audio_capable());
    }

    #[test]
    fn empty_url_is_not_playable() {
        let format = StreamFormat {
            url: Some(String::new()),
            ..Default::default()
        };
        assert!(format.playable_url().is_none());
    }
}
