//! Codec configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default size of the read and write staging buffers.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default cap on a verb's byte length.
pub const DEFAULT_MAX_VERB_LENGTH: usize = 128;

/// Default cap on a channel's byte length.
pub const DEFAULT_MAX_CHANNEL_LENGTH: usize = 32;

/// Default cap on a count's byte length.
pub const DEFAULT_MAX_COUNT_LENGTH: usize = 32;

/// Default cap on the content length (4 MiB).
pub const DEFAULT_MAX_CONTENT_LENGTH: u64 = 4 * 1024 * 1024;

/// Default in-memory/temp-file threshold for content (1 MiB).
pub const DEFAULT_MAX_FAST_BUFFERING: u64 = 1024 * 1024;

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_max_verb_length() -> usize {
    DEFAULT_MAX_VERB_LENGTH
}

fn default_max_channel_length() -> usize {
    DEFAULT_MAX_CHANNEL_LENGTH
}

fn default_max_count_length() -> usize {
    DEFAULT_MAX_COUNT_LENGTH
}

fn default_max_content_length() -> u64 {
    DEFAULT_MAX_CONTENT_LENGTH
}

fn default_max_fast_buffering() -> u64 {
    DEFAULT_MAX_FAST_BUFFERING
}

fn default_temp_content_folder() -> PathBuf {
    std::env::temp_dir()
}

/// Per-stream codec configuration.
///
/// A field exceeding its cap is a framing error, never truncated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamOptions {
    /// Size of the codec's internal read staging buffer.
    #[serde(default = "default_buffer_size")]
    pub read_buffer_size: usize,
    /// Size of the codec's write staging buffer.
    #[serde(default = "default_buffer_size")]
    pub write_buffer_size: usize,
    #[serde(default = "default_max_verb_length")]
    pub max_verb_length: usize,
    #[serde(default = "default_max_channel_length")]
    pub max_channel_length: usize,
    #[serde(default = "default_max_count_length")]
    pub max_count_length: usize,
    /// Cap on the count value (content bytes).
    #[serde(default = "default_max_content_length")]
    pub max_content_length: u64,
    /// Content at or below this length stays in memory; above it spills
    /// to a temp file.
    #[serde(default = "default_max_fast_buffering")]
    pub max_fast_buffering: u64,
    /// Directory for spilled content files.
    #[serde(default = "default_temp_content_folder")]
    pub temp_content_folder: PathBuf,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            read_buffer_size: default_buffer_size(),
            write_buffer_size: default_buffer_size(),
            max_verb_length: default_max_verb_length(),
            max_channel_length: default_max_channel_length(),
            max_count_length: default_max_count_length(),
            max_content_length: default_max_content_length(),
            max_fast_buffering: default_max_fast_buffering(),
            temp_content_folder: default_temp_content_folder(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_limits() {
        let opts = StreamOptions::default();
        assert_eq!(opts.read_buffer_size, 1024);
        assert_eq!(opts.write_buffer_size, 1024);
        assert_eq!(opts.max_verb_length, 128);
        assert_eq!(opts.max_channel_length, 32);
        assert_eq!(opts.max_count_length, 32);
        assert_eq!(opts.max_content_length, 4 * 1024 * 1024);
        assert_eq!(opts.max_fast_buffering, 1024 * 1024);
    }

    #[test]
    fn deserializes_with_partial_keys() {
        let opts: StreamOptions =
            serde_json::from_str(r#"{"max_verb_length": 16}"#).unwrap();
        assert_eq!(opts.max_verb_length, 16);
        assert_eq!(opts.read_buffer_size, DEFAULT_BUFFER_SIZE);
    }
}
