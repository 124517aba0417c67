//! Technical metadata from an external media probe (ffprobe).

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use encore_core::{ExtractError, MediaRecord};

use super::Extractor;

/// Runs `ffprobe` on each file and records duration, resolution, codecs
/// and bit rates.
#[derive(Debug, Clone)]
pub struct MediaProbe {
    program: PathBuf,
}

impl MediaProbe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Extractor for MediaProbe {
    fn name(&self) -> &str {
        "media-probe"
    }

    fn extract(&self, path: &Path, media: &mut MediaRecord) -> Result<(), ExtractError> {
        let output = Command::new(&self.program)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .map_err(|e| ExtractError::Probe {
                path: path.to_path_buf(),
                message: format!("cannot run {}: {e}", self.program.display()),
            })?;

        if !output.status.success() {
            return Err(ExtractError::Probe {
                path: path.to_path_buf(),
                message: format!("{} exited with {}", self.program.display(), output.status),
            });
        }

        let report = ProbeReport::parse(&output.stdout).map_err(|source| ExtractError::ProbeReport {
            path: path.to_path_buf(),
            source,
        })?;
        report.apply(media);
        Ok(())
    }
}

/// The parts of an ffprobe JSON report we read.
#[derive(Debug, Default, Deserialize)]
pub struct ProbeReport {
    #[serde(default)]
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: String,
    #[serde(default)]
    codec_name: String,
    width: Option<u32>,
    height: Option<u32>,
    bit_rate: Option<String>,
}

impl ProbeReport {
    pub fn parse(json: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(json)
    }

    fn first_stream(&self, codec_type: &str) -> Option<&ProbeStream> {
        self.streams.iter().find(|s| s.codec_type == codec_type)
    }

    /// Copy the values present in the report into `media`.
    ///
    /// Values missing from the report leave the record untouched.
    pub fn apply(&self, media: &mut MediaRecord) {
        if let Some(secs) = self.format.duration.as_deref().and_then(whole_seconds) {
            media.duration_secs = secs;
        }

        if let Some(video) = self.first_stream("video") {
            set_text(&mut media.video_format, &video.codec_name);
            if let Some(width) = video.width.filter(|w| *w > 0) {
                media.width = width;
            }
            if let Some(height) = video.height.filter(|h| *h > 0) {
                media.height = height;
            }
            if let Some(rate) = parse_rate(video.bit_rate.as_deref()) {
                media.video_bitrate = rate;
            }
        }

        if let Some(audio) = self.first_stream("audio") {
            set_text(&mut media.audio_format, &audio.codec_name);
            if let Some(rate) = parse_rate(audio.bit_rate.as_deref()) {
                media.audio_bitrate = rate;
            }
        }
    }
}

fn set_text(slot: &mut String, value: &str) {
    if !value.is_empty() {
        *slot = value.to_string();
    }
}

// ffprobe reports durations as decimal strings; fractions are dropped.
fn whole_seconds(raw: &str) -> Option<u64> {
    let secs: f64 = raw.trim().parse().ok()?;
    (secs.is_finite() && secs >= 1.0).then(|| secs.trunc() as u64)
}

fn parse_rate(raw: Option<&str>) -> Option<u64> {
    raw?.trim().parse().ok().filter(|r| *r > 0)
}
