/// Audio decoder implementation using Symphonia
use crate::error::{AudioError, Result};
use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoded audio, downmixed to mono
///
/// Fingerprinting is mono, so multi-channel input is averaged per frame at
/// decode time; `channels` records the source layout for reporting.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples in the range [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Source sample rate in Hz
    pub sample_rate: u32,
    /// Channel count of the source before the mono downmix
    pub channels: u32,
}

impl DecodedAudio {
    /// Duration of the decoded audio in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Audio decoder using Symphonia
///
/// Supports: MP3, FLAC, OGG, WAV, AAC, M4A
pub struct AudioDecoder;

impl AudioDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self
    }

    /// Whether the file extension is one the decoder handles
    pub fn supports_format(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                matches!(
                    ext.to_lowercase().as_str(),
                    "mp3" | "flac" | "ogg" | "opus" | "wav" | "m4a" | "aac"
                )
            })
    }

    /// Decode an entire file into mono samples
    pub fn decode(&self, path: &Path) -> Result<DecodedAudio> {
        if !path.exists() {
            return Err(AudioError::FileNotFound(path.display().to_string()));
        }

        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Hint the format registry with the extension.
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::Probe(e.to_string()))?;

        let mut format = probed.format;

        let track = format.default_track().ok_or(AudioError::NoAudioTrack)?;
        let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let channels = track
            .codec_params
            .channels
            .map_or(1, |c| c.count() as u32);
        let track_id = track.id;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Decode(e.to_string()))?;

        let mut samples = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(AudioError::Decode(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(symphonia::core::errors::Error::DecodeError(e)) => {
                    // Corrupt packets are recoverable; keep going.
                    tracing::warn!(path = %path.display(), error = e, "skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(AudioError::Decode(e.to_string())),
            };

            append_mono(&decoded, &mut samples);
        }

        if samples.is_empty() {
            return Err(AudioError::Decode("no samples decoded".to_string()));
        }

        Ok(DecodedAudio {
            samples,
            sample_rate,
            channels,
        })
    }
}

impl Default for AudioDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert one decoded buffer to mono f32 and append it
///
/// Signed integers use symmetric scaling (divide by 2^(N-1)) so the output
/// range is symmetric around zero; unsigned formats are recentered.
fn append_mono(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::F32(buf) => downmix(buf, out, |s| s.clamp(-1.0, 1.0)),
        AudioBufferRef::F64(buf) => downmix(buf, out, |s| (s as f32).clamp(-1.0, 1.0)),
        AudioBufferRef::S32(buf) => downmix(buf, out, |s| s as f32 / 2147483648.0),
        AudioBufferRef::S16(buf) => downmix(buf, out, |s| f32::from(s) / 32768.0),
        AudioBufferRef::S8(buf) => downmix(buf, out, |s| f32::from(s) / 128.0),
        AudioBufferRef::U32(buf) => {
            downmix(buf, out, |s| (s as f32 / u32::MAX as f32) * 2.0 - 1.0);
        }
        AudioBufferRef::U16(buf) => {
            downmix(buf, out, |s| (f32::from(s) / f32::from(u16::MAX)) * 2.0 - 1.0);
        }
        AudioBufferRef::U8(buf) => {
            downmix(buf, out, |s| (f32::from(s) / f32::from(u8::MAX)) * 2.0 - 1.0);
        }
        AudioBufferRef::U24(buf) => {
            downmix(buf, out, |s| (s.inner() as f32 / 16777215.0) * 2.0 - 1.0);
        }
        AudioBufferRef::S24(buf) => downmix(buf, out, |s| s.inner() as f32 / 8388608.0),
    }
}

/// Average all channels of a planar buffer into mono
fn downmix<T, F>(
    buf: &symphonia::core::audio::AudioBuffer<T>,
    out: &mut Vec<f32>,
    normalize: F,
) where
    T: symphonia::core::sample::Sample + Copy,
    F: Fn(T) -> f32,
{
    let frames = buf.frames();
    let channels = buf.spec().channels.count();
    out.reserve(frames);

    match channels {
        0 => out.resize(out.len() + frames, 0.0),
        1 => {
            let mono = buf.chan(0);
            out.extend(mono.iter().take(frames).map(|&s| normalize(s)));
        }
        _ => {
            for frame in 0..frames {
                let mut sum = 0.0f32;
                for channel in 0..channels {
                    sum += normalize(buf.chan(channel)[frame]);
                }
                out.push(sum / channels as f32);
            }
        }
    }
}
