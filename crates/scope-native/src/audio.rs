//! Native audio plumbing: cpal capture, WAV playback, shared analyser.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use scope_core::{AnalyserSource, PlaybackBackend, ScopeError, SoftwareAnalyser};

/// Analyser written by the audio thread and polled by the main loop.
#[derive(Clone)]
pub struct SharedAnalyser(Arc<Mutex<SoftwareAnalyser>>);

impl SharedAnalyser {
    pub fn new(sample_rate: f32, fft_size: usize) -> scope_core::Result<Self> {
        Ok(Self(Arc::new(Mutex::new(SoftwareAnalyser::new(
            sample_rate,
            fft_size,
        )?))))
    }

    fn lock(&self) -> MutexGuard<'_, SoftwareAnalyser> {
        // a panicked audio callback leaves plain sample data behind
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, samples: &[f32]) {
        self.lock().push_samples(samples);
    }
}

impl AnalyserSource for SharedAnalyser {
    fn sample_rate(&self) -> f32 {
        self.lock().sample_rate()
    }

    fn fft_size(&self) -> usize {
        self.lock().fft_size()
    }

    fn time_domain(&mut self, out: &mut [f32]) {
        self.lock().time_domain(out);
    }

    fn frequency_db(&mut self, out: &mut [f32]) {
        self.lock().frequency_db(out);
    }
}

/// Live microphone capture. Dropping it stops the stream.
pub struct MicCapture {
    _stream: cpal::Stream,
    pub analyser: SharedAnalyser,
}

impl MicCapture {
    pub fn open(fft_size: usize) -> scope_core::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| ScopeError::SourceUnavailable("no input device".into()))?;
        let config = device.default_input_config().map_err(unavailable)?;
        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        log::info!(
            "[audio] input '{}' {} Hz x{} ({:?})",
            device.name().unwrap_or_else(|_| "unknown".into()),
            sample_rate,
            channels,
            config.sample_format()
        );

        let analyser = SharedAnalyser::new(sample_rate, fft_size)?;
        let stream_config: cpal::StreamConfig = config.clone().into();
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                build_input::<f32>(&device, &stream_config, channels, analyser.clone())
            }
            cpal::SampleFormat::I16 => {
                build_input::<i16>(&device, &stream_config, channels, analyser.clone())
            }
            cpal::SampleFormat::U16 => {
                build_input::<u16>(&device, &stream_config, channels, analyser.clone())
            }
            other => {
                return Err(ScopeError::SourceUnavailable(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        }
        .map_err(unavailable)?;
        stream.play().map_err(unavailable)?;
        Ok(Self {
            _stream: stream,
            analyser,
        })
    }
}

fn unavailable(e: impl std::fmt::Display) -> ScopeError {
    ScopeError::SourceUnavailable(e.to_string())
}

fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    analyser: SharedAnalyser,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let mut mono = Vec::new();
    device.build_input_stream(
        config,
        move |data: &[T], _| {
            mono.clear();
            mono.extend(data.chunks(channels.max(1)).map(|frame| {
                frame.iter().map(|s| f32::from_sample(*s)).sum::<f32>() / frame.len() as f32
            }));
            analyser.push(&mono);
        },
        |err| log::error!("[audio] input stream error: {err}"),
        None,
    )
}

/// Decoded WAV file, downmixed to mono.
pub struct DecodedFile {
    pub samples: Arc<[f32]>,
    pub sample_rate: u32,
}

impl DecodedFile {
    pub fn duration_sec(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate.max(1) as f64
    }
}

pub fn decode_wav(path: &Path) -> scope_core::Result<DecodedFile> {
    let decode = |e: hound::Error| ScopeError::Decode(format!("{}: {e}", path.display()));
    let mut reader = hound::WavReader::open(path).map_err(decode)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(decode)?,
        hound::SampleFormat::Int => {
            let full_scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<Result<_, _>>()
                .map_err(decode)?
        }
    };
    let samples: Arc<[f32]> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();
    log::info!(
        "[audio] decoded {} ({} Hz, {} ch, {:.2}s)",
        path.display(),
        spec.sample_rate,
        spec.channels,
        samples.len() as f64 / spec.sample_rate.max(1) as f64
    );
    Ok(DecodedFile {
        samples,
        sample_rate: spec.sample_rate,
    })
}

#[derive(Default)]
struct PlayheadState {
    cursor: usize,
    playing: bool,
}

/// Plays a decoded file into the analyser.
///
/// With an output device the cpal callback advances the playhead; without
/// one the main loop calls [`FilePlayer::pump`] to keep the analyser fed.
#[derive(Clone)]
pub struct FilePlayer {
    samples: Arc<[f32]>,
    sample_rate: u32,
    state: Arc<Mutex<PlayheadState>>,
    analyser: SharedAnalyser,
    device_driven: bool,
    pending: f64,
}

impl FilePlayer {
    pub fn new(file: &DecodedFile, fft_size: usize) -> scope_core::Result<Self> {
        Ok(Self {
            samples: Arc::clone(&file.samples),
            sample_rate: file.sample_rate,
            state: Arc::new(Mutex::new(PlayheadState::default())),
            analyser: SharedAnalyser::new(file.sample_rate as f32, fft_size)?,
            device_driven: false,
            pending: 0.0,
        })
    }

    pub fn analyser(&self) -> SharedAnalyser {
        self.analyser.clone()
    }

    fn lock(&self) -> MutexGuard<'_, PlayheadState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Route playback through the default output device. Returns `None` and
    /// stays in pump mode when the device cannot run at the file's rate.
    pub fn open_output(&mut self) -> Option<cpal::Stream> {
        let device = cpal::default_host().default_output_device()?;
        let config = cpal::StreamConfig {
            channels: 2,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let player = self.clone();
        let mut mono = Vec::new();
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _| {
                    mono.clear();
                    mono.resize(data.len() / 2, 0.0);
                    player.read(&mut mono);
                    for (frame, s) in data.chunks_mut(2).zip(&mono) {
                        frame.fill(*s);
                    }
                    player.analyser.push(&mono);
                },
                |err| log::error!("[audio] output stream error: {err}"),
                None,
            )
            .map_err(|e| log::warn!("[audio] no output at {} Hz ({e}), silent playback", self.sample_rate))
            .ok()?;
        stream.play().ok()?;
        self.device_driven = true;
        Some(stream)
    }

    /// Copy the next samples at the playhead into `out`; silence when paused
    /// or past the end.
    fn read(&self, out: &mut [f32]) {
        let mut state = self.lock();
        out.fill(0.0);
        if !state.playing {
            return;
        }
        let start = state.cursor.min(self.samples.len());
        let end = (start + out.len()).min(self.samples.len());
        out[..end - start].copy_from_slice(&self.samples[start..end]);
        state.cursor = end;
    }

    /// Advance the playhead by `dt_sec` of wall time when no device does it.
    pub fn pump(&mut self, dt_sec: f64) {
        if self.device_driven {
            return;
        }
        self.pending += dt_sec.max(0.0) * self.sample_rate as f64;
        let count = self.pending.floor() as usize;
        self.pending -= count as f64;
        let mut block = vec![0.0; count];
        self.read(&mut block);
        self.analyser.push(&block);
    }
}

impl PlaybackBackend for FilePlayer {
    fn start(&mut self, offset_sec: f64) -> scope_core::Result<()> {
        let cursor = (offset_sec.max(0.0) * self.sample_rate as f64) as usize;
        let mut state = self.lock();
        state.cursor = cursor.min(self.samples.len());
        state.playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.lock().playing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_file(len: usize, sample_rate: u32) -> DecodedFile {
        DecodedFile {
            samples: (0..len).map(|i| i as f32 / len as f32).collect(),
            sample_rate,
        }
    }

    #[test]
    fn player_starts_at_offset_and_stops() {
        let file = ramp_file(1000, 100);
        let mut player = FilePlayer::new(&file, 256).unwrap();
        player.start(2.0).unwrap();
        let mut out = [0.0; 4];
        player.read(&mut out);
        assert_eq!(out[0], 0.2);
        player.stop();
        player.read(&mut out);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn reading_past_the_end_yields_silence() {
        let file = ramp_file(10, 100);
        let mut player = FilePlayer::new(&file, 256).unwrap();
        player.start(0.08).unwrap();
        let mut out = [1.0; 4];
        player.read(&mut out);
        assert_eq!(out[2], 0.0);
        assert_eq!(out[3], 0.0);
        assert!((file.duration_sec() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn pump_feeds_the_analyser() {
        let file = ramp_file(44_100, 44_100);
        let mut player = FilePlayer::new(&file, 256).unwrap();
        player.start(0.5).unwrap();
        player.pump(0.01);
        let mut analyser = player.analyser();
        let mut out = vec![0.0; 256];
        analyser.time_domain(&mut out);
        assert!(out[255] > 0.5);
    }
}
