//! WebAudio plumbing: analyser wrapper, microphone, decoded-file playback.

use anyhow::anyhow;
use scope_core::{AnalyserSource, PlaybackBackend, ScopeError};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

/// `AnalyserNode` exposed to the core as a poll-only source.
pub struct WebAnalyser {
    node: web::AnalyserNode,
    sample_rate: f32,
}

impl WebAnalyser {
    pub fn new(ctx: &web::AudioContext, fft_size: usize) -> anyhow::Result<Self> {
        let node = ctx
            .create_analyser()
            .map_err(|e| anyhow!("AnalyserNode error: {:?}", e))?;
        node.set_fft_size(fft_size as u32);
        node.set_smoothing_time_constant(scope_core::constants::ANALYSER_SMOOTHING as f64);
        node.set_min_decibels(scope_core::constants::ANALYSER_MIN_DB as f64);
        Ok(Self {
            node,
            sample_rate: ctx.sample_rate(),
        })
    }

    pub fn node(&self) -> &web::AnalyserNode {
        &self.node
    }
}

impl AnalyserSource for WebAnalyser {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn fft_size(&self) -> usize {
        self.node.fft_size() as usize
    }

    fn time_domain(&mut self, out: &mut [f32]) {
        self.node.get_float_time_domain_data(out);
    }

    fn frequency_db(&mut self, out: &mut [f32]) {
        self.node.get_float_frequency_data(out);
    }
}

/// Ask for the microphone and route it into a fresh analyser. The analyser
/// is not connected to the destination to avoid feedback.
pub async fn open_microphone(
    ctx: &web::AudioContext,
    fft_size: usize,
) -> anyhow::Result<(WebAnalyser, web::MediaStream)> {
    let window = web::window().ok_or_else(|| anyhow!("no window"))?;
    let devices = window
        .navigator()
        .media_devices()
        .map_err(|e| anyhow!("mediaDevices unavailable: {:?}", e))?;
    let constraints = web::MediaStreamConstraints::new();
    constraints.set_audio(&wasm_bindgen::JsValue::TRUE);
    let promise = devices
        .get_user_media_with_constraints(&constraints)
        .map_err(|e| anyhow!("getUserMedia error: {:?}", e))?;
    let stream: web::MediaStream = JsFuture::from(promise)
        .await
        .map_err(|e| anyhow!("microphone denied: {:?}", e))?
        .dyn_into()
        .map_err(|e| anyhow!("not a MediaStream: {:?}", e))?;

    let analyser = WebAnalyser::new(ctx, fft_size)?;
    let input = ctx
        .create_media_stream_source(&stream)
        .map_err(|e| anyhow!("MediaStreamSource error: {:?}", e))?;
    input
        .connect_with_audio_node(analyser.node())
        .map_err(|e| anyhow!("connect error: {:?}", e))?;
    log::info!("[audio] microphone connected");
    Ok((analyser, stream))
}

pub async fn decode_file(
    ctx: &web::AudioContext,
    bytes: &js_sys::ArrayBuffer,
) -> anyhow::Result<web::AudioBuffer> {
    let promise = ctx
        .decode_audio_data(bytes)
        .map_err(|e| anyhow!("decodeAudioData error: {:?}", e))?;
    let buffer: web::AudioBuffer = JsFuture::from(promise)
        .await
        .map_err(|e| anyhow!("decode failed: {:?}", e))?
        .dyn_into()
        .map_err(|e| anyhow!("not an AudioBuffer: {:?}", e))?;
    log::info!(
        "[audio] decoded {:.2}s at {} Hz",
        buffer.duration(),
        buffer.sample_rate()
    );
    Ok(buffer)
}

/// One-shot `AudioBufferSourceNode`s started at an offset; a new node per
/// start since they cannot be restarted.
pub struct BufferPlayback {
    ctx: web::AudioContext,
    buffer: web::AudioBuffer,
    analyser: web::AnalyserNode,
    node: Option<web::AudioBufferSourceNode>,
}

impl BufferPlayback {
    /// Connects the analyser to the speakers so the file is audible.
    pub fn new(
        ctx: &web::AudioContext,
        buffer: web::AudioBuffer,
        analyser: &WebAnalyser,
    ) -> anyhow::Result<Self> {
        analyser
            .node()
            .connect_with_audio_node(&ctx.destination())
            .map_err(|e| anyhow!("connect error: {:?}", e))?;
        Ok(Self {
            ctx: ctx.clone(),
            buffer,
            analyser: analyser.node().clone(),
            node: None,
        })
    }
}

impl PlaybackBackend for BufferPlayback {
    fn start(&mut self, offset_sec: f64) -> scope_core::Result<()> {
        let transport = |e: wasm_bindgen::JsValue| ScopeError::Transport(format!("{:?}", e));
        let node = self.ctx.create_buffer_source().map_err(transport)?;
        node.set_buffer(Some(&self.buffer));
        node.connect_with_audio_node(&self.analyser)
            .map_err(transport)?;
        node.start_with_when_and_grain_offset(0.0, offset_sec)
            .map_err(transport)?;
        self.node = Some(node);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(node) = self.node.take() {
            #[allow(deprecated)]
            let stopped = node.stop();
            if let Err(e) = stopped {
                log::debug!("[audio] stop on finished node: {:?}", e);
            }
            let _ = node.disconnect();
        }
    }
}
