#![cfg(target_arch = "wasm32")]
//! Browser front-end. JS owns the canvas and renderer; this crate owns the
//! audio graph and the scope, and calls `onFrame(frame)` once per animation
//! frame with the point buffers and render modifiers.

mod audio;
mod frame;

use anyhow::anyhow;
use instant::Instant;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys as web;

use scope_core::constants::DEFAULT_FFT_SIZE;
use scope_core::{
    open_or_fallback, profile_or_default, AnalyserSource, Attractor, CaptureSession, DisplayMode,
    JsonProfileClassifier, Scope, ScopeConfig, ShapeKind, SyntheticSource, VisualMode,
};

use audio::{BufferPlayback, WebAnalyser};
use frame::{FrameContext, RafLoop};

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("scope-web starting");
    Ok(())
}

fn js_err(e: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{e:#}"))
}

#[wasm_bindgen]
pub struct ScopeApp {
    inner: Rc<RefCell<FrameContext>>,
    raf: Option<RafLoop>,
}

#[wasm_bindgen]
impl ScopeApp {
    /// Create the audio context and a scope fed by a synthetic tone. Call
    /// from a user gesture so the context is allowed to run.
    #[wasm_bindgen(constructor)]
    pub fn new(on_frame: js_sys::Function) -> Result<ScopeApp, JsValue> {
        Self::create(on_frame).map_err(js_err)
    }

    fn create(on_frame: js_sys::Function) -> anyhow::Result<ScopeApp> {
        let ctx = web::AudioContext::new().map_err(|e| anyhow!("AudioContext error: {:?}", e))?;
        let sample_rate = ctx.sample_rate();
        let mut config = ScopeConfig::default();
        config.features.sample_rate = sample_rate;
        config.features.fft_size = DEFAULT_FFT_SIZE;
        let scope = Scope::new(config, Default::default())?;
        let source = SyntheticSource::fallback(sample_rate, DEFAULT_FFT_SIZE)?;
        let now = Instant::now();
        let inner = FrameContext {
            ctx,
            scope,
            source: Box::new(source),
            session: CaptureSession::synthetic(),
            mic: None,
            on_frame,
            started: now,
            last_instant: now,
        };
        Ok(ScopeApp {
            inner: Rc::new(RefCell::new(inner)),
            raf: None,
        })
    }

    fn with_ctx<T>(&self, f: impl FnOnce(&mut FrameContext) -> anyhow::Result<T>) -> Result<T, JsValue> {
        let mut ctx = self
            .inner
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("scope is busy rendering a frame"))?;
        f(&mut *ctx).map_err(js_err)
    }

    /// Start the animation-frame loop (idempotent).
    pub fn run(&mut self) -> Result<(), JsValue> {
        if self.raf.is_some() {
            return Ok(());
        }
        self.with_ctx(|c| {
            let _ = c.ctx.resume().map_err(|e| anyhow!("resume: {:?}", e))?;
            Ok(())
        })?;
        self.raf = Some(RafLoop::start(self.inner.clone()));
        Ok(())
    }

    /// Stop the animation-frame loop.
    pub fn halt(&mut self) {
        if let Some(raf) = self.raf.take() {
            raf.cancel();
        }
    }

    /// Switch to the microphone, falling back to the synthetic tone when
    /// permission is denied. Resolves to `true` when the fallback was used.
    pub fn open_microphone(&self) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let (ctx, fft_size) = {
                let c = inner.borrow();
                (c.ctx.clone(), c.scope.config().features.fft_size)
            };
            let opened = audio::open_microphone(&ctx, fft_size).await;
            let mut c = inner
                .try_borrow_mut()
                .map_err(|_| JsValue::from_str("scope is busy rendering a frame"))?;
            let (stream, opened) = match opened {
                Ok((analyser, stream)) => {
                    let source: Box<dyn AnalyserSource> = Box::new(analyser);
                    (Some(stream), Ok(source))
                }
                Err(e) => (
                    None,
                    Err(scope_core::ScopeError::SourceUnavailable(format!("{e:#}"))),
                ),
            };
            let (source, fell_back) = open_or_fallback(opened, ctx.sample_rate(), fft_size)
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            c.source = source;
            c.session.teardown();
            c.session = if fell_back {
                CaptureSession::synthetic()
            } else {
                CaptureSession::live()
            };
            stop_tracks(c.mic.take());
            c.mic = stream;
            Ok(JsValue::from_bool(fell_back))
        })
    }

    /// Decode an uploaded file and start playing it from the beginning.
    pub fn load_file(&self, bytes: js_sys::ArrayBuffer) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let (ctx, fft_size) = {
                let c = inner.borrow();
                (c.ctx.clone(), c.scope.config().features.fft_size)
            };
            let load = async {
                let buffer = audio::decode_file(&ctx, &bytes).await?;
                let analyser = WebAnalyser::new(&ctx, fft_size)?;
                let duration = buffer.duration();
                let backend = BufferPlayback::new(&ctx, buffer, &analyser)?;
                let mut session = CaptureSession::file(duration, Box::new(backend))?;
                session.play(ctx.current_time())?;
                anyhow::Ok((analyser, session))
            };
            let (analyser, session) = load.await.map_err(js_err)?;
            let mut c = inner
                .try_borrow_mut()
                .map_err(|_| JsValue::from_str("scope is busy rendering a frame"))?;
            c.session.teardown();
            c.session = session;
            c.source = Box::new(analyser);
            stop_tracks(c.mic.take());
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn play(&self) -> Result<(), JsValue> {
        self.with_ctx(|c| {
            let now = c.ctx.current_time();
            Ok(c.session.play(now)?)
        })
    }

    pub fn pause(&self) -> Result<(), JsValue> {
        self.with_ctx(|c| {
            let now = c.ctx.current_time();
            Ok(c.session.pause(now)?)
        })
    }

    pub fn stop(&self) -> Result<(), JsValue> {
        self.with_ctx(|c| Ok(c.session.stop()?))
    }

    pub fn seek(&self, seconds: f64) -> Result<(), JsValue> {
        self.with_ctx(|c| {
            let now = c.ctx.current_time();
            Ok(c.session.seek(now, seconds)?)
        })
    }

    /// Playback position in seconds (0 for live and synthetic sources).
    pub fn position(&self) -> f64 {
        self.inner
            .try_borrow()
            .map(|c| c.session.position(c.ctx.current_time()))
            .unwrap_or(0.0)
    }

    pub fn set_display_xy(&self, xy: bool) -> Result<(), JsValue> {
        self.with_ctx(|c| {
            c.scope
                .set_display(if xy { DisplayMode::XY } else { DisplayMode::YT });
            Ok(())
        })
    }

    pub fn set_auto_pilot(&self, on: bool) -> Result<(), JsValue> {
        self.with_ctx(|c| {
            c.scope.set_auto_pilot(on);
            Ok(())
        })
    }

    pub fn set_beam_speed(&self, samples_per_sec: f32) -> Result<(), JsValue> {
        self.with_ctx(|c| {
            c.scope.set_beam_speed(samples_per_sec);
            Ok(())
        })
    }

    /// Apply a classifier's JSON response. Malformed JSON yields the default
    /// profile rather than an error.
    pub fn set_profile_json(&self, json: String) -> Result<(), JsValue> {
        self.with_ctx(|c| {
            let profile = profile_or_default(&JsonProfileClassifier::new(json), &[], "");
            c.scope.set_profile(profile);
            Ok(())
        })
    }

    /// Manual mode: `waveform`, `cube`, `planet`, `brain`, `eye`, `text`,
    /// `chaos` or an attractor name. `word` is used by `text`.
    pub fn set_mode(&self, name: &str, word: &str) -> Result<(), JsValue> {
        let mode = visual_mode(name, word).ok_or_else(|| {
            JsValue::from_str(&format!("unknown mode '{name}'"))
        })?;
        self.with_ctx(|c| {
            c.scope.set_auto_pilot(false);
            c.scope.set_mode(mode);
            Ok(())
        })
    }
}

impl Drop for ScopeApp {
    fn drop(&mut self) {
        self.halt();
        if let Ok(mut c) = self.inner.try_borrow_mut() {
            c.session.teardown();
            stop_tracks(c.mic.take());
            let _ = c.ctx.close();
        }
    }
}

fn stop_tracks(stream: Option<web::MediaStream>) {
    let Some(stream) = stream else {
        return;
    };
    for track in stream.get_tracks().iter() {
        if let Ok(track) = track.dyn_into::<web::MediaStreamTrack>() {
            track.stop();
        }
    }
}

fn visual_mode(name: &str, word: &str) -> Option<VisualMode> {
    let name = name.trim().to_ascii_lowercase();
    let kind = match name.as_str() {
        "waveform" | "default" => return Some(VisualMode::Waveform),
        "cube" => ShapeKind::Cube,
        "planet" => ShapeKind::Planet,
        "brain" => ShapeKind::Brain,
        "eye" => ShapeKind::Eye,
        "text" => ShapeKind::Text(word.to_uppercase()),
        "chaos" => ShapeKind::Chaos(Attractor::default()),
        other => ShapeKind::Chaos(Attractor::from_name(other)?),
    };
    Some(VisualMode::Shape(kind))
}
