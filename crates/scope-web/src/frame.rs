//! Per-frame driver: advances the core and hands the result to JS.

use instant::Instant;
use js_sys::{Float32Array, Function, Object, Reflect};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys as web;

use scope_core::{AnalyserSource, CaptureSession, RenderFrame, Scope};

pub struct FrameContext {
    pub ctx: web::AudioContext,
    pub scope: Scope,
    pub source: Box<dyn AnalyserSource>,
    pub session: CaptureSession,
    /// Keeps the microphone tracks alive while in use.
    pub mic: Option<web::MediaStream>,
    pub on_frame: Function,
    pub started: Instant,
    pub last_instant: Instant,
}

impl FrameContext {
    pub fn frame(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_instant).as_secs_f64();
        self.last_instant = now;
        let now_ms = (now - self.started).as_secs_f64() * 1000.0;

        self.source.advance(dt);
        if self.session.update(self.ctx.current_time()) {
            log::info!("[frame] playback finished");
        }
        self.scope.analysis_tick(now_ms, self.source.as_mut());
        let frame = self.scope.render_tick(dt as f32, now_ms);
        if let Err(e) = self.deliver(&frame) {
            log::error!("[frame] render callback failed: {:?}", e);
        }
    }

    fn deliver(&self, frame: &RenderFrame) -> Result<(), JsValue> {
        let out = Object::new();
        let set = |key: &str, value: &JsValue| Reflect::set(&out, &JsValue::from_str(key), value);
        let m = &frame.modifiers;
        set("a", &Float32Array::from(frame.pair.a()).into())?;
        set("b", &Float32Array::from(frame.pair.b()).into())?;
        // x, y, z, brightness per point, newest first
        let trail: &[f32] = bytemuck::cast_slice(&frame.trail);
        set("trail", &Float32Array::from(trail).into())?;
        if let Some(beam) = frame.beam {
            set("beamX", &beam.x.into())?;
            set("beamY", &beam.y.into())?;
        }
        set("lineWidth", &m.line_width.into())?;
        set("color", &Float32Array::from(&m.color[..]).into())?;
        set("scale", &m.scale.into())?;
        set("rotation", &m.rotation.into())?;
        set("offsetX", &m.offset.x.into())?;
        set("offsetY", &m.offset.y.into())?;
        set("bloom", &m.bloom.into())?;
        set("jitter", &m.jitter.into())?;
        set("blur", &m.blur.into())?;
        set("glitch", &m.glitch.into())?;
        set("timestampMs", &frame.timestamp_ms.into())?;
        self.on_frame.call1(&JsValue::NULL, &out)?;
        Ok(())
    }
}

/// A running `requestAnimationFrame` chain. Cancelling breaks the closure's
/// self-reference so everything it captured can be freed.
pub struct RafLoop {
    handle: Rc<Cell<Option<i32>>>,
    tick: Rc<RefCell<Option<Closure<dyn FnMut()>>>>,
}

impl RafLoop {
    pub fn start(frame_ctx: Rc<RefCell<FrameContext>>) -> RafLoop {
        let handle: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));
        let tick: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
        let tick_clone = tick.clone();
        let handle_clone = handle.clone();
        *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            if let Ok(mut ctx) = frame_ctx.try_borrow_mut() {
                ctx.frame();
            }
            if let Some(cb) = tick_clone.borrow().as_ref() {
                handle_clone.set(request_frame(cb));
            }
        }) as Box<dyn FnMut()>));
        if let Some(cb) = tick.borrow().as_ref() {
            handle.set(request_frame(cb));
        }
        log::info!("[frame] loop started");
        RafLoop { handle, tick }
    }

    pub fn cancel(&self) {
        if let (Some(id), Some(w)) = (self.handle.take(), web::window()) {
            let _ = w.cancel_animation_frame(id);
        }
        self.tick.borrow_mut().take();
        log::info!("[frame] loop stopped");
    }
}

fn request_frame(cb: &Closure<dyn FnMut()>) -> Option<i32> {
    web::window()?
        .request_animation_frame(cb.as_ref().unchecked_ref())
        .ok()
}
