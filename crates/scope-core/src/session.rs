//! Audio capture session: source kind, file transport, teardown.
//!
//! The session owns no audio itself. Platform front-ends supply a
//! [`PlaybackBackend`] that knows how to start a playback node at an offset
//! and stop it; there is no in-place seek, so seeking restarts the node.
//! Times are passed in by the caller (seconds on the host clock), which
//! keeps every transition deterministic.

use crate::error::{Result, ScopeError};
use crate::source::{AnalyserSource, SyntheticSource};

/// Starts and stops one playback node of a decoded file.
pub trait PlaybackBackend {
    fn start(&mut self, offset_sec: f64) -> Result<()>;
    fn stop(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SourceKind {
    Live,
    File { duration_sec: f64 },
    Synthetic,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransportState {
    Stopped,
    Playing { started_at_sec: f64, offset_sec: f64 },
    Paused { offset_sec: f64 },
}

pub struct CaptureSession {
    kind: SourceKind,
    state: TransportState,
    backend: Option<Box<dyn PlaybackBackend>>,
    torn_down: bool,
}

impl CaptureSession {
    pub fn live() -> Self {
        log::info!("[session] live input");
        Self::with_kind(SourceKind::Live, None)
    }

    pub fn synthetic() -> Self {
        log::info!("[session] synthetic signal");
        Self::with_kind(SourceKind::Synthetic, None)
    }

    pub fn file(duration_sec: f64, backend: Box<dyn PlaybackBackend>) -> Result<Self> {
        if !(duration_sec.is_finite() && duration_sec >= 0.0) {
            return Err(ScopeError::Decode(format!(
                "invalid file duration {duration_sec}"
            )));
        }
        log::info!("[session] file, {duration_sec:.2}s");
        Ok(Self::with_kind(
            SourceKind::File { duration_sec },
            Some(backend),
        ))
    }

    fn with_kind(kind: SourceKind, backend: Option<Box<dyn PlaybackBackend>>) -> Self {
        Self {
            kind,
            state: TransportState::Stopped,
            backend,
            torn_down: false,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn duration_sec(&self) -> Option<f64> {
        match self.kind {
            SourceKind::File { duration_sec } => Some(duration_sec),
            _ => None,
        }
    }

    /// Current playback position, clamped to the file length.
    pub fn position(&self, now_sec: f64) -> f64 {
        let duration = self.duration_sec().unwrap_or(0.0);
        match self.state {
            TransportState::Stopped => 0.0,
            TransportState::Playing {
                started_at_sec,
                offset_sec,
            } => (offset_sec + now_sec - started_at_sec).clamp(0.0, duration),
            TransportState::Paused { offset_sec } => offset_sec,
        }
    }

    fn transport(&mut self) -> Result<(f64, &mut Box<dyn PlaybackBackend>)> {
        if self.torn_down {
            return Err(ScopeError::Transport("session has been torn down".into()));
        }
        let SourceKind::File { duration_sec } = self.kind else {
            return Err(ScopeError::Transport(format!(
                "{:?} source has no transport",
                self.kind
            )));
        };
        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| ScopeError::Transport("no playback backend".into()))?;
        Ok((duration_sec, backend))
    }

    pub fn play(&mut self, now_sec: f64) -> Result<()> {
        let offset_sec = match self.state {
            TransportState::Playing { .. } => return Ok(()),
            TransportState::Paused { offset_sec } => offset_sec,
            TransportState::Stopped => 0.0,
        };
        let (_, backend) = self.transport()?;
        backend.start(offset_sec)?;
        log::info!("[session] play from {offset_sec:.2}s");
        self.state = TransportState::Playing {
            started_at_sec: now_sec,
            offset_sec,
        };
        Ok(())
    }

    pub fn pause(&mut self, now_sec: f64) -> Result<()> {
        let position = self.position(now_sec);
        let playing = matches!(self.state, TransportState::Playing { .. });
        let (_, backend) = self.transport()?;
        if playing {
            backend.stop();
            log::info!("[session] pause at {position:.2}s");
            self.state = TransportState::Paused {
                offset_sec: position,
            };
        }
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        let playing = matches!(self.state, TransportState::Playing { .. });
        let (_, backend) = self.transport()?;
        if playing {
            backend.stop();
        }
        log::info!("[session] stop");
        self.state = TransportState::Stopped;
        Ok(())
    }

    /// Stop the current node and, if playing, start a fresh one at `to_sec`.
    pub fn seek(&mut self, now_sec: f64, to_sec: f64) -> Result<()> {
        let playing = matches!(self.state, TransportState::Playing { .. });
        let (duration, backend) = self.transport()?;
        let target = if to_sec.is_finite() {
            to_sec.clamp(0.0, duration)
        } else {
            0.0
        };
        if playing {
            backend.stop();
            backend.start(target)?;
            self.state = TransportState::Playing {
                started_at_sec: now_sec,
                offset_sec: target,
            };
        } else {
            self.state = TransportState::Paused { offset_sec: target };
        }
        log::info!("[session] seek to {target:.2}s");
        Ok(())
    }

    /// Detect the end of the file. Returns `true` on the tick playback ended.
    pub fn update(&mut self, now_sec: f64) -> bool {
        let Some(duration) = self.duration_sec() else {
            return false;
        };
        if !matches!(self.state, TransportState::Playing { .. }) || self.torn_down {
            return false;
        }
        if self.position(now_sec) < duration {
            return false;
        }
        if let Some(backend) = self.backend.as_mut() {
            backend.stop();
        }
        log::info!("[session] reached end of file");
        self.state = TransportState::Stopped;
        true
    }

    /// Stop playback and release the backend. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        if let Some(mut backend) = self.backend.take() {
            if matches!(self.state, TransportState::Playing { .. }) {
                backend.stop();
            }
        }
        self.state = TransportState::Stopped;
        self.torn_down = true;
        log::info!("[session] torn down");
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Use `opened` if it succeeded, otherwise a synthetic test signal so the
/// render loop always has something to draw.
pub fn open_or_fallback(
    opened: Result<Box<dyn AnalyserSource>>,
    sample_rate: f32,
    fft_size: usize,
) -> Result<(Box<dyn AnalyserSource>, bool)> {
    match opened {
        Ok(source) => Ok((source, false)),
        Err(e) => {
            log::warn!("[session] source unavailable ({e}), falling back to synthetic signal");
            let synthetic = SyntheticSource::fallback(sample_rate, fft_size)?;
            Ok((Box::new(synthetic), true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl PlaybackBackend for Recorder {
        fn start(&mut self, offset_sec: f64) -> Result<()> {
            self.0.borrow_mut().push(format!("start {offset_sec}"));
            Ok(())
        }
        fn stop(&mut self) {
            self.0.borrow_mut().push("stop".into());
        }
    }

    fn file_session(duration: f64) -> (CaptureSession, Recorder) {
        let rec = Recorder::default();
        let session = CaptureSession::file(duration, Box::new(rec.clone())).unwrap();
        (session, rec)
    }

    #[test]
    fn play_pause_resume_tracks_position() {
        let (mut s, rec) = file_session(60.0);
        s.play(100.0).unwrap();
        assert!((s.position(110.0) - 10.0).abs() < 1e-9);
        s.pause(110.0).unwrap();
        assert_eq!(s.state(), TransportState::Paused { offset_sec: 10.0 });
        assert_eq!(s.position(500.0), 10.0);
        s.play(200.0).unwrap();
        assert!((s.position(205.0) - 15.0).abs() < 1e-9);
        assert_eq!(*rec.0.borrow(), vec!["start 0", "stop", "start 10"]);
    }

    #[test]
    fn seek_restarts_playback_node() {
        let (mut s, rec) = file_session(60.0);
        s.play(0.0).unwrap();
        s.seek(5.0, 30.0).unwrap();
        assert!((s.position(6.0) - 31.0).abs() < 1e-9);
        assert_eq!(*rec.0.borrow(), vec!["start 0", "stop", "start 30"]);
        s.seek(7.0, 1e9).unwrap();
        assert_eq!(s.position(7.0), 60.0);
    }

    #[test]
    fn seek_while_stopped_sets_resume_point() {
        let (mut s, rec) = file_session(60.0);
        s.seek(0.0, 12.0).unwrap();
        assert!(rec.0.borrow().is_empty());
        s.play(1.0).unwrap();
        assert_eq!(rec.0.borrow().last().map(String::as_str), Some("start 12"));
    }

    #[test]
    fn end_of_file_stops() {
        let (mut s, _rec) = file_session(2.0);
        s.play(0.0).unwrap();
        assert!(!s.update(1.0));
        assert!(s.update(2.5));
        assert_eq!(s.state(), TransportState::Stopped);
        assert_eq!(s.position(3.0), 0.0);
    }

    #[test]
    fn live_source_has_no_transport() {
        let mut s = CaptureSession::live();
        assert!(matches!(s.play(0.0), Err(ScopeError::Transport(_))));
        assert!(!s.update(1.0));
    }

    #[test]
    fn teardown_stops_node_and_rejects_transport() {
        let (mut s, rec) = file_session(60.0);
        s.play(0.0).unwrap();
        s.teardown();
        s.teardown();
        assert_eq!(*rec.0.borrow(), vec!["start 0", "stop"]);
        assert!(matches!(s.play(1.0), Err(ScopeError::Transport(_))));
    }

    #[test]
    fn dropping_a_playing_session_stops_it() {
        let (mut s, rec) = file_session(60.0);
        s.play(0.0).unwrap();
        drop(s);
        assert_eq!(rec.0.borrow().last().map(String::as_str), Some("stop"));
    }

    #[test]
    fn failed_source_falls_back_to_synthetic() {
        let failed: Result<Box<dyn AnalyserSource>> =
            Err(ScopeError::SourceUnavailable("permission denied".into()));
        let (source, fell_back) = open_or_fallback(failed, 44_100.0, 1024).unwrap();
        assert!(fell_back);
        assert_eq!(source.fft_size(), 1024);
    }
}
