//! Closed-caption side collaborator.
//!
//! Captions need the video decoder handle, which only exists once a decoder
//! is linked behind the video channel. When playback starts a handler thread
//! queries the handle, starts and shows captions, then parks until told to
//! quit, at which point it hides and stops them.

use crate::error::Result;
use crate::pad::{ChannelHandle, DecoderHandle};
use kanal::{Receiver, Sender, bounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

/// Closed-caption renderer.
pub trait ClosedCaptions: Send + Sync {
    /// Start rendering for `decoder`.
    ///
    /// Failures are reported as [`Error::CaptionStart`](crate::error::Error::CaptionStart).
    fn start(&self, decoder: DecoderHandle) -> Result<()>;

    /// Make captions visible.
    fn show(&self);

    /// Hide captions.
    fn hide(&self);

    /// Stop rendering.
    fn stop(&self);
}

struct Handler {
    quit: Sender<()>,
    thread: JoinHandle<()>,
}

/// Owns the caption handler thread.
pub struct CaptionController {
    element: String,
    captions: Arc<dyn ClosedCaptions>,
    active: Arc<AtomicBool>,
    handler: Mutex<Option<Handler>>,
}

impl CaptionController {
    /// Create a controller for `captions`.
    pub fn new(element: impl Into<String>, captions: Arc<dyn ClosedCaptions>) -> Self {
        Self {
            element: element.into(),
            captions,
            active: Arc::new(AtomicBool::new(false)),
            handler: Mutex::new(None),
        }
    }

    /// Whether captions are started and showing.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Whether the handler thread is running.
    pub fn is_running(&self) -> bool {
        self.handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Spawn the handler thread for the decoder behind `video`.
    ///
    /// A second call while running is a no-op. Returns `false` if the thread
    /// could not be spawned.
    pub fn start(&self, video: ChannelHandle) -> bool {
        let mut handler = self.handler.lock().unwrap_or_else(PoisonError::into_inner);
        if handler.is_some() {
            return true;
        }

        let (quit_tx, quit_rx) = bounded(1);
        let captions = Arc::clone(&self.captions);
        let active = Arc::clone(&self.active);
        let element = self.element.clone();

        let spawned = thread::Builder::new()
            .name(format!("{}-cc", self.element))
            .spawn(move || run_handler(&element, video, captions, active, quit_rx));

        match spawned {
            Ok(thread) => {
                *handler = Some(Handler {
                    quit: quit_tx,
                    thread,
                });
                true
            }
            Err(e) => {
                tracing::error!(element = %self.element, error = %e, "failed to start caption handler");
                false
            }
        }
    }

    /// Stop the handler thread and wait for it.
    pub fn stop(&self) {
        let handler = self
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(Handler { quit, thread }) = handler {
            let _ = quit.send(());
            drop(quit);
            if thread.join().is_err() {
                tracing::error!(element = %self.element, "caption handler panicked");
            }
        }
    }

    /// Hide captions during trick-play, show them at normal speed.
    pub fn on_speed_changed(&self, rate: f64) {
        if !self.is_active() {
            return;
        }
        if rate != 1.0 {
            self.captions.hide();
        } else {
            self.captions.show();
        }
    }
}

impl Drop for CaptionController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_handler(
    element: &str,
    video: ChannelHandle,
    captions: Arc<dyn ClosedCaptions>,
    active: Arc<AtomicBool>,
    quit: Receiver<()>,
) {
    let Some(decoder) = video.peer_decoder_handle() else {
        tracing::error!(element = %element, "video decoder handle query failed");
        return;
    };
    tracing::debug!(element = %element, decoder = decoder.0, "video decoder handle queried");

    if let Err(e) = captions.start(decoder) {
        tracing::error!(element = %element, error = %e, "unable to initialize captions");
        return;
    }
    active.store(true, Ordering::SeqCst);
    captions.show();

    // Returns on quit or when the sender is dropped.
    let _ = quit.recv();

    tracing::debug!(element = %element, "shutting down captions");
    active.store(false, Ordering::SeqCst);
    captions.hide();
    captions.stop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CaptionCall, MockCaptions, RecordingChannel};
    use std::time::{Duration, Instant};

    fn wait_for(cond: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_handler_lifecycle() {
        let captions = Arc::new(MockCaptions::new());
        let controller = CaptionController::new("aamp", captions.clone());
        let video: ChannelHandle = Arc::new(RecordingChannel::new("video_01").with_decoder(DecoderHandle(42)));

        assert!(controller.start(video.clone()));
        assert!(controller.start(video));
        wait_for(|| controller.is_active());
        assert!(controller.is_active());

        controller.on_speed_changed(2.0);
        controller.on_speed_changed(1.0);
        controller.stop();

        assert!(!controller.is_running());
        assert_eq!(
            captions.calls(),
            [
                CaptionCall::Start(DecoderHandle(42)),
                CaptionCall::Show,
                CaptionCall::Hide,
                CaptionCall::Show,
                CaptionCall::Hide,
                CaptionCall::Stop,
            ]
        );
    }

    #[test]
    fn test_no_decoder_handle() {
        let captions = Arc::new(MockCaptions::new());
        let controller = CaptionController::new("aamp", captions.clone());
        assert!(controller.start(Arc::new(RecordingChannel::new("video_01"))));
        controller.stop();
        assert!(captions.calls().is_empty());
        assert!(!controller.is_active());
    }

    #[test]
    fn test_start_failure() {
        let captions = Arc::new(MockCaptions::new().failing());
        let controller = CaptionController::new("aamp", captions.clone());
        let video: ChannelHandle = Arc::new(RecordingChannel::new("video_01").with_decoder(DecoderHandle(1)));
        controller.start(video);
        controller.stop();
        assert_eq!(captions.calls(), [CaptionCall::Start(DecoderHandle(1))]);
    }

    #[test]
    fn test_speed_change_ignored_when_inactive() {
        let captions = Arc::new(MockCaptions::new());
        let controller = CaptionController::new("aamp", captions.clone());
        controller.on_speed_changed(4.0);
        assert!(captions.calls().is_empty());
    }
}
