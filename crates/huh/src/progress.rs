//! Progress reporting for long-running encodes and decodes.
//!
//! Observers are injected per call and invoked synchronously on the calling
//! thread. A slow observer slows the whole operation down.

/// Snapshot of an operation's progress, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Pixels processed so far
    pub processed: u64,
    /// Pixels in the whole image
    pub total: u64,
}

impl Progress {
    /// Completed fraction in `0.0..=1.0`. An empty image counts as complete.
    #[inline]
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f32 / self.total as f32
        }
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

/// Receives progress notifications.
///
/// Any `FnMut(Progress)` closure is an observer.
pub trait ProgressObserver {
    fn on_progress(&mut self, progress: Progress);
}

impl<F: FnMut(Progress)> ProgressObserver for F {
    fn on_progress(&mut self, progress: Progress) {
        self(progress)
    }
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&mut self, _progress: Progress) {}
}

/// Forwards progress to an observer whenever a whole-percent boundary is
/// crossed, so an operation sends at most 101 notifications.
pub(crate) struct ProgressTracker<'a> {
    observer: &'a mut dyn ProgressObserver,
    processed: u64,
    total: u64,
    last_percent: Option<u64>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(observer: &'a mut dyn ProgressObserver, total: u64) -> Self {
        Self {
            observer,
            processed: 0,
            total,
            last_percent: None,
        }
    }

    pub(crate) fn advance(&mut self, pixels: u64) {
        self.processed = (self.processed + pixels).min(self.total);
        if self.total == 0 {
            return;
        }
        let percent = self.processed * 100 / self.total;
        if self.last_percent.is_none_or(|last| percent > last) {
            self.last_percent = Some(percent);
            self.notify();
        }
    }

    /// Sends the completion notification unless it already went out.
    pub(crate) fn finish(&mut self) {
        self.processed = self.total;
        if self.last_percent != Some(100) {
            self.last_percent = Some(100);
            self.notify();
        }
    }

    fn notify(&mut self) {
        self.observer.on_progress(Progress {
            processed: self.processed,
            total: self.total,
        });
    }
}
