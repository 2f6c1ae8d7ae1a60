use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Single-slot, latest-wins hand-off of spectrum frames.
///
/// The graph thread publishes, the display thread takes. A frame that was
/// never taken is overwritten by the next publish and counted as discarded.
/// Cloning shares the slot.
#[derive(Debug, Clone, Default)]
pub struct SpectrumMailbox {
    slot: Arc<Mutex<Option<Vec<f32>>>>,
    discarded: Arc<AtomicU64>,
}

impl SpectrumMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Vec<f32>>> {
        // A panicking publisher cannot leave a half-written frame behind.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn publish(&self, frame: Vec<f32>) {
        if self.lock().replace(frame).is_some() {
            self.discarded.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn take(&self) -> Option<Vec<f32>> {
        self.lock().take()
    }

    pub fn has_frame(&self) -> bool {
        self.lock().is_some()
    }

    /// Frames overwritten before anyone took them.
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_latest_frame_wins() {
        let mailbox = SpectrumMailbox::new();
        mailbox.publish(vec![1.0]);
        mailbox.publish(vec![2.0]);
        assert_eq!(mailbox.take(), Some(vec![2.0]));
        assert_eq!(mailbox.discarded(), 1);
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn test_take_empties_slot() {
        let mailbox = SpectrumMailbox::new();
        assert!(!mailbox.has_frame());
        mailbox.publish(vec![0.5; 4]);
        assert!(mailbox.has_frame());
        mailbox.take();
        assert!(!mailbox.has_frame());
        mailbox.publish(vec![0.25; 4]);
        assert_eq!(mailbox.discarded(), 0);
    }

    #[test]
    fn test_publish_across_threads() {
        let mailbox = SpectrumMailbox::new();
        let producer = mailbox.clone();
        thread::spawn(move || {
            for i in 0..100 {
                producer.publish(vec![i as f32]);
            }
        })
        .join()
        .unwrap();

        assert_eq!(mailbox.take(), Some(vec![99.0]));
        assert_eq!(mailbox.discarded(), 99);
    }
}
