// Tue Jan 13 2026 - Alex

use crate::gc::HeapError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// User interrupt, polled by every loop over objects, segments or handles.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    raised: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.raised.store(false, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<(), HeapError> {
        if self.is_raised() {
            Err(HeapError::Interrupted)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = InterruptFlag::new();
        let other = flag.clone();
        assert!(flag.check().is_ok());
        other.raise();
        assert_eq!(flag.check(), Err(HeapError::Interrupted));
        flag.clear();
        assert!(!other.is_raised());
    }
}
