//! Reusable working storage for the inference engine.
//!
//! Per-call image dimensions vary inside a batch, so the four working
//! buffers are sized to the largest pixel-count x label-count product
//! seen so far. Capacity only grows, never shrinks, which amortizes
//! allocation cost across a batch of images.

/// The four fixed-capacity buffers used during inference.
///
/// `unary` holds the negative-log-softmax energy, `current` the live
/// per-pixel distribution, `next` the accumulated energy for the step
/// in progress, and `tmp` is scratch handed to the filtering backend.
/// Each image's computation fully overwrites the prefix it uses before
/// reading it, so reuse across images is safe.
#[derive(Debug, Default)]
pub struct WorkBuffers {
    pub unary: Vec<f32>,
    pub current: Vec<f32>,
    pub next: Vec<f32>,
    pub tmp: Vec<f32>,
    pub(crate) capacity: usize,
}

impl WorkBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Guarantee all four buffers hold at least `elements` values.
    ///
    /// Growth is a full reallocation of all four buffers; requesting a
    /// smaller or equal capacity is a no-op.
    pub fn ensure(&mut self, elements: usize) {
        if elements <= self.capacity {
            return;
        }
        log::debug!(
            "growing working buffers from {} to {} elements",
            self.capacity,
            elements
        );
        self.unary = vec![0.0; elements];
        self.current = vec![0.0; elements];
        self.next = vec![0.0; elements];
        self.tmp = vec![0.0; elements];
        self.capacity = elements;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let buffers = WorkBuffers::new();
        assert_eq!(buffers.capacity(), 0);
        assert!(buffers.unary.is_empty());
    }

    #[test]
    fn grows_to_requested_size() {
        let mut buffers = WorkBuffers::new();
        buffers.ensure(128);
        assert_eq!(buffers.capacity(), 128);
        assert_eq!(buffers.unary.len(), 128);
        assert_eq!(buffers.current.len(), 128);
        assert_eq!(buffers.next.len(), 128);
        assert_eq!(buffers.tmp.len(), 128);
    }

    #[test]
    fn never_shrinks() {
        let mut buffers = WorkBuffers::new();
        buffers.ensure(256);
        buffers.ensure(64);
        assert_eq!(buffers.capacity(), 256);
        assert_eq!(buffers.current.len(), 256);
    }

    #[test]
    fn equal_request_is_noop() {
        let mut buffers = WorkBuffers::new();
        buffers.ensure(100);
        buffers.current[0] = 0.5;
        buffers.ensure(100);
        // no reallocation happened, contents survive
        assert_eq!(buffers.current[0], 0.5);
    }
}
