// WindowBuffer - fixed-size (optionally overlapping) windowing
//
// Accumulates decoded samples and yields windows of exactly `window_size`
// samples in arrival order. In overlapping mode the buffer start advances
// by `window_size - overlap_size` per window, so the tail of one window is
// re-examined at the head of the next. The buffer never yields a partial
// window; the terminal remainder is only released by an explicit flush at
// end-of-stream.
//
// Memory bound: once draining begins, at most one undrained window plus one
// incoming chunk is retained, so the buffer stays below 2 × window_size in
// the steady state.

/// Sample accumulator producing fixed-size classification windows.
#[derive(Debug)]
pub struct WindowBuffer {
    buf: Vec<f32>,
    window_size: usize,
    overlap_size: usize,
}

impl WindowBuffer {
    /// Create a buffer with the given window geometry.
    ///
    /// # Panics
    /// Panics unless `0 <= overlap_size < window_size` and `window_size > 0`.
    pub fn new(window_size: usize, overlap_size: usize) -> Self {
        assert!(window_size > 0, "window_size must be greater than 0");
        assert!(
            overlap_size < window_size,
            "overlap_size must be less than window_size"
        );
        Self {
            buf: Vec::with_capacity(window_size * 2),
            window_size,
            overlap_size,
        }
    }

    /// Append decoded samples in arrival order.
    pub fn push(&mut self, samples: &[f32]) {
        self.buf.extend_from_slice(samples);
    }

    /// Remove and return the oldest full window, if one is available.
    ///
    /// Advances the buffer start by `window_size - overlap_size`.
    pub fn try_take_window(&mut self) -> Option<Vec<f32>> {
        if self.buf.len() < self.window_size {
            return None;
        }
        let window = self.buf[..self.window_size].to_vec();
        self.buf.drain(..self.window_size - self.overlap_size);
        Some(window)
    }

    /// Release the terminal remainder at end-of-stream.
    ///
    /// Returns the remaining samples as one short window only when the
    /// remainder is strictly longer than the overlap (anything shorter has
    /// already been fully covered by the last emitted window). The buffer
    /// is empty afterwards either way.
    pub fn flush_remainder(&mut self) -> Option<Vec<f32>> {
        let remainder = std::mem::take(&mut self.buf);
        if remainder.len() > self.overlap_size {
            Some(remainder)
        } else {
            None
        }
    }

    /// Number of buffered samples not yet emitted.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn overlap_size(&self) -> usize {
        self.overlap_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_partial_windows() {
        let mut buf = WindowBuffer::new(4, 0);
        buf.push(&[0.1, 0.2, 0.3]);
        assert!(buf.try_take_window().is_none());

        buf.push(&[0.4]);
        assert_eq!(buf.try_take_window(), Some(vec![0.1, 0.2, 0.3, 0.4]));
        assert!(buf.try_take_window().is_none());
    }

    #[test]
    fn test_non_overlapping_consumes_full_window() {
        let mut buf = WindowBuffer::new(4, 0);
        buf.push(&[1.0; 8]);

        assert_eq!(buf.try_take_window().unwrap().len(), 4);
        assert_eq!(buf.try_take_window().unwrap().len(), 4);
        assert!(buf.try_take_window().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_overlapping_windows_share_tail() {
        let mut buf = WindowBuffer::new(4, 2);
        buf.push(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        assert_eq!(buf.try_take_window(), Some(vec![1.0, 2.0, 3.0, 4.0]));
        assert_eq!(buf.try_take_window(), Some(vec![3.0, 4.0, 5.0, 6.0]));
        assert!(buf.try_take_window().is_none());
    }

    #[test]
    fn test_flush_remainder_respects_overlap() {
        let mut buf = WindowBuffer::new(4, 2);
        buf.push(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(buf.try_take_window().is_some());

        // Remainder [3.0, 4.0, 5.0] is longer than the overlap (2)
        assert_eq!(buf.flush_remainder(), Some(vec![3.0, 4.0, 5.0]));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_flush_drops_already_covered_tail() {
        let mut buf = WindowBuffer::new(4, 2);
        buf.push(&[1.0, 2.0, 3.0, 4.0]);
        assert!(buf.try_take_window().is_some());

        // Only the re-examined overlap [3.0, 4.0] is left; nothing new
        assert_eq!(buf.flush_remainder(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_flush_empty_buffer_is_none() {
        let mut buf = WindowBuffer::new(4, 0);
        assert_eq!(buf.flush_remainder(), None);
    }

    #[test]
    fn test_steady_state_memory_bound() {
        let mut buf = WindowBuffer::new(100, 25);
        for _ in 0..1000 {
            buf.push(&[0.5; 30]);
            while buf.try_take_window().is_some() {}
            assert!(
                buf.len() < 2 * 100,
                "buffer grew past 2x window_size: {}",
                buf.len()
            );
        }
    }

    #[test]
    #[should_panic(expected = "overlap_size must be less than window_size")]
    fn test_overlap_invariant_enforced() {
        WindowBuffer::new(4, 4);
    }

    #[test]
    #[should_panic(expected = "window_size must be greater than 0")]
    fn test_zero_window_size_panics() {
        WindowBuffer::new(0, 0);
    }
}
