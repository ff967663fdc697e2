use crate::term::TermId;

/// A LIFO pool of reusable child-term buffers.
///
/// Each composite case of the rewriter takes a buffer, fills it with
/// simplified children, and gives it back before returning, so steady-state
/// recursion allocates nothing. A buffer lost to an error unwind is simply
/// dropped; [`reset`](Self::reset) empties the pool so the next top-level
/// call starts clean.
pub(crate) struct ScratchStack {
    pool: Vec<Vec<TermId>>,
}

impl ScratchStack {
    pub(crate) fn new() -> Self {
        Self { pool: Vec::new() }
    }

    /// Takes a cleared buffer with room for `cap` entries.
    pub(crate) fn take(&mut self, cap: usize) -> Vec<TermId> {
        let mut buf = self.pool.pop().unwrap_or_default();
        buf.clear();
        buf.reserve(cap);
        buf
    }

    /// Returns a buffer to the pool.
    pub(crate) fn give(&mut self, buf: Vec<TermId>) {
        self.pool.push(buf);
    }

    /// Drops all pooled buffers.
    pub(crate) fn reset(&mut self) {
        self.pool.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_are_reused() {
        let mut scratch = ScratchStack::new();
        let mut a = scratch.take(4);
        a.push(TermId::TRUE);
        let ptr = a.as_ptr();
        scratch.give(a);

        let b = scratch.take(2);
        assert!(b.is_empty());
        assert_eq!(b.as_ptr(), ptr);

        scratch.give(b);
        scratch.reset();
        assert!(scratch.pool.is_empty());
    }
}
