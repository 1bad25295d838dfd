/// Default number of cells allocated on load.
pub const INITIAL_TAPE_LEN: usize = 256;

/// Once the tape is this long, it grows by this many cells at a time instead
/// of doubling.
pub const MAX_TAPE_GROWTH: usize = 32768;

/// Growable, zero-initialized memory of signed integer cells.
///
/// The tape only ever grows forward. Each growth step extends it by
/// `min(len, max_growth)` cells, so it doubles until it reaches the cap and
/// then advances in cap-sized chunks.
#[derive(Debug, Clone, Default)]
pub struct Tape {
    cells: Vec<i32>,
    max_growth: usize,
}

impl Tape {
    /// A zeroed tape of `len` cells. Both sizes are clamped to at least 1 so
    /// that growth always makes progress.
    pub fn new(len: usize, max_growth: usize) -> Self {
        Self {
            cells: vec![0; len.max(1)],
            max_growth: max_growth.max(1),
        }
    }

    /// The tape a VM holds before any program is loaded.
    pub fn empty() -> Self {
        Self {
            cells: Vec::new(),
            max_growth: MAX_TAPE_GROWTH,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[i32] {
        &self.cells
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> Option<i32> {
        self.cells.get(index).copied()
    }

    /// Mutable access to a cell, growing the tape first if needed.
    #[inline(always)]
    pub fn cell_mut(&mut self, index: usize) -> &mut i32 {
        self.grow_to_include(index);
        &mut self.cells[index]
    }

    /// Grow until `index` is addressable, one policy step at a time.
    ///
    /// Returns the number of growth steps taken.
    pub fn grow_to_include(&mut self, index: usize) -> usize {
        let mut steps = 0;
        while index >= self.cells.len() {
            let len = self.cells.len();
            // An empty tape still has to make progress.
            let delta = len.min(self.max_growth).max(1);
            self.cells.reserve_exact(delta);
            self.cells.resize(len + delta, 0);
            steps += 1;
            tracing::trace!(from = len, to = len + delta, "tape grew");
        }
        steps
    }
}
