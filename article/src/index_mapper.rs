/// Maps byte offsets in the current plain line to positions in its segment
/// list: `offset -> (segment index, byte offset inside the segment's escaped
/// buffer)`. Recorded at every rune boundary while the line is built, read
/// back when URL spans are overlaid onto the segment HTML.
#[derive(Debug, Default)]
pub(crate) struct IndexMapper {
    arr: Vec<(usize, usize)>,
}

impl IndexMapper {
    pub(crate) fn new() -> Self {
        Self {
            arr: Vec::with_capacity(128),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.arr.clear();
    }

    pub(crate) fn record(&mut self, from: usize, seg: usize, off: usize) {
        if self.arr.len() <= from {
            self.arr.resize(from + 1, (0, 0));
        }
        self.arr[from] = (seg, off);
    }

    /// Spans handed to the overlay always start and end on recorded rune
    /// boundaries, so lookups of unrecorded offsets do not occur in practice;
    /// they fall back to the line start.
    pub(crate) fn get(&self, from: usize) -> (usize, usize) {
        self.arr.get(from).copied().unwrap_or_default()
    }
}
