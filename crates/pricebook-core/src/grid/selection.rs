use std::ops::RangeInclusive;

/// Zero-based position in the visible grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Rectangular selection between an anchor and a focus cell.
///
/// The focus is the cell the cursor is on; the anchor stays put while a
/// range is extended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    anchor: CellPos,
    focus: CellPos,
}

impl Selection {
    #[must_use]
    pub const fn at(pos: CellPos) -> Self {
        Self {
            anchor: pos,
            focus: pos,
        }
    }

    #[must_use]
    pub const fn anchor(&self) -> CellPos {
        self.anchor
    }

    #[must_use]
    pub const fn focus(&self) -> CellPos {
        self.focus
    }

    /// Move the focus; the anchor follows unless `extend` is set.
    pub const fn move_to(&mut self, pos: CellPos, extend: bool) {
        self.focus = pos;
        if !extend {
            self.anchor = pos;
        }
    }

    pub const fn select_all(&mut self, rows: usize, cols: usize) {
        if rows == 0 || cols == 0 {
            return;
        }
        self.anchor = CellPos::new(0, 0);
        self.focus = CellPos::new(rows - 1, cols - 1);
    }

    /// Top-left corner of the range.
    #[must_use]
    pub fn top_left(&self) -> CellPos {
        CellPos::new(
            self.anchor.row.min(self.focus.row),
            self.anchor.col.min(self.focus.col),
        )
    }

    #[must_use]
    pub fn rows(&self) -> RangeInclusive<usize> {
        self.anchor.row.min(self.focus.row)..=self.anchor.row.max(self.focus.row)
    }

    #[must_use]
    pub fn cols(&self) -> RangeInclusive<usize> {
        self.anchor.col.min(self.focus.col)..=self.anchor.col.max(self.focus.col)
    }

    #[must_use]
    pub fn contains(&self, pos: CellPos) -> bool {
        self.rows().contains(&pos.row) && self.cols().contains(&pos.col)
    }

    #[must_use]
    pub fn is_single(&self) -> bool {
        self.anchor == self.focus
    }

    /// Pull both corners inside a grid of `rows` by `cols`.
    pub fn clamp(&mut self, rows: usize, cols: usize) {
        let clamp = |pos: CellPos| {
            CellPos::new(
                pos.row.min(rows.saturating_sub(1)),
                pos.col.min(cols.saturating_sub(1)),
            )
        };
        self.anchor = clamp(self.anchor);
        self.focus = clamp(self.focus);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extending_keeps_anchor() {
        let mut sel = Selection::at(CellPos::new(2, 3));
        sel.move_to(CellPos::new(0, 1), true);
        assert_eq!(sel.anchor(), CellPos::new(2, 3));
        assert_eq!(sel.top_left(), CellPos::new(0, 1));
        assert_eq!(sel.rows(), 0..=2);
        assert_eq!(sel.cols(), 1..=3);
        assert!(sel.contains(CellPos::new(1, 2)));
        assert!(!sel.contains(CellPos::new(3, 2)));

        sel.move_to(CellPos::new(4, 4), false);
        assert!(sel.is_single());
    }

    #[test]
    fn clamp_and_select_all() {
        let mut sel = Selection::at(CellPos::new(9, 9));
        sel.clamp(3, 2);
        assert_eq!(sel.focus(), CellPos::new(2, 1));
        sel.select_all(3, 2);
        assert_eq!(sel.rows(), 0..=2);
        assert_eq!(sel.cols(), 0..=1);
    }
}
