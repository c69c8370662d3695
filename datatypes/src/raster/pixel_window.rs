use serde::{Deserialize, Serialize};

use super::{GridIdx2D, GridShape2D};

/// A rectangular window in the pixel space of a raster.
///
/// The start may be negative or beyond the raster, e.g., when the window covers an area that
/// is only partially inside of the raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelWindow {
    pub start_x: isize, // pixelspace origin
    pub start_y: isize,
    pub size_x: usize, // pixelspace size
    pub size_y: usize,
}

impl PixelWindow {
    pub fn new(start_x: isize, start_y: isize, size_x: usize, size_y: usize) -> Self {
        Self {
            start_x,
            start_y,
            size_x,
            size_y,
        }
    }

    /// The window `[0, size_x) x [0, size_y)` of a whole raster
    pub fn of_raster(size_x: usize, size_y: usize) -> Self {
        Self::new(0, 0, size_x, size_y)
    }

    pub fn start(&self) -> GridIdx2D {
        [self.start_y, self.start_x].into()
    }

    /// The exclusive end index
    pub fn end(&self) -> GridIdx2D {
        [self.end_y(), self.end_x()].into()
    }

    pub fn end_x(&self) -> isize {
        self.start_x + self.size_x as isize
    }

    pub fn end_y(&self) -> isize {
        self.start_y + self.size_y as isize
    }

    pub fn shape(&self) -> GridShape2D {
        [self.size_y, self.size_x].into()
    }

    pub fn is_empty(&self) -> bool {
        self.size_x == 0 || self.size_y == 0
    }

    pub fn gdal_window_start(&self) -> (isize, isize) {
        (self.start_x, self.start_y)
    }

    pub fn gdal_window_size(&self) -> (usize, usize) {
        (self.size_x, self.size_y)
    }

    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let start_x = self.start_x.max(other.start_x);
        let start_y = self.start_y.max(other.start_y);
        let end_x = self.end_x().min(other.end_x());
        let end_y = self.end_y().min(other.end_y());

        if start_x >= end_x || start_y >= end_y {
            return None;
        }

        Some(Self::new(
            start_x,
            start_y,
            (end_x - start_x) as usize,
            (end_y - start_y) as usize,
        ))
    }

    pub fn contains(&self, other: &Self) -> bool {
        other.start_x >= self.start_x
            && other.start_y >= self.start_y
            && other.end_x() <= self.end_x()
            && other.end_y() <= self.end_y()
    }

    /// The start of `self` relative to the start of `other`
    pub fn offset_in(&self, other: &Self) -> GridIdx2D {
        [self.start_y - other.start_y, self.start_x - other.start_x].into()
    }

    /// Moves the window by (dx, dy) pixels
    #[must_use]
    pub fn translated(&self, dx: isize, dy: isize) -> Self {
        Self::new(self.start_x + dx, self.start_y + dy, self.size_x, self.size_y)
    }

    /// Iterates over the window in blocks of at most `block_shape`, row by row.
    /// The blocks start at the window's start and the last block of a row or column may be smaller.
    pub fn blocks(&self, block_shape: GridShape2D) -> BlockIter {
        BlockIter {
            window: *self,
            block_size_x: block_shape.axis_size_x().max(1),
            block_size_y: block_shape.axis_size_y().max(1),
            next_x: 0,
            next_y: 0,
        }
    }
}

/// Iterator over the blocks of a [`PixelWindow`], yielding windows in the same (absolute) pixel
/// space as the original window.
#[derive(Debug, Clone)]
pub struct BlockIter {
    window: PixelWindow,
    block_size_x: usize,
    block_size_y: usize,
    next_x: usize,
    next_y: usize,
}

impl Iterator for BlockIter {
    type Item = PixelWindow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.window.is_empty() || self.next_y >= self.window.size_y {
            return None;
        }

        let size_x = self.block_size_x.min(self.window.size_x - self.next_x);
        let size_y = self.block_size_y.min(self.window.size_y - self.next_y);

        let block = PixelWindow::new(
            self.window.start_x + self.next_x as isize,
            self.window.start_y + self.next_y as isize,
            size_x,
            size_y,
        );

        self.next_x += size_x;
        if self.next_x >= self.window.size_x {
            self.next_x = 0;
            self.next_y += size_y;
        }

        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection() {
        let a = PixelWindow::new(-2, -2, 5, 5);
        let b = PixelWindow::of_raster(10, 10);

        assert_eq!(a.intersection(&b), Some(PixelWindow::new(0, 0, 3, 3)));
        assert_eq!(
            PixelWindow::new(10, 0, 2, 2).intersection(&b),
            None,
            "touching windows do not intersect"
        );
    }

    #[test]
    fn contains_and_offset() {
        let outer = PixelWindow::new(5, 5, 10, 10);
        let inner = PixelWindow::new(7, 6, 2, 2);

        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert_eq!(inner.offset_in(&outer), [1, 2].into());
    }

    #[test]
    fn blocks_cover_window_exactly() {
        let window = PixelWindow::new(3, 4, 5, 3);
        let blocks: Vec<_> = window.blocks([2, 2].into()).collect();

        assert_eq!(
            blocks,
            vec![
                PixelWindow::new(3, 4, 2, 2),
                PixelWindow::new(5, 4, 2, 2),
                PixelWindow::new(7, 4, 1, 2),
                PixelWindow::new(3, 6, 2, 1),
                PixelWindow::new(5, 6, 2, 1),
                PixelWindow::new(7, 6, 1, 1),
            ]
        );

        let covered: usize = blocks.iter().map(|b| b.size_x * b.size_y).sum();
        assert_eq!(covered, 15);
    }

    #[test]
    fn blocks_of_empty_window() {
        assert_eq!(PixelWindow::new(0, 0, 0, 4).blocks([2, 2].into()).count(), 0);
    }
}
