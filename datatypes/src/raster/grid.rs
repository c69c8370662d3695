use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error;
use crate::util::Result;

/// A 2D grid index in (y, x) order
#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash, Serialize, Deserialize)]
pub struct GridIdx2D(pub [isize; 2]);

impl GridIdx2D {
    pub fn new(idx: [isize; 2]) -> Self {
        Self(idx)
    }

    pub fn y(&self) -> isize {
        self.0[0]
    }

    pub fn x(&self) -> isize {
        self.0[1]
    }
}

impl From<[isize; 2]> for GridIdx2D {
    fn from(idx: [isize; 2]) -> Self {
        Self(idx)
    }
}

/// An `GridShape2D` describes the shape of a 2D array in (y, x) order.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Serialize, Deserialize)]
pub struct GridShape2D {
    pub shape_array: [usize; 2],
}

impl GridShape2D {
    pub fn new(shape_array: [usize; 2]) -> Self {
        Self { shape_array }
    }

    pub fn axis_size_y(&self) -> usize {
        self.shape_array[0]
    }

    pub fn axis_size_x(&self) -> usize {
        self.shape_array[1]
    }

    pub fn number_of_elements(&self) -> usize {
        self.shape_array[0] * self.shape_array[1]
    }
}

impl From<[usize; 2]> for GridShape2D {
    fn from(shape_array: [usize; 2]) -> Self {
        Self { shape_array }
    }
}

/// A row-major 2D array of pixels.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Grid2D<T> {
    pub shape: GridShape2D,
    pub data: Vec<T>,
}

impl<T> Grid2D<T>
where
    T: Copy,
{
    /// Creates a new `Grid`
    ///
    /// # Errors
    ///
    /// This constructor fails if the data container's capacity is different from the grid's dimension number
    ///
    pub fn new(shape: GridShape2D, data: Vec<T>) -> Result<Self> {
        ensure!(
            shape.number_of_elements() == data.len(),
            error::DimensionCapacityDoesNotMatchDataCapacitySnafu {
                dimension_cap: shape.number_of_elements(),
                data_cap: data.len()
            }
        );

        Ok(Self { shape, data })
    }

    pub fn new_filled(shape: GridShape2D, fill_value: T) -> Self {
        Self {
            shape,
            data: vec![fill_value; shape.number_of_elements()],
        }
    }

    pub fn axis_size_y(&self) -> usize {
        self.shape.axis_size_y()
    }

    pub fn axis_size_x(&self) -> usize {
        self.shape.axis_size_x()
    }

    fn linear_index(&self, y: usize, x: usize) -> usize {
        y * self.shape.axis_size_x() + x
    }

    /// Returns the value at (y, x) or `None` if the index is out of bounds.
    pub fn get(&self, y: usize, x: usize) -> Option<T> {
        if y < self.axis_size_y() && x < self.axis_size_x() {
            Some(self.data[self.linear_index(y, x)])
        } else {
            None
        }
    }

    /// Sets the value at (y, x). Out of bounds indices are ignored.
    pub fn set(&mut self, y: usize, x: usize, value: T) {
        if y < self.axis_size_y() && x < self.axis_size_x() {
            let idx = self.linear_index(y, x);
            self.data[idx] = value;
        }
    }

    pub fn row(&self, y: usize) -> &[T] {
        let width = self.axis_size_x();
        &self.data[y * width..(y + 1) * width]
    }

    /// Copies `other` into this grid so that `other`'s (0, 0) lands on `offset` (y, x).
    /// Parts of `other` that fall outside of this grid are skipped.
    pub fn blit_from(&mut self, other: &Grid2D<T>, offset: GridIdx2D) {
        for other_y in 0..other.axis_size_y() {
            let y = offset.y() + other_y as isize;
            if y < 0 || y >= self.axis_size_y() as isize {
                continue;
            }

            for other_x in 0..other.axis_size_x() {
                let x = offset.x() + other_x as isize;
                if x < 0 || x >= self.axis_size_x() as isize {
                    continue;
                }

                let value = other.data[other.linear_index(other_y, other_x)];
                self.set(y as usize, x as usize, value);
            }
        }
    }

    /// Copies the part at `offset` (y, x) with `shape` out of this grid.
    /// Pixels outside of this grid are set to `fill_value`.
    pub fn sub_grid(&self, offset: GridIdx2D, shape: GridShape2D, fill_value: T) -> Grid2D<T> {
        let mut sub_grid = Grid2D::new_filled(shape, fill_value);
        sub_grid.blit_from(self, [-offset.y(), -offset.x()].into());
        sub_grid
    }

    pub fn map_elements<To, F>(&self, map_fn: F) -> Grid2D<To>
    where
        F: Fn(T) -> To,
        To: Copy,
    {
        Grid2D {
            shape: self.shape,
            data: self.data.iter().copied().map(map_fn).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_checks_capacity() {
        assert!(Grid2D::new([2, 3].into(), vec![0u8; 6]).is_ok());
        assert!(Grid2D::new([2, 3].into(), vec![0u8; 5]).is_err());
    }

    #[test]
    fn get_and_set() {
        let mut grid = Grid2D::new([2, 3].into(), vec![1, 2, 3, 4, 5, 6]).unwrap();

        assert_eq!(grid.get(1, 0), Some(4));
        assert_eq!(grid.get(2, 0), None);

        grid.set(0, 2, 42);
        assert_eq!(grid.row(0), &[1, 2, 42]);
    }

    #[test]
    fn blit_with_negative_offset() {
        let mut target = Grid2D::new_filled([3, 3].into(), 0);
        let source = Grid2D::new([2, 2].into(), vec![1, 2, 3, 4]).unwrap();

        target.blit_from(&source, [-1, 2].into());

        assert_eq!(target.data, vec![0, 0, 3, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn sub_grid_pads_with_fill_value() {
        let grid = Grid2D::new([2, 2].into(), vec![1, 2, 3, 4]).unwrap();

        let sub_grid = grid.sub_grid([1, 1].into(), [2, 2].into(), -1);

        assert_eq!(sub_grid.data, vec![4, -1, -1, -1]);
    }

    #[test]
    fn map_elements() {
        let grid = Grid2D::new([1, 3].into(), vec![1, 2, 3]).unwrap();

        assert_eq!(grid.map_elements(|v| v == 2).data, vec![false, true, false]);
    }
}
