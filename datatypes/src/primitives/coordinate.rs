use float_cmp::{ApproxEq, F64Margin};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A planar position in the units of some projected reference system.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, PartialOrd, Serialize, Default)]
pub struct Coordinate2D {
    pub x: f64,
    pub y: f64,
}

impl Coordinate2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn min_elements(&self, other: Self) -> Self {
        Coordinate2D {
            x: self.x.min(other.x),
            y: self.y.min(other.y),
        }
    }

    #[must_use]
    pub fn max_elements(&self, other: Self) -> Self {
        Coordinate2D {
            x: self.x.max(other.x),
            y: self.y.max(other.y),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl fmt::Display for Coordinate2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(f64, f64)> for Coordinate2D {
    fn from(tuple: (f64, f64)) -> Self {
        let (x, y) = tuple;
        Self { x, y }
    }
}

impl From<Coordinate2D> for geo::Coord<f64> {
    fn from(coordinate: Coordinate2D) -> geo::Coord<f64> {
        geo::Coord {
            x: coordinate.x,
            y: coordinate.y,
        }
    }
}

impl From<geo::Coord<f64>> for Coordinate2D {
    fn from(coordinate: geo::Coord<f64>) -> Coordinate2D {
        Coordinate2D {
            x: coordinate.x,
            y: coordinate.y,
        }
    }
}

impl ApproxEq for Coordinate2D {
    type Margin = F64Margin;

    fn approx_eq<M>(self, other: Self, margin: M) -> bool
    where
        M: Into<Self::Margin>,
    {
        let m = margin.into();
        self.x.approx_eq(other.x, m) && self.y.approx_eq(other.y, m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_max_elements() {
        let a = Coordinate2D::new(1.0, 5.0);
        let b = Coordinate2D::new(3.0, -2.0);

        assert_eq!(a.min_elements(b), Coordinate2D::new(1.0, -2.0));
        assert_eq!(a.max_elements(b), Coordinate2D::new(3.0, 5.0));
    }

    #[test]
    fn display() {
        assert_eq!(Coordinate2D::new(1.5, -2.0).to_string(), "(1.5, -2)");
    }

    #[test]
    fn geo_conversion() {
        let c = Coordinate2D::new(-10_965_275.57, 3_429_693.3);
        let geo_coord: geo::Coord<f64> = c.into();

        assert_eq!(Coordinate2D::from(geo_coord), c);
    }

    #[test]
    fn approx_eq() {
        let a = Coordinate2D::new(0.1 + 0.2, 1.0);
        let b = Coordinate2D::new(0.3, 1.0);

        assert!(a.approx_eq(b, F64Margin::default()));
        assert!(!a.approx_eq(Coordinate2D::new(0.31, 1.0), F64Margin::default()));
    }
}
