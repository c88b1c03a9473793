//! Axis-aligned rectangle with arbitrary numeric component type.

use nalgebra::{Scalar, Vector2};
use num_traits::{NumAssign, One, Zero};
use std::ops::{Add, Div, Mul, Sub};

/// A rect defined by its left-top corner position and size.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rect<T: Scalar> {
    /// Position of the left-top corner.
    pub position: Vector2<T>,
    /// Width (x) and height (y).
    pub size: Vector2<T>,
}

impl<T: Scalar + Zero> Default for Rect<T> {
    fn default() -> Self {
        Self {
            position: Vector2::new(Zero::zero(), Zero::zero()),
            size: Vector2::new(Zero::zero(), Zero::zero()),
        }
    }
}

impl<T> Rect<T>
where
    T: Scalar + NumAssign + PartialOrd + Copy,
{
    #[inline]
    pub fn new(x: T, y: T, w: T, h: T) -> Self {
        Self {
            position: Vector2::new(x, y),
            size: Vector2::new(w, h),
        }
    }

    #[inline]
    pub fn with_position(mut self, position: Vector2<T>) -> Self {
        self.position = position;
        self
    }

    #[inline]
    pub fn with_size(mut self, size: Vector2<T>) -> Self {
        self.size = size;
        self
    }

    #[inline]
    pub fn w(&self) -> T {
        self.size.x
    }

    #[inline]
    pub fn h(&self) -> T {
        self.size.y
    }

    #[inline]
    pub fn left_top_corner(&self) -> Vector2<T> {
        self.position
    }

    #[inline]
    pub fn right_top_corner(&self) -> Vector2<T> {
        Vector2::new(self.position.x + self.size.x, self.position.y)
    }

    #[inline]
    pub fn left_bottom_corner(&self) -> Vector2<T> {
        Vector2::new(self.position.x, self.position.y + self.size.y)
    }

    #[inline]
    pub fn right_bottom_corner(&self) -> Vector2<T> {
        self.position + self.size
    }

    /// Checks if the rect contains the given point. Edges are inclusive.
    #[inline]
    pub fn contains(&self, pt: Vector2<T>) -> bool {
        pt.x >= self.position.x
            && pt.x <= self.position.x + self.size.x
            && pt.y >= self.position.y
            && pt.y <= self.position.y + self.size.y
    }

    /// Checks if the rect fully contains the other rect, edges inclusive.
    #[inline]
    pub fn contains_rect(&self, other: &Rect<T>) -> bool {
        other.position.x >= self.position.x
            && other.position.x + other.size.x <= self.position.x + self.size.x
            && other.position.y >= self.position.y
            && other.position.y + other.size.y <= self.position.y + self.size.y
    }

    /// Checks if two rects overlap or touch.
    #[inline]
    pub fn intersects(&self, other: Rect<T>) -> bool {
        other.position.x <= self.position.x + self.size.x
            && other.position.x + other.size.x >= self.position.x
            && other.position.y <= self.position.y + self.size.y
            && other.position.y + other.size.y >= self.position.y
    }

    /// Extends the rect to contain the given point.
    #[inline]
    pub fn push(&mut self, pt: Vector2<T>) {
        if pt.x < self.position.x {
            self.size.x += self.position.x - pt.x;
            self.position.x = pt.x;
        } else if pt.x > self.position.x + self.size.x {
            self.size.x = pt.x - self.position.x;
        }
        if pt.y < self.position.y {
            self.size.y += self.position.y - pt.y;
            self.position.y = pt.y;
        } else if pt.y > self.position.y + self.size.y {
            self.size.y = pt.y - self.position.y;
        }
    }

    /// Extends the rect so it contains the other rect.
    #[inline]
    pub fn extend_to_contain(&mut self, other: Rect<T>) {
        self.push(other.left_top_corner());
        self.push(other.right_bottom_corner());
    }

    /// Returns a rect grown by the given amount on each side.
    #[inline]
    #[must_use]
    pub fn inflate(&self, dw: T, dh: T) -> Self {
        Self {
            position: Vector2::new(self.position.x - dw, self.position.y - dh),
            size: Vector2::new(self.size.x + dw + dw, self.size.y + dh + dh),
        }
    }

    /// Returns a rect shrunk by the given amount on each side.
    #[inline]
    #[must_use]
    pub fn deflate(&self, dw: T, dh: T) -> Self {
        Self {
            position: Vector2::new(self.position.x + dw, self.position.y + dh),
            size: Vector2::new(self.size.x - (dw + dw), self.size.y - (dh + dh)),
        }
    }

    #[inline]
    pub fn translate(&self, translation: Vector2<T>) -> Self {
        Self {
            position: Vector2::new(
                self.position.x + translation.x,
                self.position.y + translation.y,
            ),
            size: self.size,
        }
    }
}

impl<T> Rect<T>
where
    T: Scalar
        + NumAssign
        + PartialOrd
        + Copy
        + Add<Output = T>
        + Sub<Output = T>
        + Mul<Output = T>
        + Div<Output = T>,
{
    #[inline]
    pub fn center(&self) -> Vector2<T> {
        let two = T::one() + T::one();
        Vector2::new(
            self.position.x + self.size.x / two,
            self.position.y + self.size.y / two,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn contains_is_edge_inclusive() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains(Vector2::new(0.0, 0.0)));
        assert!(rect.contains(Vector2::new(10.0, 10.0)));
        assert!(!rect.contains(Vector2::new(10.1, 10.0)));
    }

    #[test]
    fn contains_rect_requires_full_fit() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(outer.contains_rect(&Rect::new(10.0, 10.0, 5.0, 5.0)));
        assert!(outer.contains_rect(&Rect::new(0.0, 0.0, 100.0, 100.0)));
        assert!(!outer.contains_rect(&Rect::new(98.0, 10.0, 5.0, 5.0)));
    }

    #[test]
    fn intersects_counts_touching_edges() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(Rect::new(10.0, 0.0, 5.0, 5.0)));
        assert!(a.intersects(Rect::new(5.0, 5.0, 1.0, 1.0)));
        assert!(!a.intersects(Rect::new(10.5, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn extend_to_contain_grows_in_every_direction() {
        let mut rect = Rect::new(0.0, 0.0, 1.0, 1.0);
        rect.extend_to_contain(Rect::new(-2.0, -3.0, 1.0, 1.0));
        rect.extend_to_contain(Rect::new(4.0, 5.0, 1.0, 1.0));
        assert_eq!(rect, Rect::new(-2.0, -3.0, 7.0, 9.0));
    }

    #[test]
    fn center_of_unit_rect() {
        let rect = Rect::new(0.0, 0.0, 2.0, 4.0);
        assert_eq!(rect.center(), Vector2::new(1.0, 2.0));
    }
}
