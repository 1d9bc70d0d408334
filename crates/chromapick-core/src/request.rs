//! Pick requests and window-to-framebuffer coordinate conversion.

use crate::error::{PickError, Result};
use crate::options::OutOfBoundsPolicy;

/// A cursor position to pick at, in window pixels with the origin at the
/// top-left corner (as delivered by the input system).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickRequest {
    pub x: i64,
    pub y: i64,
}

impl PickRequest {
    /// Creates a request from integer window coordinates.
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Creates a request from a floating-point cursor position.
    ///
    /// Coordinates are truncated towards negative infinity so that any
    /// position left of or above the window maps to a negative pixel.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_cursor(x: f64, y: f64) -> Self {
        Self {
            x: x.floor() as i64,
            y: y.floor() as i64,
        }
    }

    /// Converts to framebuffer coordinates (origin at the bottom-left).
    ///
    /// The sampled row is `height - 1 - y`. Under [`OutOfBoundsPolicy::Reject`]
    /// a coordinate outside the framebuffer yields
    /// [`PickError::OutOfRangeCoordinate`]; under [`OutOfBoundsPolicy::Clamp`]
    /// it is moved to the nearest edge pixel. An empty framebuffer is always
    /// rejected.
    pub fn to_framebuffer(
        self,
        width: u32,
        height: u32,
        policy: OutOfBoundsPolicy,
    ) -> Result<(u32, u32)> {
        let reject = || PickError::OutOfRangeCoordinate {
            x: self.x,
            y: self.y,
            width,
            height,
        };
        if width == 0 || height == 0 {
            return Err(reject());
        }

        let max_x = i64::from(width) - 1;
        let max_y = i64::from(height) - 1;
        let inside = (0..=max_x).contains(&self.x) && (0..=max_y).contains(&self.y);

        let (x, y) = match (inside, policy) {
            (true, _) => (self.x, self.y),
            (false, OutOfBoundsPolicy::Clamp) => (self.x.clamp(0, max_x), self.y.clamp(0, max_y)),
            (false, OutOfBoundsPolicy::Reject) => return Err(reject()),
        };

        let fb_x = u32::try_from(x).map_err(|_| reject())?;
        let fb_y = u32::try_from(max_y - y).map_err(|_| reject())?;
        Ok((fb_x, fb_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_flip() {
        let top = PickRequest::new(0, 0)
            .to_framebuffer(1200, 800, OutOfBoundsPolicy::Reject)
            .unwrap();
        assert_eq!(top, (0, 799));

        let bottom = PickRequest::new(1199, 799)
            .to_framebuffer(1200, 800, OutOfBoundsPolicy::Reject)
            .unwrap();
        assert_eq!(bottom, (1199, 0));

        let mid = PickRequest::new(100, 100)
            .to_framebuffer(1200, 800, OutOfBoundsPolicy::Reject)
            .unwrap();
        assert_eq!(mid, (100, 699));
    }

    #[test]
    fn test_reject_out_of_bounds() {
        for request in [
            PickRequest::new(-1, 0),
            PickRequest::new(0, -1),
            PickRequest::new(1200, 0),
            PickRequest::new(0, 800),
        ] {
            let result = request.to_framebuffer(1200, 800, OutOfBoundsPolicy::Reject);
            assert!(
                matches!(result, Err(PickError::OutOfRangeCoordinate { .. })),
                "{request:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_clamp_out_of_bounds() {
        let clamped = PickRequest::new(-5, 900)
            .to_framebuffer(1200, 800, OutOfBoundsPolicy::Clamp)
            .unwrap();
        assert_eq!(clamped, (0, 0));

        let clamped = PickRequest::new(5000, -3)
            .to_framebuffer(1200, 800, OutOfBoundsPolicy::Clamp)
            .unwrap();
        assert_eq!(clamped, (1199, 799));
    }

    #[test]
    fn test_empty_framebuffer_rejected_even_when_clamping() {
        let result = PickRequest::new(0, 0).to_framebuffer(0, 0, OutOfBoundsPolicy::Clamp);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_cursor_floors() {
        assert_eq!(PickRequest::from_cursor(10.7, 3.2), PickRequest::new(10, 3));
        assert_eq!(PickRequest::from_cursor(-0.5, 0.0), PickRequest::new(-1, 0));
    }
}
