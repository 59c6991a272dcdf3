//! Cartesian to wire-length conversion for two top-corner anchors.
//!
//! Units are millimeters for positions and lengths and whole motor steps for
//! step counts. Rounding from lengths to steps is half away from zero.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::PlotterConfig;

/// A point on the board, in millimeters. `y` grows downward from the anchors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Distance from each anchor to a point, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WireLengths {
    pub left: f64,
    pub right: f64,
}

/// A signed step count per actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StepCounts {
    pub left: i64,
    pub right: i64,
}

impl StepCounts {
    pub const ZERO: StepCounts = StepCounts { left: 0, right: 0 };

    pub fn is_zero(&self) -> bool {
        self.left == 0 && self.right == 0
    }

    /// Larger of the two absolute counts.
    pub fn max_abs(&self) -> u64 {
        self.left.unsigned_abs().max(self.right.unsigned_abs())
    }
}

impl std::ops::Sub for StepCounts {
    type Output = StepCounts;

    fn sub(self, rhs: StepCounts) -> StepCounts {
        StepCounts {
            left: self.left - rhs.left,
            right: self.right - rhs.right,
        }
    }
}

/// Fixed two-anchor geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    width: f64,
    height: f64,
    steps_per_mm: f64,
}

impl Kinematics {
    pub fn new(width: f64, height: f64, steps_per_mm: f64) -> Self {
        Self {
            width,
            height,
            steps_per_mm,
        }
    }

    pub fn from_config(config: &PlotterConfig) -> Self {
        Self::new(
            config.board.width_mm,
            config.board.height_mm,
            config.steps_per_mm(),
        )
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn steps_per_mm(&self) -> f64 {
        self.steps_per_mm
    }

    /// Left and right anchor points.
    pub fn anchors(&self) -> (Point, Point) {
        (Point::new(0.0, 0.0), Point::new(self.width, 0.0))
    }

    /// Board center, the home position.
    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn wire_lengths(&self, x: f64, y: f64) -> WireLengths {
        WireLengths {
            left: x.hypot(y),
            right: (self.width - x).hypot(y),
        }
    }

    /// Convert lengths to whole steps, rounding half away from zero.
    pub fn steps_from_lengths(&self, lengths: WireLengths) -> StepCounts {
        StepCounts {
            left: (lengths.left * self.steps_per_mm).round() as i64,
            right: (lengths.right * self.steps_per_mm).round() as i64,
        }
    }

    pub fn steps_from_position(&self, x: f64, y: f64) -> StepCounts {
        self.steps_from_lengths(self.wire_lengths(x, y))
    }

    /// Steps each actuator must travel from `current` to `target`.
    ///
    /// Positive means the wire gets shorter (reel in).
    pub fn delta_steps(&self, current: Point, target: Point) -> StepCounts {
        self.steps_from_position(current.x, current.y)
            - self.steps_from_position(target.x, target.y)
    }

    /// Closed-interval bounds check; NaN coordinates are out of bounds.
    pub fn is_in_bounds(&self, x: f64, y: f64) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y)
    }

    /// Calibration path: the board rectangle inset by `margin`, then an X
    /// whose strokes cross at the center, then back to center.
    pub fn test_pattern(&self, margin: f64) -> Vec<Point> {
        let (left, top) = (margin, margin);
        let (right, bottom) = (self.width - margin, self.height - margin);
        vec![
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
            Point::new(left, top),
            Point::new(right, bottom),
            self.center(),
            Point::new(right, top),
            Point::new(left, bottom),
            self.center(),
        ]
    }
}

/// Evenly spaced points from `from` to `to`, both included.
pub fn interpolate_line(from: Point, to: Point, segments: u32) -> Vec<Point> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| {
            let t = f64::from(i) / f64::from(segments);
            Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> Kinematics {
        Kinematics::new(1200.0, 900.0, 2.0)
    }

    #[test]
    fn center_wire_lengths() {
        let lengths = board().wire_lengths(600.0, 450.0);
        assert!((lengths.left - 750.0).abs() < 1e-9);
        assert!((lengths.right - 750.0).abs() < 1e-9);
        assert_eq!(board().steps_from_lengths(lengths), StepCounts { left: 1500, right: 1500 });
    }

    #[test]
    fn delta_from_center_to_upper_left() {
        let k = board();
        let target = k.steps_from_position(100.0, 100.0);
        assert_eq!(target, StepCounts { left: 283, right: 2209 });

        let delta = k.delta_steps(k.center(), Point::new(100.0, 100.0));
        assert_eq!(delta, StepCounts { left: 1217, right: -709 });
    }

    #[test]
    fn zero_travel_is_zero_delta() {
        let k = board();
        let p = Point::new(321.5, 87.25);
        assert!(k.delta_steps(p, p).is_zero());
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        let k = Kinematics::new(100.0, 100.0, 1.0);
        let counts = k.steps_from_lengths(WireLengths {
            left: 2.5,
            right: 3.5,
        });
        assert_eq!(counts, StepCounts { left: 3, right: 4 });

        let counts = k.steps_from_lengths(WireLengths {
            left: 2.4999,
            right: -2.5,
        });
        assert_eq!(counts, StepCounts { left: 2, right: -3 });
    }

    #[test]
    fn step_counts_are_monotonic_in_length() {
        let k = Kinematics::new(1200.0, 900.0, 50.93);
        let mut previous = i64::MIN;
        for i in 0..2000 {
            let length = f64::from(i) * 0.37;
            let steps = k
                .steps_from_lengths(WireLengths {
                    left: length,
                    right: length,
                })
                .left;
            assert!(steps >= previous);
            previous = steps;
        }
    }

    #[test]
    fn bounds_are_closed() {
        let k = board();
        assert!(k.is_in_bounds(0.0, 0.0));
        assert!(k.is_in_bounds(1200.0, 900.0));
        assert!(k.is_in_bounds(600.0, 450.0));
        assert!(!k.is_in_bounds(-0.001, 10.0));
        assert!(!k.is_in_bounds(10.0, 900.001));
        assert!(!k.is_in_bounds(1200.5, 10.0));
        assert!(!k.is_in_bounds(2000.0, 2000.0));
    }

    #[test]
    fn nan_and_infinity_are_out_of_bounds() {
        let k = board();
        assert!(!k.is_in_bounds(f64::NAN, 10.0));
        assert!(!k.is_in_bounds(10.0, f64::NAN));
        assert!(!k.is_in_bounds(f64::INFINITY, 10.0));
    }

    #[test]
    fn anchors_and_center() {
        let (left, right) = board().anchors();
        assert_eq!(left, Point::new(0.0, 0.0));
        assert_eq!(right, Point::new(1200.0, 0.0));
        assert_eq!(board().center(), Point::new(600.0, 450.0));
    }

    #[test]
    fn test_pattern_stays_on_board() {
        let k = board();
        let pattern = k.test_pattern(50.0);
        assert_eq!(pattern.len(), 10);
        assert_eq!(pattern[0], Point::new(50.0, 50.0));
        assert_eq!(pattern[2], Point::new(1150.0, 850.0));
        assert_eq!(pattern[4], pattern[0]);
        assert_eq!(pattern.last().copied(), Some(k.center()));
        assert!(pattern.iter().all(|p| k.is_in_bounds(p.x, p.y)));
    }

    #[test]
    fn test_pattern_diagonals_cross_at_center() {
        let k = board();
        let pattern = k.test_pattern(50.0);
        let diagonal = &pattern[4..10];
        assert_eq!(
            diagonal,
            &[
                Point::new(50.0, 50.0),
                Point::new(1150.0, 850.0),
                k.center(),
                Point::new(1150.0, 50.0),
                Point::new(50.0, 850.0),
                k.center(),
            ]
        );
    }

    #[test]
    fn line_includes_both_endpoints() {
        let points = interpolate_line(Point::new(0.0, 0.0), Point::new(10.0, 20.0), 4);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], Point::new(0.0, 0.0));
        assert_eq!(points[2], Point::new(5.0, 10.0));
        assert_eq!(points[4], Point::new(10.0, 20.0));
    }

    #[test]
    fn zero_segments_treated_as_one() {
        let points = interpolate_line(Point::new(1.0, 1.0), Point::new(2.0, 2.0), 0);
        assert_eq!(points, vec![Point::new(1.0, 1.0), Point::new(2.0, 2.0)]);
    }
}
