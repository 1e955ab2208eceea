use std::time::Instant;

use serde::{Deserialize, Serialize};

pub const SWIPE_THRESHOLD_PX: f32 = 100.0;
pub const SWIPE_VELOCITY_THRESHOLD_PX_PER_SEC: f32 = 100.0;

// rough size of a terminal cell
const CELL_WIDTH_PX: f32 = 8.0;
const CELL_HEIGHT_PX: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwipeDirection {
    Left,
    Right,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[cfg(test)]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn from_cell(column: u16, row: u16) -> Self {
        Self {
            x: column as f32 * CELL_WIDTH_PX,
            y: row as f32 * CELL_HEIGHT_PX,
        }
    }
}

/// A finished drag: where it started, where it ended and how fast it was going.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fling {
    pub start: Point,
    pub end: Point,
    pub velocity_x: f32,
    pub velocity_y: f32,
}

/// Turns a fling into a horizontal swipe, or nothing if it was too short, too slow or too vertical.
pub fn recognize(fling: &Fling) -> Option<SwipeDirection> {
    let dx = fling.end.x - fling.start.x;
    let dy = fling.end.y - fling.start.y;

    if dx.abs() <= dy.abs() {
        return None;
    }
    if dx.abs() > SWIPE_THRESHOLD_PX && fling.velocity_x.abs() > SWIPE_VELOCITY_THRESHOLD_PX_PER_SEC
    {
        if dx > 0.0 {
            Some(SwipeDirection::Right)
        } else {
            Some(SwipeDirection::Left)
        }
    } else {
        None
    }
}

/// Follows a left-button drag across terminal cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct DragTracker {
    pressed: Option<(Point, Instant)>,
}

impl DragTracker {
    pub fn press(&mut self, column: u16, row: u16, at: Instant) {
        self.pressed = Some((Point::from_cell(column, row), at));
    }

    pub fn release(&mut self, column: u16, row: u16, at: Instant) -> Option<Fling> {
        let (start, pressed_at) = self.pressed.take()?;
        let end = Point::from_cell(column, row);
        // a release in the same instant counts as infinitely fast
        let secs = at
            .saturating_duration_since(pressed_at)
            .as_secs_f32()
            .max(f32::EPSILON);

        Some(Fling {
            start,
            end,
            velocity_x: (end.x - start.x) / secs,
            velocity_y: (end.y - start.y) / secs,
        })
    }

    pub fn cancel(&mut self) {
        self.pressed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fling(dx: f32, dy: f32, vx: f32) -> Fling {
        Fling {
            start: Point::new(200.0, 200.0),
            end: Point::new(200.0 + dx, 200.0 + dy),
            velocity_x: vx,
            velocity_y: 0.0,
        }
    }

    #[test]
    fn horizontal_swipes_are_recognized() {
        assert_eq!(recognize(&fling(150.0, 10.0, 500.0)), Some(SwipeDirection::Right));
        assert_eq!(recognize(&fling(-150.0, -10.0, -500.0)), Some(SwipeDirection::Left));
    }

    #[test]
    fn thresholds_are_strict() {
        assert_eq!(recognize(&fling(100.0, 0.0, 500.0)), None);
        assert_eq!(recognize(&fling(101.0, 0.0, 500.0)), Some(SwipeDirection::Right));
        assert_eq!(recognize(&fling(150.0, 0.0, 100.0)), None);
        assert_eq!(recognize(&fling(150.0, 0.0, -100.5)), Some(SwipeDirection::Right));
    }

    #[test]
    fn vertical_drags_are_rejected() {
        assert_eq!(recognize(&fling(150.0, 150.0, 900.0)), None);
        assert_eq!(recognize(&fling(120.0, -300.0, 900.0)), None);
    }

    #[test]
    fn drag_tracker_builds_fling() {
        let t0 = Instant::now();
        let mut drag = DragTracker::default();
        drag.press(10, 5, t0);

        let f = drag
            .release(30, 5, t0 + Duration::from_millis(200))
            .expect("pressed before");
        assert_eq!(f.start, Point::new(80.0, 80.0));
        assert_eq!(f.end, Point::new(240.0, 80.0));
        assert!((f.velocity_x - 800.0).abs() < 1.0);
        assert_eq!(recognize(&f), Some(SwipeDirection::Right));

        // second release without a press
        assert!(drag.release(0, 0, t0).is_none());
    }

    #[test]
    fn short_drag_is_not_a_swipe() {
        let t0 = Instant::now();
        let mut drag = DragTracker::default();
        drag.press(10, 5, t0);
        let f = drag.release(20, 5, t0 + Duration::from_millis(100)).unwrap();
        assert_eq!(recognize(&f), None);
    }
}
