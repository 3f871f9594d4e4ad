/// Swipe gesture recognizer for the mobile layout.
///
/// A drag becomes a swipe candidate once its horizontal travel exceeds
/// `slop` and dominates vertical travel; on release it fires only if the
/// horizontal distance exceeds `min_distance`. Leftward = Continue,
/// rightward = Back. Anything else (taps, vertical scrolls) is ignored.

use crate::config::SwipeConfig;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SwipeDir {
    /// Finger moved left: go forward.
    Left,
    /// Finger moved right: go back.
    Right,
}

#[derive(Clone, Copy, Debug)]
struct Track {
    start_x: i32,
    start_y: i32,
    end_x: i32,
    horizontal: bool,
}

#[derive(Clone, Debug)]
pub struct SwipeTracker {
    min_distance: i32,
    slop: i32,
    track: Option<Track>,
}

impl SwipeTracker {
    pub fn new(cfg: &SwipeConfig) -> Self {
        SwipeTracker {
            min_distance: cfg.min_distance,
            slop: cfg.slop,
            track: None,
        }
    }

    pub fn begin(&mut self, x: i32, y: i32) {
        self.track = Some(Track { start_x: x, start_y: y, end_x: x, horizontal: false });
    }

    pub fn moved(&mut self, x: i32, y: i32) {
        let slop = self.slop;
        if let Some(t) = self.track.as_mut() {
            t.end_x = x;
            let dx = (x - t.start_x).abs();
            let dy = (y - t.start_y).abs();
            if dx > slop && dx > dy {
                t.horizontal = true;
            }
        }
    }

    /// Finish the gesture. `None` for taps and vertical drags.
    pub fn end(&mut self, x: i32, y: i32) -> Option<SwipeDir> {
        self.moved(x, y);
        let t = self.track.take()?;
        if !t.horizontal {
            return None;
        }
        let diff = t.start_x - t.end_x;
        if diff.abs() <= self.min_distance {
            return None;
        }
        Some(if diff > 0 { SwipeDir::Left } else { SwipeDir::Right })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> SwipeTracker {
        SwipeTracker::new(&SwipeConfig { min_distance: 50, slop: 10 })
    }

    #[test]
    fn long_left_drag_is_continue() {
        let mut s = tracker();
        s.begin(100, 10);
        s.moved(80, 12);
        assert_eq!(s.end(40, 12), Some(SwipeDir::Left));
    }

    #[test]
    fn long_right_drag_is_back() {
        let mut s = tracker();
        s.begin(10, 10);
        assert_eq!(s.end(70, 15), Some(SwipeDir::Right));
    }

    #[test]
    fn short_drag_is_ignored() {
        let mut s = tracker();
        s.begin(100, 10);
        assert_eq!(s.end(60, 10), None);
    }

    #[test]
    fn vertical_scroll_is_not_a_swipe() {
        let mut s = tracker();
        s.begin(100, 10);
        s.moved(95, 60);
        s.moved(40, 120);
        assert_eq!(s.end(40, 120), None);
    }

    #[test]
    fn tap_is_ignored() {
        let mut s = tracker();
        s.begin(5, 5);
        assert_eq!(s.end(5, 5), None);
        assert_eq!(s.end(5, 5), None, "no gesture in progress");
    }
}
