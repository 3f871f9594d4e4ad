//! Connector geometry: pure functions from measured rects to elbow paths.
//!
//! Units are terminal cells. The elbow has three segments:
//!   ```text
//!        elbow_x            source
//!          ┌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌●
//!          ┆
//!          ┆  label
//!          ┆
//!          └╌╌▶[ target ]
//!   ```
//! out (horizontal from the source), across (vertical to the target's
//! vertical center), in (horizontal into the target's left edge, ending
//! in an arrowhead). `overshoot` is how far left of the target the
//! vertical segment runs.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2, self.y + self.h / 2)
    }

    pub fn contains(&self, p: Point) -> bool {
        !self.is_empty() && p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }
}

/// A routed connector from a reform trigger to its downstream target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectorPath {
    pub pathway: usize,
    /// start, first bend, second bend, end (end = arrowhead cell).
    pub points: [Point; 4],
    pub label: Point,
}

impl ConnectorPath {
    pub fn start(&self) -> Point {
        self.points[0]
    }

    pub fn end(&self) -> Point {
        self.points[3]
    }

    /// The three segments: out, across, in.
    pub fn segments(&self) -> [(Point, Point); 3] {
        [
            (self.points[0], self.points[1]),
            (self.points[1], self.points[2]),
            (self.points[2], self.points[3]),
        ]
    }
}

/// Route an elbow from `source` to `target`.
///
/// Returns `None` when the target has not been laid out (zero size).
pub fn elbow(pathway: usize, source: Rect, target: Rect, overshoot: i32) -> Option<ConnectorPath> {
    if target.is_empty() || source.is_empty() {
        return None;
    }
    let start = Point::new(source.x, source.y + source.h / 2);
    let end_y = target.y + target.h / 2;
    let elbow_x = (target.x - overshoot.max(1)).min(start.x);
    let end = Point::new(target.x - 1, end_y);
    let bend_a = Point::new(elbow_x, start.y);
    let bend_b = Point::new(elbow_x, end_y);
    let label = Point::new(elbow_x, (bend_a.y + bend_b.y) / 2);
    Some(ConnectorPath {
        pathway,
        points: [start, bend_a, bend_b, end],
        label,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn elbow_has_out_across_in_topology() {
        let trigger = Rect::new(60, 8, 20, 1);
        let next_start = Rect::new(6, 12, 18, 5);
        let path = elbow(0, trigger, next_start, 2).unwrap();

        let [out, across, inward] = path.segments();
        assert_eq!(out.0.y, out.1.y, "out segment is horizontal");
        assert_eq!(across.0.x, across.1.x, "across segment is vertical");
        assert_eq!(inward.0.y, inward.1.y, "in segment is horizontal");

        assert_eq!(path.start(), Point::new(60, 8));
        assert_eq!(across.1.y, next_start.center().y);
        assert_eq!(path.end(), Point::new(5, 14));
        assert!(across.0.x < next_start.x, "elbow clears the target's left edge");
    }

    #[test]
    fn label_sits_on_the_vertical_segment() {
        let path = elbow(1, Rect::new(50, 10, 10, 1), Rect::new(10, 30, 20, 4), 3).unwrap();
        assert_eq!(path.label.x, path.points[1].x);
        assert_eq!(path.label.y, 21);
    }

    #[test]
    fn unmeasured_target_yields_no_path() {
        assert!(elbow(0, Rect::new(1, 1, 4, 1), Rect::default(), 2).is_none());
        assert!(elbow(0, Rect::new(1, 1, 4, 1), Rect::new(5, 5, 0, 3), 2).is_none());
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(2, 2, 3, 2);
        assert!(r.contains(Point::new(2, 2)));
        assert!(r.contains(Point::new(4, 3)));
        assert!(!r.contains(Point::new(5, 3)));
        assert!(!r.contains(Point::new(4, 4)));
    }
}
