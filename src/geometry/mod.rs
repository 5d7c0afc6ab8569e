pub mod fallback;

use serde::{Deserialize, Serialize};

use crate::error::PrepError;

/// Integer pixel coordinate. PAGE XML stores points as `x,y` integer pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (i32, i32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// Axis-aligned bounding box (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl BBox {
    pub fn of(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = BBox {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in &points[1..] {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }
        Some(bbox)
    }

    pub fn width(&self) -> i64 {
        self.max_x as i64 - self.min_x as i64
    }

    pub fn height(&self) -> i64 {
        self.max_y as i64 - self.min_y as i64
    }

    /// Rectangle corners starting top-left, in positive winding order.
    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(vec![
            Point::new(self.min_x, self.min_y),
            Point::new(self.max_x, self.min_y),
            Point::new(self.max_x, self.max_y),
            Point::new(self.min_x, self.max_y),
        ])
    }
}

/// Closed polygon. The last point connects back to the first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon(Vec<Point>);

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Full-page rectangle `(0,0) (w,0) (w,h) (0,h)`.
    pub fn page(width: u32, height: u32) -> Self {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        BBox {
            min_x: 0,
            min_y: 0,
            max_x: w,
            max_y: h,
        }
        .to_polygon()
    }

    pub fn points(&self) -> &[Point] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Twice the signed shoelace area. Positive means clockwise on screen
    /// (image coordinates, y pointing down).
    pub fn signed_area2(&self) -> i64 {
        let n = self.0.len();
        if n < 3 {
            return 0;
        }
        let mut sum = 0i64;
        for i in 0..n {
            let a = self.0[i];
            let b = self.0[(i + 1) % n];
            sum += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
        }
        sum
    }

    pub fn area(&self) -> f64 {
        self.signed_area2().unsigned_abs() as f64 / 2.0
    }

    pub fn is_degenerate(&self) -> bool {
        self.signed_area2() == 0
    }

    /// Reverse the point order if needed so that the signed area is positive.
    pub fn normalize_winding(&mut self) {
        if self.signed_area2() < 0 {
            self.0.reverse();
        }
    }

    /// Closed containment: points on an edge count as inside.
    pub fn contains(&self, p: Point) -> bool {
        let n = self.0.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        for i in 0..n {
            let a = self.0[i];
            let b = self.0[(i + 1) % n];
            if on_segment(a, b, p) {
                return true;
            }
            // even-odd ray cast towards +x
            if (a.y > p.y) != (b.y > p.y) {
                let lhs = (p.x as i64 - a.x as i64) * (b.y as i64 - a.y as i64);
                let rhs = (b.x as i64 - a.x as i64) * (p.y as i64 - a.y as i64);
                let left_of_edge = if b.y > a.y { lhs < rhs } else { lhs > rhs };
                if left_of_edge {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// True when no two non-adjacent edges intersect.
    pub fn is_simple(&self) -> bool {
        let n = self.0.len();
        if n < 3 {
            return false;
        }
        for i in 0..n {
            let (a1, a2) = (self.0[i], self.0[(i + 1) % n]);
            for j in (i + 1)..n {
                if j == i || (j + 1) % n == i || (i + 1) % n == j {
                    continue;
                }
                let (b1, b2) = (self.0[j], self.0[(j + 1) % n]);
                if segments_intersect(a1, a2, b1, b2) {
                    return false;
                }
            }
        }
        true
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::of(&self.0)
    }

    /// Intersection with the page rectangle `[0, width] x [0, height]`
    /// (Sutherland-Hodgman). Empty when the polygon lies outside the page.
    pub fn clipped_to(&self, width: u32, height: u32) -> Polygon {
        let w = f64::from(i32::try_from(width).unwrap_or(i32::MAX));
        let h = f64::from(i32::try_from(height).unwrap_or(i32::MAX));
        let mut pts: Vec<(f64, f64)> = self.0.iter().map(|p| (p.x as f64, p.y as f64)).collect();

        for edge in [Edge::MinX(0.0), Edge::MaxX(w), Edge::MinY(0.0), Edge::MaxY(h)] {
            let Some(&last) = pts.last() else { break };
            let mut out = Vec::with_capacity(pts.len() + 4);
            let mut prev = last;
            for &cur in &pts {
                match (edge.inside(prev), edge.inside(cur)) {
                    (true, true) => out.push(cur),
                    (true, false) => out.push(edge.intersect(prev, cur)),
                    (false, true) => {
                        out.push(edge.intersect(prev, cur));
                        out.push(cur);
                    }
                    (false, false) => {}
                }
                prev = cur;
            }
            pts = out;
        }

        let mut points: Vec<Point> = Vec::with_capacity(pts.len());
        for (x, y) in pts {
            let p = Point::new(x.round() as i32, y.round() as i32);
            if points.last() != Some(&p) {
                points.push(p);
            }
        }
        while points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Polygon(points)
    }
}

/// One side of the clip rectangle.
#[derive(Clone, Copy)]
enum Edge {
    MinX(f64),
    MaxX(f64),
    MinY(f64),
    MaxY(f64),
}

impl Edge {
    fn inside(self, (x, y): (f64, f64)) -> bool {
        match self {
            Edge::MinX(v) => x >= v,
            Edge::MaxX(v) => x <= v,
            Edge::MinY(v) => y >= v,
            Edge::MaxY(v) => y <= v,
        }
    }

    // Only called for points on opposite sides, so the divisor is non-zero.
    fn intersect(self, (ax, ay): (f64, f64), (bx, by): (f64, f64)) -> (f64, f64) {
        match self {
            Edge::MinX(v) | Edge::MaxX(v) => (v, ay + (v - ax) / (bx - ax) * (by - ay)),
            Edge::MinY(v) | Edge::MaxY(v) => (ax + (v - ay) / (by - ay) * (bx - ax), v),
        }
    }
}

/// Clamp points into `[0, width] x [0, height]`.
pub fn clip_points(points: &mut [Point], width: u32, height: u32) {
    let w = i32::try_from(width).unwrap_or(i32::MAX);
    let h = i32::try_from(height).unwrap_or(i32::MAX);
    for p in points {
        p.x = p.x.clamp(0, w);
        p.y = p.y.clamp(0, h);
    }
}

fn cross(o: Point, a: Point, b: Point) -> i64 {
    (a.x as i64 - o.x as i64) * (b.y as i64 - o.y as i64)
        - (a.y as i64 - o.y as i64) * (b.x as i64 - o.x as i64)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    cross(a, b, p) == 0
        && p.x >= a.x.min(b.x)
        && p.x <= a.x.max(b.x)
        && p.y >= a.y.min(b.y)
        && p.y <= a.y.max(b.y)
}

fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = cross(b1, b2, a1);
    let d2 = cross(b1, b2, a2);
    let d3 = cross(a1, a2, b1);
    let d4 = cross(a1, a2, b2);
    if ((d1 > 0 && d2 < 0) || (d1 < 0 && d2 > 0)) && ((d3 > 0 && d4 < 0) || (d3 < 0 && d4 > 0)) {
        return true;
    }
    (d1 == 0 && on_segment(b1, b2, a1))
        || (d2 == 0 && on_segment(b1, b2, a2))
        || (d3 == 0 && on_segment(a1, a2, b1))
        || (d4 == 0 && on_segment(a1, a2, b2))
}

/// Format points as a PAGE `points` attribute: `x1,y1 x2,y2 ...`.
pub fn points_to_string(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a PAGE `points` attribute. Fractional coordinates are rounded.
pub fn parse_points(s: &str) -> crate::error::Result<Vec<Point>> {
    s.split_whitespace()
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| PrepError::xml(format!("invalid point '{pair}'")))?;
            Ok(Point::new(parse_coord(x, pair)?, parse_coord(y, pair)?))
        })
        .collect()
}

fn parse_coord(raw: &str, pair: &str) -> crate::error::Result<i32> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i32>() {
        return Ok(v);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.round() as i32)
        .ok_or_else(|| PrepError::xml(format!("invalid coordinate in point '{pair}'")))
}
