// Default polygons for baselines the polygonizer could not enclose.

use serde::Deserialize;

use crate::error::PrepError;
use crate::geometry::{BBox, Point, Polygon};

/// Distance in pixels the fixed-height box extends past both baseline ends.
const END_PADDING: f64 = 1.0;

/// Interior vertices are pushed out along the bisector by at most this factor.
const MITER_LIMIT: f64 = 2.0;

/// Fallback polygon policy.
///
/// YAML: `fallback: { height: 20 }` or
/// `fallback: { left: 5, top: 15, right: 5, bottom: 5 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FallbackPolicy {
    /// Box of `height` pixels centred on the baseline, following its direction.
    FixedHeight { height: u32 },
    /// Bounding box of the baseline grown by per-side offsets.
    Offsets {
        #[serde(default)]
        left: u32,
        #[serde(default)]
        top: u32,
        #[serde(default)]
        right: u32,
        #[serde(default)]
        bottom: u32,
    },
}

impl FallbackPolicy {
    /// Reject parameter combinations that can never produce an area.
    pub fn validate(&self) -> crate::error::Result<()> {
        match *self {
            FallbackPolicy::FixedHeight { height } if height == 0 => Err(PrepError::config(
                "fallback height must be greater than zero",
            )),
            FallbackPolicy::Offsets {
                left,
                top,
                right,
                bottom,
            } if left == 0 && top == 0 && right == 0 && bottom == 0 => Err(PrepError::config(
                "fallback offsets must not all be zero",
            )),
            _ => Ok(()),
        }
    }
}

/// Build a fallback polygon around `baseline` according to `policy`.
///
/// The result has positive signed area and contains every baseline point.
/// Fails with a geometry error when the baseline has fewer than two distinct
/// points or the configured offsets leave no area.
pub fn synthesize(baseline: &[Point], policy: &FallbackPolicy) -> crate::error::Result<Polygon> {
    let points = dedup_consecutive(baseline);
    if distinct_count(&points) < 2 {
        return Err(PrepError::geometry(format!(
            "baseline needs at least two distinct points, got {}",
            distinct_count(&points)
        )));
    }

    let polygon = match *policy {
        FallbackPolicy::FixedHeight { height } => fixed_height_box(&points, height),
        FallbackPolicy::Offsets {
            left,
            top,
            right,
            bottom,
        } => offset_box(&points, left, top, right, bottom)?,
    };

    if polygon.is_degenerate() {
        return Err(PrepError::geometry("fallback polygon has zero area"));
    }
    Ok(polygon)
}

fn fixed_height_box(points: &[Point], height: u32) -> Polygon {
    let half = height as f64 / 2.0;
    if let Some(polygon) = offset_polyline(points, half)
        && is_valid_enclosure(&polygon, points)
    {
        return polygon;
    }
    // Sharp turns can fold the offset polygon onto itself.
    padded_bbox(points, half.ceil() as i32)
}

fn offset_polyline(points: &[Point], half: f64) -> Option<Polygon> {
    let pts: Vec<(f64, f64)> = points.iter().map(|p| (p.x as f64, p.y as f64)).collect();
    let n = pts.len();

    // Unit direction per segment
    let mut dirs = Vec::with_capacity(n - 1);
    for w in pts.windows(2) {
        let (dx, dy) = (w[1].0 - w[0].0, w[1].1 - w[0].1);
        let len = (dx * dx + dy * dy).sqrt();
        if len == 0.0 {
            return None;
        }
        dirs.push((dx / len, dy / len));
    }
    let normal = |d: (f64, f64)| (-d.1, d.0);

    let mut upper = Vec::with_capacity(n);
    let mut lower = Vec::with_capacity(n);
    for i in 0..n {
        let (mut px, mut py) = pts[i];
        let (nx, ny, scale) = if i == 0 {
            let (nx, ny) = normal(dirs[0]);
            px -= dirs[0].0 * END_PADDING;
            py -= dirs[0].1 * END_PADDING;
            (nx, ny, 1.0)
        } else if i == n - 1 {
            let d = dirs[n - 2];
            let (nx, ny) = normal(d);
            px += d.0 * END_PADDING;
            py += d.1 * END_PADDING;
            (nx, ny, 1.0)
        } else {
            let (ax, ay) = normal(dirs[i - 1]);
            let (bx, by) = normal(dirs[i]);
            let (sx, sy) = (ax + bx, ay + by);
            let len = (sx * sx + sy * sy).sqrt();
            if len < 1e-9 {
                return None;
            }
            let (nx, ny) = (sx / len, sy / len);
            let cos = nx * ax + ny * ay;
            (nx, ny, (1.0 / cos.max(1.0 / MITER_LIMIT)).min(MITER_LIMIT))
        };
        let off = half * scale;
        upper.push(round_point(px - nx * off, py - ny * off));
        lower.push(round_point(px + nx * off, py + ny * off));
    }

    lower.reverse();
    upper.extend(lower);
    let mut polygon = Polygon::new(upper);
    polygon.normalize_winding();
    Some(polygon)
}

fn offset_box(
    points: &[Point],
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
) -> crate::error::Result<Polygon> {
    let bbox = BBox::of(points).ok_or_else(|| PrepError::geometry("empty baseline"))?;
    let grown = BBox {
        min_x: bbox.min_x.saturating_sub(to_i32(left)),
        min_y: bbox.min_y.saturating_sub(to_i32(top)),
        max_x: bbox.max_x.saturating_add(to_i32(right)),
        max_y: bbox.max_y.saturating_add(to_i32(bottom)),
    };
    if grown.width() == 0 || grown.height() == 0 {
        return Err(PrepError::geometry(format!(
            "offsets (left={left}, top={top}, right={right}, bottom={bottom}) give a zero-area box \
             for baseline spanning {}x{} pixels",
            bbox.width(),
            bbox.height()
        )));
    }
    Ok(grown.to_polygon())
}

pub(crate) fn padded_bbox(points: &[Point], pad: i32) -> Polygon {
    let pad = pad.max(1);
    // Non-empty and checked by the caller.
    let bbox = BBox::of(points).unwrap_or(BBox {
        min_x: 0,
        min_y: 0,
        max_x: 0,
        max_y: 0,
    });
    BBox {
        min_x: bbox.min_x.saturating_sub(pad),
        min_y: bbox.min_y.saturating_sub(pad),
        max_x: bbox.max_x.saturating_add(pad),
        max_y: bbox.max_y.saturating_add(pad),
    }
    .to_polygon()
}

fn is_valid_enclosure(polygon: &Polygon, baseline: &[Point]) -> bool {
    polygon.signed_area2() > 0
        && polygon.is_simple()
        && baseline.iter().all(|p| polygon.contains(*p))
}

fn dedup_consecutive(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if out.last() != Some(p) {
            out.push(*p);
        }
    }
    out
}

fn distinct_count(points: &[Point]) -> usize {
    let mut seen: Vec<Point> = Vec::new();
    for p in points {
        if !seen.contains(p) {
            seen.push(*p);
        }
    }
    seen.len()
}

fn round_point(x: f64, y: f64) -> Point {
    Point::new(x.round() as i32, y.round() as i32)
}

fn to_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_polyline_straight_line() {
        let pts = [Point::new(0, 0), Point::new(10, 0)];
        let poly = offset_polyline(&pts, 10.0).unwrap();
        assert_eq!(
            poly.points(),
            &[
                Point::new(-1, -10),
                Point::new(11, -10),
                Point::new(11, 10),
                Point::new(-1, 10)
            ]
        );
    }

    #[test]
    fn test_hairpin_falls_back_to_bbox() {
        // Going out and straight back folds the offset polygon.
        let pts = [Point::new(0, 0), Point::new(50, 0), Point::new(0, 2)];
        let poly = synthesize(&pts, &FallbackPolicy::FixedHeight { height: 10 }).unwrap();
        assert!(poly.signed_area2() > 0);
        for p in pts {
            assert!(poly.contains(p));
        }
    }

    #[test]
    fn test_distinct_count_ignores_repeats() {
        let pts = [Point::new(1, 1), Point::new(2, 2), Point::new(1, 1)];
        assert_eq!(distinct_count(&pts), 2);
    }
}
