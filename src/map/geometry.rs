use crate::braille::BrailleCanvas;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a small cross marker
pub fn draw_marker(canvas: &mut BrailleCanvas, x: i32, y: i32, size: i32) {
    for i in -size..=size {
        canvas.set_pixel_signed(x + i, y);
        canvas.set_pixel_signed(x, y + i);
    }
}

/// Draw a filled circle
pub fn draw_circle(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                canvas.set_pixel_signed(cx + dx, cy + dy);
            }
        }
    }
}

/// Clip a lon/lat segment to a rectangle (Liang-Barsky).
/// Returns the visible part, or `None` when the segment lies outside.
pub fn clip_segment(
    (x0, y0): (f64, f64),
    (x1, y1): (f64, f64),
    (min_x, min_y, max_x, max_y): (f64, f64, f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let dx = x1 - x0;
    let dy = y1 - y0;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    for (p, q) in [
        (-dx, x0 - min_x),
        (dx, max_x - x0),
        (-dy, y0 - min_y),
        (dy, max_y - y0),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    Some(((x0 + t0 * dx, y0 + t0 * dy), (x0 + t1 * dx, y0 + t1 * dy)))
}

/// Bounding box of a polyline as (min_lon, min_lat, max_lon, max_lat)
pub fn line_bbox(line: &[(f64, f64)]) -> Option<(f64, f64, f64, f64)> {
    let &(x, y) = line.first()?;
    Some(line.iter().fold((x, y, x, y), |(a, b, c, d), &(x, y)| {
        (a.min(x), b.min(y), c.max(x), d.max(y))
    }))
}

/// Even-odd point-in-polygon test against a single ring
pub fn point_in_ring(x: f64, y: f64, ring: &[(f64, f64)]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECT: (f64, f64, f64, f64) = (-98.0, 28.0, -92.0, 32.0);

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, 0, 0, 9, 0);
        assert_eq!(canvas.dot_count(), 10);
    }

    #[test]
    fn test_vertical_line() {
        let mut canvas = BrailleCanvas::new(1, 2);
        draw_line(&mut canvas, 0, 7, 0, 0);
        assert_eq!(canvas.dot_count(), 8);
    }

    #[test]
    fn test_marker_and_circle() {
        let mut canvas = BrailleCanvas::new(4, 2);
        draw_marker(&mut canvas, 3, 3, 1);
        assert_eq!(canvas.dot_count(), 5);

        let mut canvas = BrailleCanvas::new(4, 2);
        draw_circle(&mut canvas, 3, 3, 1);
        assert_eq!(canvas.dot_count(), 5);
    }

    #[test]
    fn test_clip_inside_untouched() {
        let seg = clip_segment((-97.0, 29.0), (-93.0, 31.0), RECT);
        assert_eq!(seg, Some(((-97.0, 29.0), (-93.0, 31.0))));
    }

    #[test]
    fn test_clip_crossing_edge() {
        let ((a, b), (c, d)) = clip_segment((-100.0, 30.0), (-95.0, 30.0), RECT).unwrap();
        assert_eq!((a, b), (-98.0, 30.0));
        assert_eq!((c, d), (-95.0, 30.0));

        let (_, (_, top)) = clip_segment((-95.0, 30.0), (-95.0, 40.0), RECT).unwrap();
        assert_eq!(top, 32.0);
    }

    #[test]
    fn test_clip_outside() {
        assert_eq!(clip_segment((-100.0, 25.0), (-99.0, 27.0), RECT), None);
        assert_eq!(clip_segment((-99.0, 35.0), (-91.0, 35.0), RECT), None);
        // Passes the north-west corner without entering
        assert_eq!(clip_segment((-99.0, 31.5), (-97.5, 33.0), RECT), None);
    }

    #[test]
    fn test_bbox() {
        let line = vec![(-95.0, 29.0), (-96.5, 30.5), (-94.0, 29.5)];
        assert_eq!(line_bbox(&line), Some((-96.5, 29.0, -94.0, 30.5)));
        assert_eq!(line_bbox(&[]), None);
    }

    #[test]
    fn test_point_in_ring() {
        let square = vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)];
        assert!(point_in_ring(2.0, 2.0, &square));
        assert!(!point_in_ring(5.0, 2.0, &square));
        assert!(!point_in_ring(2.0, -1.0, &square));

        // Concave "U": the notch is outside
        let u = vec![
            (0.0, 0.0), (3.0, 0.0), (3.0, 3.0), (2.0, 3.0),
            (2.0, 1.0), (1.0, 1.0), (1.0, 3.0), (0.0, 3.0),
        ];
        assert!(point_in_ring(0.5, 2.0, &u));
        assert!(!point_in_ring(1.5, 2.0, &u));
        assert!(point_in_ring(1.5, 0.5, &u));
    }
}
