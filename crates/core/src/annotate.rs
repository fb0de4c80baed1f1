//! Overlay drawing for annotated response frames.
//!
//! Draws detection boxes, zone outlines and the crossing line. Text labels
//! are left to the client, which already receives ids and counts as JSON.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::detection::Detection;
use crate::geometry::{LineSegment, Point};
use crate::zones::ZoneMap;

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const ZONE_COLOR: Rgb<u8> = Rgb([255, 200, 0]);
pub const LINE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const BOX_THICKNESS: i32 = 2;
const LINE_THICKNESS: i32 = 3;

/// Return a copy of `frame` with the overlays drawn on it.
///
/// Zone and line coordinates come from clients and may lie far outside the
/// frame; every segment is clipped before it is rasterised.
pub fn annotate_frame(
    frame: &RgbImage,
    detections: &[Detection],
    zones: Option<&ZoneMap>,
    line: Option<&LineSegment>,
) -> RgbImage {
    let mut out = frame.clone();

    if let Some(zones) = zones {
        for polygon in zones.values() {
            draw_polygon(&mut out, polygon, ZONE_COLOR, BOX_THICKNESS);
        }
    }

    for detection in detections {
        draw_box(&mut out, detection.bbox, BOX_COLOR, BOX_THICKNESS);
    }

    if let Some(line) = line {
        draw_thick_segment(&mut out, line.start, line.end, LINE_COLOR, LINE_THICKNESS);
    }

    out
}

fn draw_polygon(img: &mut RgbImage, polygon: &[Point], color: Rgb<u8>, thickness: i32) {
    if polygon.len() < 2 {
        return;
    }
    for (i, a) in polygon.iter().enumerate() {
        let b = polygon[(i + 1) % polygon.len()];
        draw_thick_segment(img, *a, b, color, thickness);
    }
}

/// Hollow box, `thickness` pixels wide, growing inwards from the bbox edges.
fn draw_box(img: &mut RgbImage, bbox: [i32; 4], color: Rgb<u8>, thickness: i32) {
    let (width, height) = img.dimensions();
    // One pixel of slack either side keeps off-frame edges off-frame.
    let clamp_x = |v: i32| v.clamp(-1, width as i32);
    let clamp_y = |v: i32| v.clamp(-1, height as i32);
    let [x1, y1, x2, y2] = bbox;
    let (x1, x2) = (clamp_x(x1.min(x2)), clamp_x(x1.max(x2)));
    let (y1, y2) = (clamp_y(y1.min(y2)), clamp_y(y1.max(y2)));

    for inset in 0..thickness {
        let w = x2 - x1 + 1 - 2 * inset;
        let h = y2 - y1 + 1 - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let rect = Rect::at(x1 + inset, y1 + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(img, rect, color);
    }
}

/// Draw `a`-`b` with a square brush of side `thickness`.
fn draw_thick_segment(img: &mut RgbImage, a: Point, b: Point, color: Rgb<u8>, thickness: i32) {
    let margin = f64::from(thickness);
    let max = (
        f64::from(img.width()) - 1.0 + margin,
        f64::from(img.height()) - 1.0 + margin,
    );
    let Some((a, b)) = clip_segment(a, b, (-margin, -margin), max) else {
        return;
    };

    let half = thickness / 2;
    for dy in -half..(thickness - half) {
        for dx in -half..(thickness - half) {
            let (ox, oy) = (dx as f32, dy as f32);
            draw_line_segment_mut(
                img,
                (a.x.round() as f32 + ox, a.y.round() as f32 + oy),
                (b.x.round() as f32 + ox, b.y.round() as f32 + oy),
                color,
            );
        }
    }
}

/// Liang-Barsky clip of `a`-`b` to the box `[min, max]`.
///
/// `None` when the segment misses the box or its extent does not fit in
/// an `f64`.
fn clip_segment(a: Point, b: Point, min: (f64, f64), max: (f64, f64)) -> Option<(Point, Point)> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    if !dx.is_finite() || !dy.is_finite() {
        return None;
    }

    // Edge index order: left, right, top, bottom.
    let edges = [
        (-dx, a.x - min.0),
        (dx, max.0 - a.x),
        (-dy, a.y - min.1),
        (dy, max.1 - a.y),
    ];
    let (mut t0, mut t0_edge) = (0.0_f64, None);
    let (mut t1, mut t1_edge) = (1.0_f64, None);
    for (edge, (p, q)) in edges.into_iter().enumerate() {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 && r > t0 {
            (t0, t0_edge) = (r, Some(edge));
        } else if p > 0.0 && r < t1 {
            (t1, t1_edge) = (r, Some(edge));
        }
        if t0 > t1 {
            return None;
        }
    }

    // Pin clipped ends to the edge they cut; `t` alone loses precision when
    // the segment is far longer than the box.
    let at = |t: f64, edge: Option<usize>| {
        let mut p = Point::new(a.x + t * dx, a.y + t * dy);
        match edge {
            Some(0) => p.x = min.0,
            Some(1) => p.x = max.0,
            Some(2) => p.y = min.1,
            Some(3) => p.y = max.1,
            _ => {}
        }
        Point::new(p.x.clamp(min.0, max.0), p.y.clamp(min.1, max.1))
    };
    Some((at(t0, t0_edge), at(t1, t1_edge)))
}
