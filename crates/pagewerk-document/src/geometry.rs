// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry mapper: conversions between interaction space and document space.
//
// Interaction space is the rendered page at the current zoom, origin top-left,
// one pixel per point at zoom 1.0. Document space is PDF points. Masks are
// stored unscaled with a top-left origin; the flip into PDF's bottom-left
// origin happens once, when a mask becomes a drawing instruction.

use pagewerk_core::types::{Mask, PageIndex, PageSize};
use serde::{Deserialize, Serialize};

/// A point in either coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Convert an interaction-space point into unscaled document units.
///
/// `scale` is the zoom active when the point was captured and must be positive.
pub fn to_document_space(point: Point, scale: f64) -> Point {
    Point {
        x: point.x / scale,
        y: point.y / scale,
    }
}

/// Inverse of [`to_document_space`], used to draw stored masks over the view.
pub fn to_interaction_space(point: Point, scale: f64) -> Point {
    Point {
        x: point.x * scale,
        y: point.y * scale,
    }
}

/// Convert a top-left-origin y into PDF's bottom-left origin on a page of
/// `page_height` points. Self-inverse.
pub fn flip_y(y: f64, page_height: f64) -> f64 {
    page_height - y
}

/// A drag gesture in interaction space, normalised to a top-left rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl DragRect {
    /// Build a rectangle from the drag's start and end points, whichever way
    /// the pointer moved.
    pub fn from_points(start: Point, end: Point) -> Self {
        Self {
            x: start.x.min(end.x),
            y: start.y.min(end.y),
            w: (end.x - start.x).abs(),
            h: (end.y - start.y).abs(),
        }
    }

    /// The mask this drag describes on `page`, with the zoom divided out.
    pub fn to_mask(&self, page: PageIndex, scale: f64) -> Mask {
        let origin = to_document_space(Point::new(self.x, self.y), scale);
        Mask {
            page,
            x: origin.x,
            y: origin.y,
            w: self.w / scale,
            h: self.h / scale,
        }
    }
}

/// A page's effective MediaBox, normalised so `(x0, y0)` is its lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f64,
    pub y0: f64,
    pub width: f64,
    pub height: f64,
}

impl PageBox {
    /// US Letter, used when a page carries no MediaBox anywhere in its tree.
    pub const LETTER: PageBox = PageBox {
        x0: 0.0,
        y0: 0.0,
        width: 612.0,
        height: 792.0,
    };

    /// Normalise a `[llx lly urx ury]` rectangle whose corners may be given in
    /// either order.
    pub fn from_corners(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self {
            x0: a.min(c),
            y0: b.min(d),
            width: (c - a).abs(),
            height: (d - b).abs(),
        }
    }

    pub fn size(&self) -> PageSize {
        PageSize {
            width: self.width,
            height: self.height,
        }
    }
}

/// A rectangle in PDF user space, bottom-left origin, ready for `re`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Where `mask` lands on a page with box `page_box`.
///
/// The mask's bottom edge (`y + h` from the top) is flipped within the page's
/// own height, then offset by the box origin.
///
/// Placement is relative to the MediaBox. CropBox and `/Rotate` are not
/// applied, so on a cropped or rotated page the rectangle can sit away from
/// where it appears in a renderer that shows the CropBox (such as `pdftoppm`).
pub fn redaction_rect(mask: &Mask, page_box: &PageBox) -> PdfRect {
    PdfRect {
        x: page_box.x0 + mask.x,
        y: page_box.y0 + flip_y(mask.y + mask.h, page_box.height),
        w: mask.w,
        h: mask.h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_is_its_own_inverse() {
        for (y, h) in [(0.0, 792.0), (170.0, 200.0), (12.5, 842.0), (900.0, 300.0)] {
            assert_eq!(flip_y(flip_y(y, h), h), y);
        }
    }

    #[test]
    fn same_region_at_different_zooms_gives_same_mask() {
        // A 50x20 point region at (10, 10), drawn once at 150% and once at 50%.
        let at_150 = DragRect::from_points(Point::new(15.0, 15.0), Point::new(90.0, 45.0));
        let at_50 = DragRect::from_points(Point::new(5.0, 5.0), Point::new(30.0, 15.0));

        let a = at_150.to_mask(PageIndex(3), 1.5);
        let b = at_50.to_mask(PageIndex(3), 0.5);
        assert_eq!(a, b);
        assert_eq!(a, Mask::new(3, 10.0, 10.0, 50.0, 20.0));
    }

    #[test]
    fn drag_in_any_direction_normalises() {
        let forward = DragRect::from_points(Point::new(10.0, 10.0), Point::new(60.0, 30.0));
        let backward = DragRect::from_points(Point::new(60.0, 30.0), Point::new(10.0, 10.0));
        let diagonal = DragRect::from_points(Point::new(60.0, 10.0), Point::new(10.0, 30.0));
        assert_eq!(forward, backward);
        assert_eq!(forward, diagonal);
        assert_eq!((forward.w, forward.h), (50.0, 20.0));
    }

    #[test]
    fn interaction_space_round_trips() {
        let p = Point::new(120.0, 48.0);
        assert_eq!(to_document_space(to_interaction_space(p, 1.25), 1.25), p);
    }

    #[test]
    fn mask_on_short_page_flips_within_that_page() {
        let mask = Mask::new(3, 10.0, 10.0, 50.0, 20.0);
        let page = PageBox::from_corners(0.0, 0.0, 300.0, 200.0);
        let rect = redaction_rect(&mask, &page);
        assert_eq!(rect, PdfRect { x: 10.0, y: 170.0, w: 50.0, h: 20.0 });
        assert_eq!(rect.y + rect.h, 190.0);
    }

    #[test]
    fn offset_media_box_shifts_rectangle() {
        let mask = Mask::new(1, 10.0, 10.0, 50.0, 20.0);
        let page = PageBox::from_corners(100.0, 50.0, 400.0, 250.0);
        let rect = redaction_rect(&mask, &page);
        assert_eq!(rect, PdfRect { x: 110.0, y: 220.0, w: 50.0, h: 20.0 });
    }

    #[test]
    fn reversed_corners_normalise() {
        let page = PageBox::from_corners(612.0, 792.0, 0.0, 0.0);
        assert_eq!(page, PageBox::LETTER);
    }
}
