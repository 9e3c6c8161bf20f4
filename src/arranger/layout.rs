//! Grid layout for browser windows.
//!
//! `n` windows are placed on a `cols × rows` grid with
//! `cols = ceil(sqrt(n))` and `rows = ceil(n / cols)`, filled row by row
//! from the top-left corner of the work area.  Cell sizes are integer
//! divisions of the work area, so any remainder is left unused at the
//! right and bottom edges.

/// Usable area of a monitor in desktop coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkArea {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Target geometry of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Grid dimensions `(cols, rows)` for `n` windows.  `(0, 0)` when `n == 0`.
pub fn grid_dimensions(n: usize) -> (usize, usize) {
    if n == 0 {
        return (0, 0);
    }
    let mut cols = (n as f64).sqrt().ceil() as usize;
    // Guard against float rounding on perfect squares.
    while cols * cols < n {
        cols += 1;
    }
    while cols > 1 && (cols - 1) * (cols - 1) >= n {
        cols -= 1;
    }
    let rows = n.div_ceil(cols);
    (cols, rows)
}

/// Rectangles for `n` windows tiled over `area`, in row-major order.
pub fn layout(n: usize, area: WorkArea) -> Vec<Rect> {
    let (cols, rows) = grid_dimensions(n);
    if n == 0 {
        return Vec::new();
    }
    let cell_w = area.width / cols as i32;
    let cell_h = area.height / rows as i32;

    (0..n)
        .map(|i| {
            let col = (i % cols) as i32;
            let row = (i / cols) as i32;
            Rect {
                x: area.x + col * cell_w,
                y: area.y + row * cell_h,
                width: cell_w,
                height: cell_h,
            }
        })
        .collect()
}
