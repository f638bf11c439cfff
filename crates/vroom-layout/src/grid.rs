//! Grid computation

/// Tile aspect ratio (width / height)
pub const ASPECT_RATIO: f64 = 16.0 / 9.0;

/// Container size in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerSize {
    pub width: f64,
    pub height: f64,
}

impl ContainerSize {
    pub const fn new(width: f64, height: f64) -> Self {
        ContainerSize { width, height }
    }

    /// Both dimensions finite and strictly positive
    pub fn is_drawable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Grid layout for a set of equally sized tiles
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Layout {
    pub cols: u32,
    pub rows: u32,
    pub tile_width: f64,
    pub tile_height: f64,
}

impl Layout {
    pub const ZERO: Layout = Layout {
        cols: 0,
        rows: 0,
        tile_width: 0.0,
        tile_height: 0.0,
    };

    /// Number of tile slots in the grid
    pub fn capacity(&self) -> u64 {
        self.cols as u64 * self.rows as u64
    }

    pub fn tile_area(&self) -> f64 {
        self.tile_width * self.tile_height
    }

    /// Top-left corner of tile `index`.
    ///
    /// Tiles fill row by row from the top; the grid is centred horizontally
    /// in the container.
    pub fn tile_origin(&self, index: usize, container: ContainerSize) -> Option<(f64, f64)> {
        if self.cols == 0 || index as u64 >= self.capacity() {
            return None;
        }

        let cols = self.cols as usize;
        let (row, col) = (index / cols, index % cols);
        let grid_width = self.cols as f64 * self.tile_width;
        let offset = ((container.width - grid_width) / 2.0).max(0.0);

        Some((
            offset + col as f64 * self.tile_width,
            row as f64 * self.tile_height,
        ))
    }
}

/// Layout for `count` 16:9 tiles in a `width` × `height` container
pub fn compute_layout(width: f64, height: f64, count: usize) -> Layout {
    compute_layout_with_aspect(width, height, count, ASPECT_RATIO)
}

/// Layout for `count` tiles of the given aspect ratio.
///
/// Tries every column count from 1 to `count`, fits the largest aspect box
/// inside each candidate cell and keeps the widest tile. The first candidate
/// wins ties. `count == 0` yields [`Layout::ZERO`]; a container that cannot
/// be drawn into yields one column of `count` rows with zero-sized tiles.
pub fn compute_layout_with_aspect(width: f64, height: f64, count: usize, aspect: f64) -> Layout {
    if count == 0 {
        return Layout::ZERO;
    }

    let count = u32::try_from(count).unwrap_or(u32::MAX);
    let mut best = Layout {
        cols: 1,
        rows: count,
        tile_width: 0.0,
        tile_height: 0.0,
    };

    if !ContainerSize::new(width, height).is_drawable() || !(aspect.is_finite() && aspect > 0.0) {
        return best;
    }

    for cols in 1..=count {
        let rows = count.div_ceil(cols);
        let cell_width = width / cols as f64;
        let cell_height = height / rows as f64;

        let (tile_width, tile_height) = if cell_width / aspect <= cell_height {
            (cell_width, cell_width / aspect)
        } else {
            (cell_height * aspect, cell_height)
        };

        if tile_width > best.tile_width {
            best = Layout {
                cols,
                rows,
                tile_width,
                tile_height,
            };
        }
    }

    best
}
