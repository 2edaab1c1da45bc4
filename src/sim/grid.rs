//! Uniform spatial grid for broad-phase proximity queries
//!
//! The world rectangle `[0, width] x [0, height]` is cut into square cells.
//! Each step the grid is cleared and every live body is re-registered in all
//! cells its bounding circle overlaps, so a neighbour sitting across a cell
//! border is never missed. Queries union the touched cells and deduplicate.

use glam::Vec2;
use serde::Serialize;

use super::body::{Body, BodySnapshot};
use crate::SimConfig;

#[derive(Debug, Clone, Copy)]
struct GridEntry {
    position: Vec2,
    radius: f32,
}

/// Inclusive column/row span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRange {
    col_min: usize,
    col_max: usize,
    row_min: usize,
    row_max: usize,
}

/// Occupancy numbers for debug overlays
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GridStats {
    pub cols: usize,
    pub rows: usize,
    pub cell_count: usize,
    pub occupied_cells: usize,
    /// occupied / total cells
    pub fill_ratio: f32,
    pub max_per_cell: usize,
    /// Bodies registered by the last rebuild
    pub indexed: usize,
    /// Bodies skipped by the last rebuild (dead or malformed)
    pub skipped: usize,
}

pub struct SpatialGrid {
    cell_size: f32,
    query_buffer: f32,
    default_radius: f32,
    cols: usize,
    rows: usize,
    // Index = row * cols + col
    cells: Vec<Vec<usize>>,
    // Live-object index, by body slice index
    entries: Vec<Option<GridEntry>>,
    indexed: usize,
    skipped: usize,
}

impl SpatialGrid {
    pub fn new(width: f32, height: f32, cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            crate::consts::GRID_CELL_SIZE
        };
        let cols = cell_count(width, cell_size);
        let rows = cell_count(height, cell_size);

        Self {
            cell_size,
            query_buffer: crate::consts::QUERY_BUFFER,
            default_radius: crate::consts::DEFAULT_RADIUS,
            cols,
            rows,
            cells: vec![Vec::new(); cols * rows],
            entries: Vec::new(),
            indexed: 0,
            skipped: 0,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        let mut grid = Self::new(config.world_width, config.world_height, config.cell_size);
        grid.query_buffer = config.query_buffer;
        grid.default_radius = config.default_radius;
        grid
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Drop every registration
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.entries.clear();
        self.indexed = 0;
        self.skipped = 0;
    }

    /// Clear, then register every live, well-formed body under its slice index
    pub fn rebuild<B: Body>(&mut self, bodies: &[B]) {
        self.clear();
        self.entries.resize(bodies.len(), None);

        for (index, body) in bodies.iter().enumerate() {
            match BodySnapshot::capture(body, self.default_radius) {
                Some(snap) => self.insert(index, snap.position, snap.radius),
                None => self.skipped += 1,
            }
        }

        if self.skipped > 0 {
            log::debug!(
                "Grid rebuild: {} indexed, {} skipped",
                self.indexed,
                self.skipped
            );
        }
    }

    fn insert(&mut self, index: usize, position: Vec2, radius: f32) {
        let reach = Vec2::splat(radius);
        let range = self.cell_range(position - reach, position + reach);
        for row in range.row_min..=range.row_max {
            for col in range.col_min..=range.col_max {
                self.cells[row * self.cols + col].push(index);
            }
        }
        if index >= self.entries.len() {
            self.entries.resize(index + 1, None);
        }
        self.entries[index] = Some(GridEntry { position, radius });
        self.indexed += 1;
    }

    /// Whether body `index` was registered by the last rebuild
    pub fn contains(&self, index: usize) -> bool {
        matches!(self.entries.get(index), Some(Some(_)))
    }

    /// Neighbour candidates of registered body `index`, excluding itself.
    /// Unregistered bodies have no neighbours.
    pub fn query(&self, index: usize) -> Vec<usize> {
        let Some(Some(entry)) = self.entries.get(index) else {
            return Vec::new();
        };
        let mut found = self.query_point(entry.position, entry.radius);
        found.retain(|&i| i != index);
        found
    }

    /// Candidates near an arbitrary circle (sorted, deduplicated)
    pub fn query_point(&self, position: Vec2, radius: f32) -> Vec<usize> {
        if !position.is_finite() {
            return Vec::new();
        }
        let radius = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
        let reach = Vec2::splat(radius + self.query_buffer);
        let mut found = self.collect(self.cell_range(position - reach, position + reach));
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Bodies whose position lies inside the rectangle of the given size
    /// centred on `center`
    pub fn query_region(&self, center: Vec2, width: f32, height: f32) -> Vec<usize> {
        if !center.is_finite() || !width.is_finite() || !height.is_finite() {
            return Vec::new();
        }
        let half = Vec2::new(width.abs(), height.abs()) * 0.5;
        let (min, max) = (center - half, center + half);

        let mut found = self.collect(self.cell_range(min, max));
        found.sort_unstable();
        found.dedup();
        // Cells over-approximate the rectangle
        found.retain(|&i| {
            self.entries[i].is_some_and(|e| {
                e.position.x >= min.x
                    && e.position.x <= max.x
                    && e.position.y >= min.y
                    && e.position.y <= max.y
            })
        });
        found
    }

    fn collect(&self, range: CellRange) -> Vec<usize> {
        let mut found = Vec::new();
        for row in range.row_min..=range.row_max {
            for col in range.col_min..=range.col_max {
                found.extend_from_slice(&self.cells[row * self.cols + col]);
            }
        }
        found
    }

    /// Map a world-space box to cells, clamping to the grid
    fn cell_range(&self, min: Vec2, max: Vec2) -> CellRange {
        CellRange {
            col_min: self.clamp_cell(min.x, self.cols),
            col_max: self.clamp_cell(max.x, self.cols),
            row_min: self.clamp_cell(min.y, self.rows),
            row_max: self.clamp_cell(max.y, self.rows),
        }
    }

    #[inline]
    fn clamp_cell(&self, coord: f32, count: usize) -> usize {
        let cell = (coord / self.cell_size).floor();
        if cell <= 0.0 {
            0
        } else {
            (cell as usize).min(count - 1)
        }
    }

    pub fn stats(&self) -> GridStats {
        let occupied_cells = self.cells.iter().filter(|c| !c.is_empty()).count();
        let max_per_cell = self.cells.iter().map(Vec::len).max().unwrap_or(0);
        let cell_count = self.cells.len();
        GridStats {
            cols: self.cols,
            rows: self.rows,
            cell_count,
            occupied_cells,
            fill_ratio: occupied_cells as f32 / cell_count as f32,
            max_per_cell,
            indexed: self.indexed,
            skipped: self.skipped,
        }
    }
}

fn cell_count(extent: f32, cell_size: f32) -> usize {
    if extent.is_finite() && extent > 0.0 {
        ((extent / cell_size).ceil() as usize).max(1)
    } else {
        1
    }
}
