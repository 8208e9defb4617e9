use std::collections::HashMap;

use glam::{IVec3, Vec3};

/// Smallest accepted cell size.
const MIN_CELL_SIZE: f32 = 1.0e-3;

/// Builds between full purges of the cell map. Cells emptied by particle
/// motion are otherwise kept (with their allocation) for reuse.
const PURGE_INTERVAL: u32 = 120;

/// Uniform spatial hash for neighbor queries.
///
/// Maps integer cell coordinates (`floor(position / cell_size)` per axis) to the
/// indices of the particles inside. `cell_size` should equal the smoothing
/// radius so a radius query touches only the 3x3x3 block around a cell.
pub struct SpatialHash {
    cell_size: f32,
    inv_cell_size: f32,
    cells: HashMap<IVec3, Vec<u32>>,
    /// Positions from the last build, used to filter candidates by distance.
    positions: Vec<Vec3>,
    builds_since_purge: u32,
}

impl Default for SpatialHash {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl SpatialHash {
    pub fn new(cell_size: f32) -> Self {
        let cell_size = sanitize_cell_size(cell_size);
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
            positions: Vec::new(),
            builds_since_purge: 0,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Takes effect on the next build.
    pub fn set_cell_size(&mut self, size: f32) {
        self.cell_size = sanitize_cell_size(size);
        self.inv_cell_size = 1.0 / self.cell_size;
    }

    /// Number of cells currently allocated, including emptied ones.
    pub fn allocated_cells(&self) -> usize {
        self.cells.len()
    }

    /// Empty every cell and forget the cached positions.
    pub fn clear(&mut self) {
        self.builds_since_purge += 1;
        if self.builds_since_purge >= PURGE_INTERVAL {
            self.cells.clear();
            self.builds_since_purge = 0;
        } else {
            for cell in self.cells.values_mut() {
                cell.clear();
            }
        }
        self.positions.clear();
    }

    /// Clear and insert every position by index. O(N).
    pub fn build_from_positions(&mut self, positions: &[Vec3]) {
        self.clear();
        // Cell churn: drop stale cells once they clearly outnumber the particles.
        if self.cells.len() > positions.len().max(64) * 8 {
            self.cells.clear();
            self.builds_since_purge = 0;
        }
        self.positions.extend_from_slice(positions);
        for (i, &p) in positions.iter().enumerate() {
            self.insert(i as u32, p);
        }
    }

    /// Insert a single index without caching its position. Duplicates are kept.
    pub fn insert(&mut self, index: u32, position: Vec3) {
        let cell = self.cell_coords(position);
        self.cells.entry(cell).or_default().push(index);
    }

    /// Collect indices within `radius` of `position` into `out` (cleared first).
    ///
    /// Candidates come from the cube of cells covering the sphere and are then
    /// filtered by true distance when their position was cached by
    /// [`build_from_positions`](Self::build_from_positions). Indices inserted
    /// without a cached position are returned unfiltered.
    pub fn get_neighbors(&self, position: Vec3, radius: f32, out: &mut Vec<u32>) {
        out.clear();
        if radius < 0.0 || !radius.is_finite() {
            return;
        }
        let r_sq = radius * radius;
        let reach = Vec3::splat(radius);
        self.for_each_cell(position - reach, position + reach, |cell| {
            for &idx in cell {
                match self.positions.get(idx as usize) {
                    Some(p) if (*p - position).length_squared() > r_sq => {}
                    _ => out.push(idx),
                }
            }
        });
    }

    /// Collect indices from every cell overlapping the box `[min, max]`.
    /// No per-particle refinement.
    pub fn query_box(&self, min: Vec3, max: Vec3, out: &mut Vec<u32>) {
        out.clear();
        self.for_each_cell(min.min(max), min.max(max), |cell| out.extend_from_slice(cell));
    }

    /// Visit the occupied cells overlapping `[min, max]` in a fixed order.
    fn for_each_cell<F: FnMut(&[u32])>(&self, min: Vec3, max: Vec3, mut visit: F) {
        let lo = self.cell_coords(min);
        let hi = self.cell_coords(max);
        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    if let Some(cell) = self.cells.get(&IVec3::new(x, y, z)) {
                        visit(cell);
                    }
                }
            }
        }
    }

    /// Convert world position to cell coordinates
    #[inline]
    pub fn cell_coords(&self, pos: Vec3) -> IVec3 {
        IVec3::new(
            (pos.x * self.inv_cell_size).floor() as i32,
            (pos.y * self.inv_cell_size).floor() as i32,
            (pos.z * self.inv_cell_size).floor() as i32,
        )
    }
}

fn sanitize_cell_size(size: f32) -> f32 {
    if size.is_finite() {
        size.max(MIN_CELL_SIZE)
    } else {
        MIN_CELL_SIZE
    }
}
