use crate::error::{Result, SimError};
use tumor_common::CellState;

/// Per-state cell counts taken in a single pass over the lattice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellCensus {
    pub healthy: usize,
    pub tumor: usize,
    pub necrotic: usize,
}

impl CellCensus {
    pub fn total(&self) -> usize {
        self.healthy + self.tumor + self.necrotic
    }
}

/// Fixed-size 2D tissue grid: one `CellState` and one age per site, stored row-major.
///
/// Ages only carry meaning for tumor sites. They are bumped by the transition
/// engine while a site stays tumor and reset to 0 whenever a site turns tumor.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    width: u32,
    height: u32,
    cells: Vec<CellState>,
    ages: Vec<u32>,
}

impl Lattice {
    /// Creates an all-healthy lattice.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SimError::InvalidDimensions { width, height });
        }
        let num_cells = width as usize * height as usize;
        Ok(Self {
            width,
            height,
            cells: vec![CellState::Healthy; num_cells],
            ages: vec![0; num_cells],
        })
    }

    /// Builds a lattice from explicit row-major states, all ages 0.
    pub fn from_states(width: u32, height: u32, states: Vec<CellState>) -> Result<Self> {
        let mut lattice = Self::new(width, height)?;
        if states.len() != lattice.cells.len() {
            return Err(SimError::InvalidConfig(format!(
                "expected {} cell states for a {}x{} lattice, got {}",
                lattice.cells.len(),
                width,
                height,
                states.len()
            )));
        }
        lattice.cells = states;
        Ok(lattice)
    }

    /// Resets every site to healthy (age 0), then turns every site within
    /// Euclidean distance `initial_radius` of the centre into tumor.
    ///
    /// Returns the number of seeded tumor sites. Zero is allowed and leads to a
    /// degenerate (unscaled) run.
    pub fn initialize(&mut self, initial_radius: f64) -> usize {
        self.cells.fill(CellState::Healthy);
        self.ages.fill(0);

        let center_x = (self.width / 2) as i64;
        let center_y = (self.height / 2) as i64;
        let mut seeded = 0;

        for y in 0..self.height {
            for x in 0..self.width {
                let dx = x as i64 - center_x;
                let dy = y as i64 - center_y;
                let dist = ((dx * dx + dy * dy) as f64).sqrt();
                if dist <= initial_radius {
                    let idx = self.idx(x, y);
                    self.cells[idx] = CellState::Tumor;
                    seeded += 1;
                }
            }
        }
        seeded
    }

    #[inline(always)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline(always)]
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    // Row-major index; callers guarantee (x, y) is in bounds.
    #[inline(always)]
    pub(crate) fn idx(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline(always)]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    /// State at (x, y). Panics if out of bounds.
    #[inline(always)]
    pub fn state(&self, x: u32, y: u32) -> CellState {
        self.cells[self.idx(x, y)]
    }

    /// Age at (x, y). Only meaningful while the site is tumor.
    #[inline(always)]
    pub fn age(&self, x: u32, y: u32) -> u32 {
        self.ages[self.idx(x, y)]
    }

    /// Row-major read-only view of every site.
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    /// Row-major cell codes, as stored in snapshots.
    pub fn codes(&self) -> Vec<u8> {
        self.cells.iter().map(|c| c.code()).collect()
    }

    pub(crate) fn set_state(&mut self, x: u32, y: u32, state: CellState) {
        let idx = self.idx(x, y);
        self.cells[idx] = state;
    }

    pub(crate) fn ages_mut(&mut self) -> &mut [u32] {
        &mut self.ages
    }

    /// Marks (x, y) as newly transformed tumor tissue.
    pub(crate) fn spawn_tumor(&mut self, x: u32, y: u32) {
        let idx = self.idx(x, y);
        self.cells[idx] = CellState::Tumor;
        self.ages[idx] = 0;
    }

    pub fn count(&self, state: CellState) -> usize {
        self.cells.iter().filter(|&&c| c == state).count()
    }

    pub fn census(&self) -> CellCensus {
        let mut census = CellCensus::default();
        for cell in &self.cells {
            match cell {
                CellState::Healthy => census.healthy += 1,
                CellState::Tumor => census.tumor += 1,
                CellState::Necrotic => census.necrotic += 1,
            }
        }
        census
    }

    /// Fraction of sites in the square window of half-width `radius` around (x, y)
    /// that are tumor or necrotic. The window is clipped at the borders and the
    /// denominator is the clipped area, which always contains (x, y) itself.
    pub fn local_density(&self, x: u32, y: u32, radius: u32) -> f64 {
        let x_min = x.saturating_sub(radius);
        let x_max = x.saturating_add(radius).saturating_add(1).min(self.width);
        let y_min = y.saturating_sub(radius);
        let y_max = y.saturating_add(radius).saturating_add(1).min(self.height);

        let total_cells = (x_max - x_min) as usize * (y_max - y_min) as usize;
        if total_cells == 0 {
            return 0.0;
        }

        let mut tumor_cells = 0usize;
        for wy in y_min..y_max {
            let row = wy as usize * self.width as usize;
            tumor_cells += self.cells[row + x_min as usize..row + x_max as usize]
                .iter()
                .filter(|c| c.is_tumor_mass())
                .count();
        }
        tumor_cells as f64 / total_cells as f64
    }

    /// Calls `f(nx, ny, state)` for each in-bounds Moore neighbour of (x, y), self excluded.
    #[inline(always)]
    pub fn for_each_moore_neighbor<F>(&self, x: u32, y: u32, mut f: F)
    where
        F: FnMut(u32, u32, CellState),
    {
        for dy in -1..=1i64 {
            for dx in -1..=1i64 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if self.contains(nx, ny) {
                    let (nx, ny) = (nx as u32, ny as u32);
                    f(nx, ny, self.state(nx, ny));
                }
            }
        }
    }

    /// Healthy Moore neighbours of (x, y), in row-major order.
    pub fn healthy_moore_neighbors(&self, x: u32, y: u32) -> Vec<(u32, u32)> {
        let mut out = Vec::with_capacity(8);
        self.healthy_moore_neighbors_into(x, y, &mut out);
        out
    }

    /// Like `healthy_moore_neighbors`, reusing `out` (cleared first).
    pub fn healthy_moore_neighbors_into(&self, x: u32, y: u32, out: &mut Vec<(u32, u32)>) {
        out.clear();
        self.for_each_moore_neighbor(x, y, |nx, ny, state| {
            if state == CellState::Healthy {
                out.push((nx, ny));
            }
        });
    }

    pub fn tumor_moore_neighbor_count(&self, x: u32, y: u32) -> usize {
        let mut count = 0;
        self.for_each_moore_neighbor(x, y, |_, _, state| {
            if state == CellState::Tumor {
                count += 1;
            }
        });
        count
    }

    /// Tumor sites over total sites.
    pub fn global_tumor_density(&self) -> f64 {
        self.count(CellState::Tumor) as f64 / self.cells.len() as f64
    }
}
