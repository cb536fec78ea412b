use std::sync::Arc;

use rayon::iter::{
    IntoParallelIterator, IntoParallelRefIterator, IntoParallelRefMutIterator, ParallelIterator,
};
use serde::{Deserialize, Serialize};

use crate::{
    cell::GridCell,
    grid::Grid,
    mesh::smooth_normal,
    types::{NormalVertex, TriangleWithNormals, Value},
};

/// Iso level used when none is configured.
pub const DEFAULT_ISO_LEVEL: Value = 2.0;

/// How vertex normals are produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NormalMode {
    /// Every vertex carries its triangle's face normal.
    #[default]
    Flat,
    /// Face normals averaged over the triangles sharing a vertex in neighbouring cells.
    Smooth,
}

/// How a cell is cut into triangles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Triangulation {
    /// 256-case table lookup, at most 5 triangles per cell.
    #[default]
    MarchingCubes,
    /// Six tetrahedra per cell, at most 12 triangles. No ambiguous cases.
    MarchingTetrahedra,
}

/// Runtime configuration for a [`Polygonizer`].
///
/// ```rust,ignore
/// let config = PolygonizerConfig::default()
///     .with_iso_level(1.0)
///     .with_normal_mode(NormalMode::Smooth);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolygonizerConfig {
    /// Corners with values strictly below this are inside the surface. Default: `2.0`.
    pub iso_level: Value,
    pub normal_mode: NormalMode,
    pub triangulation: Triangulation,
}

impl Default for PolygonizerConfig {
    fn default() -> Self {
        Self {
            iso_level: DEFAULT_ISO_LEVEL,
            normal_mode: NormalMode::default(),
            triangulation: Triangulation::default(),
        }
    }
}

impl PolygonizerConfig {
    pub fn with_iso_level(mut self, iso_level: Value) -> Self {
        self.iso_level = iso_level;
        self
    }

    pub fn with_normal_mode(mut self, normal_mode: NormalMode) -> Self {
        self.normal_mode = normal_mode;
        self
    }

    pub fn with_triangulation(mut self, triangulation: Triangulation) -> Self {
        self.triangulation = triangulation;
        self
    }
}

type Triangles = Arc<Vec<TriangleWithNormals>>;

/// Extracts the iso-surface of a field grid.
///
/// The grid is tiled into [`GridCell`]s in scan order (x fastest). Each cell
/// keeps its corner samples and flat-shaded triangles, so changing the iso
/// level or the triangulation never touches the field again. The two output
/// lists are built on demand and dropped whenever the cell triangles change:
///
/// ```text
/// recalculate_grid_cells   →  cells tiled, corner samples read
/// triangulate              →  per-cell triangles, flat normals
/// flat / smooth cache      →  concatenation in cell order
/// ```
///
/// All per-cell passes run on the rayon pool.
#[derive(Clone, Debug)]
pub struct Polygonizer {
    config: PolygonizerConfig,
    cell_dimensions: [usize; 3],
    cells: Vec<GridCell>,
    flat: Option<Triangles>,
    smooth: Option<Triangles>,
}

impl Polygonizer {
    /// Polygonizes `grid` with the default configuration.
    pub fn new(grid: &Grid) -> Self {
        Self::with_config(grid, PolygonizerConfig::default())
    }

    pub fn with_config(grid: &Grid, config: PolygonizerConfig) -> Self {
        let mut polygonizer = Self {
            config,
            cell_dimensions: [0; 3],
            cells: Vec::new(),
            flat: None,
            smooth: None,
        };
        polygonizer.recalculate_triangles(grid, true, false);
        polygonizer
    }

    pub fn config(&self) -> PolygonizerConfig {
        self.config
    }

    pub fn iso_level(&self) -> Value {
        self.config.iso_level
    }

    pub fn normal_mode(&self) -> NormalMode {
        self.config.normal_mode
    }

    pub fn strategy(&self) -> Triangulation {
        self.config.triangulation
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// Cells per axis, one less than the grid's points per axis.
    pub fn cell_dimensions(&self) -> [usize; 3] {
        self.cell_dimensions
    }

    /// Index of the cell at `(x, y, z)` in [`cells`](Polygonizer::cells), or `None`
    /// outside the tiling.
    pub fn cell_index(&self, x: usize, y: usize, z: usize) -> Option<usize> {
        let [cx, cy, cz] = self.cell_dimensions;
        (x < cx && y < cy && z < cz).then(|| x + cx * (y + cy * z))
    }

    /// Re-tiles `grid`, reading fresh corner samples. Both caches are dropped.
    pub fn recalculate_grid_cells(&mut self, grid: &Grid) {
        let dims = grid.dimensions();
        let [cx, cy, cz] = [dims.x - 1, dims.y - 1, dims.z - 1];
        let _span = tracing::debug_span!("recalculate_grid_cells", cells = cx * cy * cz).entered();

        self.cell_dimensions = [cx, cy, cz];
        self.cells = (0..cx * cy * cz)
            .into_par_iter()
            .map(|i| GridCell::new(grid, i % cx, (i / cx) % cy, i / (cx * cy)))
            .collect();
        self.invalidate();
    }

    /// Refreshes the triangles after the field changed.
    ///
    /// `dimensions_changed` re-tiles the grid; a tiling that no longer matches the
    /// grid is re-tiled regardless. Otherwise `recompute_samples` re-reads the
    /// corner values of the existing cells. The active output is rebuilt.
    pub fn recalculate_triangles(
        &mut self,
        grid: &Grid,
        dimensions_changed: bool,
        recompute_samples: bool,
    ) {
        let dims = grid.dimensions();
        let stale_tiling = self.cell_dimensions != [dims.x - 1, dims.y - 1, dims.z - 1];
        if stale_tiling && !dimensions_changed {
            log::debug!("tiling does not match a {dims} grid, re-tiling");
        }

        if dimensions_changed || stale_tiling {
            self.recalculate_grid_cells(grid);
        } else if recompute_samples {
            let _span = tracing::debug_span!("refresh_values").entered();
            self.cells
                .par_iter_mut()
                .for_each(|cell| cell.refresh_values(grid));
        }

        self.triangulate_cells();
        self.build_active();
    }

    /// Re-triangulates from the cached corner values.
    pub fn set_iso_level(&mut self, iso_level: Value) {
        self.config.iso_level = iso_level;
        self.triangulate_cells();
        self.build_active();
    }

    /// Switches the output list, building it only if it is not cached.
    pub fn set_normal_mode(&mut self, normal_mode: NormalMode) {
        if self.config.normal_mode == normal_mode {
            return;
        }
        self.config.normal_mode = normal_mode;
        self.build_active();
    }

    pub fn set_strategy(&mut self, triangulation: Triangulation) {
        if self.config.triangulation == triangulation {
            return;
        }
        self.config.triangulation = triangulation;
        self.triangulate_cells();
        self.build_active();
    }

    /// Applies every field of `config`.
    pub fn set_config(&mut self, config: PolygonizerConfig) {
        let retriangulate = config.iso_level != self.config.iso_level
            || config.triangulation != self.config.triangulation;
        self.config = config;
        if retriangulate {
            self.triangulate_cells();
        }
        self.build_active();
    }

    /// Output for the active [`NormalMode`], in cell scan order.
    pub fn triangles(&self) -> &[TriangleWithNormals] {
        self.active().map(|t| t.as_slice()).unwrap_or(&[])
    }

    /// Shared handle to the active output; stays valid after later recomputes.
    pub fn shared_triangles(&self) -> Arc<Vec<TriangleWithNormals>> {
        self.active().cloned().unwrap_or_default()
    }

    /// Whether the output for `mode` is currently cached.
    pub fn is_cached(&self, mode: NormalMode) -> bool {
        match mode {
            NormalMode::Flat => self.flat.is_some(),
            NormalMode::Smooth => self.smooth.is_some(),
        }
    }

    fn active(&self) -> Option<&Triangles> {
        match self.config.normal_mode {
            NormalMode::Flat => self.flat.as_ref(),
            NormalMode::Smooth => self.smooth.as_ref(),
        }
    }

    fn invalidate(&mut self) {
        self.flat = None;
        self.smooth = None;
    }

    fn triangulate_cells(&mut self) {
        let _span = tracing::debug_span!("triangulate", cells = self.cells.len()).entered();
        let (iso, strategy) = (self.config.iso_level, self.config.triangulation);
        self.cells
            .par_iter_mut()
            .for_each(|cell| cell.triangulate(iso, strategy));
        self.invalidate();
    }

    fn build_active(&mut self) {
        match self.config.normal_mode {
            NormalMode::Flat if self.flat.is_none() => {
                self.flat = Some(Arc::new(self.flat_triangles()));
            }
            NormalMode::Smooth if self.smooth.is_none() => {
                self.smooth = Some(Arc::new(self.smooth_triangles()));
            }
            _ => return,
        }
        log::debug!(
            "{:?} output rebuilt: {} triangles from {} cells",
            self.config.normal_mode,
            self.triangles().len(),
            self.cells.len()
        );
    }

    fn flat_triangles(&self) -> Vec<TriangleWithNormals> {
        let total = self.cells.iter().map(|cell| cell.triangles().len()).sum();
        let mut triangles = Vec::with_capacity(total);
        for cell in &self.cells {
            triangles.extend_from_slice(cell.triangles());
        }
        triangles
    }

    fn smooth_triangles(&self) -> Vec<TriangleWithNormals> {
        let _span = tracing::debug_span!("smooth_normals").entered();

        let per_cell: Vec<Vec<TriangleWithNormals>> = self
            .cells
            .par_iter()
            .map(|cell| {
                cell.triangles()
                    .iter()
                    .map(|triangle| {
                        triangle.map(|vertex| {
                            let normal = smooth_normal(
                                &vertex.position,
                                self.neighbourhood(cell.position()),
                            );
                            NormalVertex::new(vertex.position, normal)
                        })
                    })
                    .collect()
            })
            .collect();

        // Merge per-cell lists in scan order
        let total = per_cell.iter().map(Vec::len).sum();
        let mut triangles = Vec::with_capacity(total);
        for mut cell_triangles in per_cell {
            triangles.append(&mut cell_triangles);
        }
        triangles
    }

    /// Triangles of the up to 27 cells around (and including) the cell at `[x, y, z]`.
    fn neighbourhood(&self, [x, y, z]: [usize; 3]) -> impl Iterator<Item = &TriangleWithNormals> {
        let around = |p: usize| p.saturating_sub(1)..=p + 1;
        around(z)
            .flat_map(move |nz| around(y).flat_map(move |ny| around(x).map(move |nx| (nx, ny, nz))))
            .filter_map(move |(nx, ny, nz)| self.cell_index(nx, ny, nz))
            .flat_map(move |index| self.cells[index].triangles())
    }
}
