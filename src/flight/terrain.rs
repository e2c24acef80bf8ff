use bevy::math::Vec3;

/// Height of the surface directly below a point.
///
/// Implementations cast downward from far above and report the highest hit.
/// `None` means there is no surface below (off the map), or the surface is
/// already above `position.y` (the query point has penetrated the terrain).
/// Queries must be synchronous; the flight model calls this at most twice per
/// tick.
pub trait TerrainHeightQuery {
    fn height_below(&self, position: Vec3) -> Option<f32>;
}

impl<F> TerrainHeightQuery for F
where
    F: Fn(Vec3) -> Option<f32>,
{
    fn height_below(&self, position: Vec3) -> Option<f32> {
        self(position)
    }
}

/// Regular grid of ground heights with an optional water plane.
///
/// Row `r`, column `c` sits at `(origin_x + c * cell_size, origin_z + r * cell_size)`.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightfieldTerrain {
    origin_x: f32,
    origin_z: f32,
    cell_size: f32,
    columns: usize,
    rows: usize,
    heights: Vec<f32>,
    water_level: Option<f32>,
}

impl HeightfieldTerrain {
    /// Returns `None` when the grid is smaller than 2x2, ragged, or the cell
    /// size is not positive.
    pub fn from_rows(
        origin_x: f32,
        origin_z: f32,
        cell_size: f32,
        rows: &[Vec<f32>],
        water_level: Option<f32>,
    ) -> Option<Self> {
        let columns = rows.first()?.len();
        if rows.len() < 2 || columns < 2 || !(cell_size > 0.0) {
            return None;
        }
        if rows.iter().any(|row| row.len() != columns) {
            return None;
        }

        Some(Self {
            origin_x,
            origin_z,
            cell_size,
            columns,
            rows: rows.len(),
            heights: rows.iter().flatten().copied().collect(),
            water_level,
        })
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn water_level(&self) -> Option<f32> {
        self.water_level
    }

    /// World-space position of a grid node.
    pub fn node_position(&self, row: usize, column: usize) -> Vec3 {
        Vec3::new(
            self.origin_x + column as f32 * self.cell_size,
            self.heights[row * self.columns + column],
            self.origin_z + row as f32 * self.cell_size,
        )
    }

    /// Bilinear ground height, ignoring water. `None` outside the grid.
    pub fn ground_height(&self, x: f32, z: f32) -> Option<f32> {
        let gx = (x - self.origin_x) / self.cell_size;
        let gz = (z - self.origin_z) / self.cell_size;
        let max_x = (self.columns - 1) as f32;
        let max_z = (self.rows - 1) as f32;
        if !(0.0..=max_x).contains(&gx) || !(0.0..=max_z).contains(&gz) {
            return None;
        }

        let c0 = (gx.floor() as usize).min(self.columns - 2);
        let r0 = (gz.floor() as usize).min(self.rows - 2);
        let tx = gx - c0 as f32;
        let tz = gz - r0 as f32;

        let at = |r: usize, c: usize| self.heights[r * self.columns + c];
        let north = at(r0, c0) + (at(r0, c0 + 1) - at(r0, c0)) * tx;
        let south = at(r0 + 1, c0) + (at(r0 + 1, c0 + 1) - at(r0 + 1, c0)) * tx;
        Some(north + (south - north) * tz)
    }

    /// Highest of ground and water at a horizontal position.
    pub fn surface_height(&self, x: f32, z: f32) -> Option<f32> {
        let ground = self.ground_height(x, z)?;
        Some(match self.water_level {
            Some(water) => ground.max(water),
            None => ground,
        })
    }
}

impl TerrainHeightQuery for HeightfieldTerrain {
    fn height_below(&self, position: Vec3) -> Option<f32> {
        let surface = self.surface_height(position.x, position.z)?;
        (surface <= position.y).then_some(surface)
    }
}
