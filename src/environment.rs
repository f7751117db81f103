//! Read-only environment snapshot handed to each brain tick.
//!
//! The fluid solver and nutrient map live outside this crate; they publish
//! their channel arrays here and the brain samples them by world position.

use crate::body::Vec2;
use serde::{Deserialize, Serialize};

/// Map a world position onto a square grid of `size` cells per side
#[inline]
fn grid_cell(position: Vec2, world_width: f64, world_height: f64, size: usize) -> Option<usize> {
    if size == 0 || world_width <= 0.0 || world_height <= 0.0 {
        return None;
    }
    let gx = (position.x / world_width * size as f64).floor();
    let gy = (position.y / world_height * size as f64).floor();
    if !gx.is_finite() || !gy.is_finite() {
        return None;
    }
    let gx = (gx.max(0.0) as usize).min(size - 1);
    let gy = (gy.max(0.0) as usize).min(size - 1);
    Some(gy * size + gx)
}

/// Dye and velocity channels of the fluid simulation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FluidField {
    size: usize,
    /// RGB dye density per cell, each channel in [0, 255]
    dye: [Vec<f64>; 3],
    velocity_x: Vec<f64>,
    velocity_y: Vec<f64>,
}

impl FluidField {
    /// Create an empty, still field with `size × size` cells
    pub fn new(size: usize) -> Self {
        let cells = size * size;
        Self {
            size,
            dye: [vec![0.0; cells], vec![0.0; cells], vec![0.0; cells]],
            velocity_x: vec![0.0; cells],
            velocity_y: vec![0.0; cells],
        }
    }

    /// Grid cells per side
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Set dye at a grid cell
    pub fn set_dye(&mut self, gx: usize, gy: usize, rgb: [f64; 3]) {
        if gx < self.size && gy < self.size {
            let idx = gy * self.size + gx;
            for (channel, value) in self.dye.iter_mut().zip(rgb) {
                channel[idx] = value.clamp(0.0, 255.0);
            }
        }
    }

    /// Set velocity at a grid cell
    pub fn set_velocity(&mut self, gx: usize, gy: usize, velocity: Vec2) {
        if gx < self.size && gy < self.size {
            let idx = gy * self.size + gx;
            self.velocity_x[idx] = velocity.x;
            self.velocity_y[idx] = velocity.y;
        }
    }

    /// Fill every cell with the same dye and velocity
    pub fn fill(&mut self, rgb: [f64; 3], velocity: Vec2) {
        for (channel, value) in self.dye.iter_mut().zip(rgb) {
            channel.fill(value.clamp(0.0, 255.0));
        }
        self.velocity_x.fill(velocity.x);
        self.velocity_y.fill(velocity.y);
    }

    /// Raw [0, 255] dye at flat cell `idx`
    #[inline]
    fn dye_at(&self, idx: usize) -> [f64; 3] {
        [self.dye[0][idx], self.dye[1][idx], self.dye[2][idx]]
    }

    #[inline]
    fn velocity_at(&self, idx: usize) -> Vec2 {
        Vec2::new(self.velocity_x[idx], self.velocity_y[idx])
    }
}

/// Nutrient multiplier map
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NutrientField {
    size: usize,
    cells: Vec<f64>,
    /// Lowest value the map produces
    pub min: f64,
    /// Highest value the map produces
    pub max: f64,
}

impl NutrientField {
    /// Create a uniform field
    pub fn new(size: usize, value: f64, min: f64, max: f64) -> Self {
        Self {
            size,
            cells: vec![value; size * size],
            min,
            max,
        }
    }

    /// Set nutrient at a grid cell
    pub fn set(&mut self, gx: usize, gy: usize, value: f64) {
        if gx < self.size && gy < self.size {
            self.cells[gy * self.size + gx] = value;
        }
    }

    /// Map a raw value onto [0, 1] over this field's range
    #[inline]
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.5;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }
}

/// Everything a brain may read about the world during one tick
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Environment {
    pub world_width: f64,
    pub world_height: f64,
    pub fluid: Option<FluidField>,
    pub nutrients: Option<NutrientField>,
}

impl Environment {
    /// World without fluid or nutrient data
    pub fn empty(world_width: f64, world_height: f64) -> Self {
        Self {
            world_width,
            world_height,
            fluid: None,
            nutrients: None,
        }
    }

    /// Dye at a world position, each channel scaled to [0, 1].
    /// Returns zeros when no fluid field is present.
    pub fn sample_dye(&self, position: Vec2) -> [f64; 3] {
        let Some(fluid) = &self.fluid else {
            return [0.0; 3];
        };
        match grid_cell(position, self.world_width, self.world_height, fluid.size) {
            Some(idx) => fluid.dye_at(idx).map(|c| c / 255.0),
            None => [0.0; 3],
        }
    }

    /// Fluid velocity at a world position, zero when no field is present
    pub fn sample_velocity(&self, position: Vec2) -> Vec2 {
        let Some(fluid) = &self.fluid else {
            return Vec2::ZERO;
        };
        grid_cell(position, self.world_width, self.world_height, fluid.size)
            .map(|idx| fluid.velocity_at(idx))
            .unwrap_or(Vec2::ZERO)
    }

    /// Normalized nutrient at a world position, 0.5 when no map is present
    pub fn sample_nutrient(&self, position: Vec2) -> f64 {
        let Some(nutrients) = &self.nutrients else {
            return 0.5;
        };
        match grid_cell(position, self.world_width, self.world_height, nutrients.size) {
            Some(idx) => nutrients.normalize(nutrients.cells[idx]),
            None => 0.5,
        }
    }
}
