//! Simulation context
//!
//! Owns everything the core keeps between frames: the validated config, the
//! spatial grid and the pool manager. Bodies stay with the caller.

use serde::Serialize;

use super::events::FrameEvent;
use super::grid::{GridStats, SpatialGrid};
use super::pools::{ActiveSet, PoolManager, PoolManagerStats};
use crate::{ConfigError, SimConfig};

/// Everything a frame produced
#[derive(Debug, Default)]
pub struct FrameReport {
    pub frame: u64,
    pub events: Vec<FrameEvent>,
    /// Body-body contacts resolved this frame
    pub contacts: usize,
    /// Projectiles that hit something this frame
    pub projectile_hits: usize,
    pub active: ActiveSet,
}

/// Debug snapshot of the whole core
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimStats {
    pub frame: u64,
    pub grid: GridStats,
    pub pools: PoolManagerStats,
}

pub struct SimContext {
    pub(crate) config: SimConfig,
    pub(crate) grid: SpatialGrid,
    pub(crate) pools: PoolManager,
    pub(crate) frame: u64,
}

impl SimContext {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = SpatialGrid::from_config(&config);
        log::info!(
            "Simulation ready: world {}x{}, grid {}x{} cells of {}, pools {}/{}, quality {}",
            config.world_width,
            config.world_height,
            grid.cols(),
            grid.rows(),
            config.cell_size,
            config.projectile_pool_size,
            config.particle_pool_size,
            config.quality.as_str()
        );
        Ok(Self {
            pools: PoolManager::new(&config),
            grid,
            config,
            frame: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn pools(&self) -> &PoolManager {
        &self.pools
    }

    /// Spawning projectiles and bursts goes through here
    pub fn pools_mut(&mut self) -> &mut PoolManager {
        &mut self.pools
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Drop all pooled objects and restart the frame count (new level)
    pub fn reset(&mut self) {
        self.pools.clear();
        self.grid.clear();
        self.frame = 0;
        log::debug!("Simulation reset");
    }

    pub fn stats(&self) -> SimStats {
        SimStats {
            frame: self.frame,
            grid: self.grid.stats(),
            pools: self.pools.stats(),
        }
    }
}
