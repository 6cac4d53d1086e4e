//! Arena configuration assembled from the command line

use shared::{
    ARENA_HEIGHT, ARENA_WIDTH, COLLECTIBLE_MARGIN, COLLECTIBLE_SIZE, MAX_STEP, PLAYER_MARGIN,
    PLAYER_SIZE,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ArenaConfig {
    pub width: i32,
    pub height: i32,
    /// Largest accepted move distance in pixels
    pub max_step: f64,
    /// Collectibles kept alive at all times, never below one
    pub min_collectibles: usize,
    pub collectible_margin: i32,
    pub player_margin: i32,
    /// Seed for spawn positions; `None` draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: ARENA_WIDTH,
            height: ARENA_HEIGHT,
            max_step: MAX_STEP,
            min_collectibles: 1,
            collectible_margin: COLLECTIBLE_MARGIN,
            player_margin: PLAYER_MARGIN,
            seed: None,
        }
    }
}

/// Reasons an [`ArenaConfig`] is refused before the server starts
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("arena {width}x{height} cannot fit players and collectibles inside its margins")]
    ArenaTooSmall { width: i32, height: i32 },
    #[error("max step must be a finite positive number, got {0}")]
    InvalidMaxStep(f64),
    #[error("at least one collectible must be alive")]
    NoCollectibles,
    #[error("spawn margins must not be negative")]
    NegativeMargin,
}

impl ArenaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collectible_margin < 0 || self.player_margin < 0 {
            return Err(ConfigError::NegativeMargin);
        }

        let collectible_span = COLLECTIBLE_SIZE + 2 * self.collectible_margin;
        let player_span = PLAYER_SIZE + 2 * self.player_margin;
        let needed = collectible_span.max(player_span);
        if self.width < needed || self.height < needed {
            return Err(ConfigError::ArenaTooSmall {
                width: self.width,
                height: self.height,
            });
        }

        if !self.max_step.is_finite() || self.max_step <= 0.0 {
            return Err(ConfigError::InvalidMaxStep(self.max_step));
        }

        if self.min_collectibles == 0 {
            return Err(ConfigError::NoCollectibles);
        }

        Ok(())
    }
}
