//! Text rendering of the mirrored arena for the console client

use crate::game::ClientGameState;
use shared::{ARENA_HEIGHT, ARENA_WIDTH};

/// Renders a coarse character map plus the leaderboard
pub struct Renderer {
    cols: usize,
    rows: usize,
}

impl Renderer {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols: cols.max(1),
            rows: rows.max(1),
        }
    }

    /// Maps an arena coordinate to a grid cell
    fn cell(&self, x: i32, y: i32) -> (usize, usize) {
        let col = (x.max(0) as usize * self.cols) / ARENA_WIDTH as usize;
        let row = (y.max(0) as usize * self.rows) / ARENA_HEIGHT as usize;
        (col.min(self.cols - 1), row.min(self.rows - 1))
    }

    /// `@` is the local player, `P` other players, `*` collectibles
    pub fn render_map(&self, state: &ClientGameState) -> String {
        let mut grid = vec![vec!['.'; self.cols]; self.rows];

        for collectible in state.collectibles.values() {
            let (col, row) = self.cell(collectible.x, collectible.y);
            grid[row][col] = '*';
        }
        for player in state.players.values() {
            let (col, row) = self.cell(player.x, player.y);
            grid[row][col] = if Some(&player.id) == state.my_id.as_ref() {
                '@'
            } else {
                'P'
            };
        }

        grid.into_iter()
            .map(|row| row.into_iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render_leaderboard(&self, state: &ClientGameState) -> String {
        let mut lines = vec![format!("Score: {}  {}", state.my_score(), state.rank_label())];

        for (index, player) in state.leaderboard().into_iter().enumerate() {
            let you = if Some(&player.id) == state.my_id.as_ref() {
                " (you)"
            } else {
                ""
            };
            lines.push(format!("{:>2}. {}{}: {}", index + 1, player.id, you, player.score));
        }

        lines.join("\n")
    }

    pub fn render(&self, state: &ClientGameState) -> String {
        format!(
            "{}\n{}",
            self.render_map(state),
            self.render_leaderboard(state)
        )
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(32, 12)
    }
}
