pub mod geometry;
pub mod snake;

use std::fmt;

use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GameConfig;
use crate::error::{Result, SnakeError};
pub use geometry::{Action, Direction, Point, turn};
pub use snake::Snake;

pub const FEATURE_LEN: usize = 11;

/// Random draws before food placement falls back to scanning free cells.
pub const FOOD_PLACEMENT_ATTEMPTS: usize = 64;

pub type Features = [f32; FEATURE_LEN];

/// What a single tick did to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepEvent {
    Moved,
    AteFood,
    HitWall,
    HitSelf,
    Starved,
    /// Ate the last food the interior had room for
    BoardFilled,
    AlreadyOver,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub reward: f32,
    pub event: StepEvent,
}

pub struct Game {
    config: GameConfig,
    snake: Snake,
    food: Option<Point>, // None once the snake fills the interior
    score: u32,
    terminal: bool,
    steps_since_food: u32,
    steps: u64,
    rng: StdRng,
}

impl Game {
    pub fn new(config: GameConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy(config: GameConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    fn with_rng(config: GameConfig, rng: StdRng) -> Result<Self> {
        let (width, height) = (config.width, config.height);
        if width < 3 || height < 3 || (width - 2).saturating_mul(height - 2) < 2 {
            return Err(SnakeError::InvalidGrid { width, height });
        }

        let mut instance = Self {
            snake: Snake::new(Point::new(width / 2, height / 2), Direction::Right),
            config,
            food: None,
            score: 0,
            terminal: false,
            steps_since_food: 0,
            steps: 0,
            rng,
        };
        instance.reset();

        Ok(instance)
    }

    pub fn config(&self) -> &GameConfig {&self.config}
    pub fn width(&self) -> i32 {self.config.width}
    pub fn height(&self) -> i32 {self.config.height}
    pub fn snake(&self) -> &Snake {&self.snake}
    pub fn food(&self) -> Option<Point> {self.food}
    pub fn score(&self) -> u32 {self.score}
    pub fn is_terminal(&self) -> bool {self.terminal}
    pub fn steps(&self) -> u64 {self.steps}
    pub fn steps_since_food(&self) -> u32 {self.steps_since_food}

    /// Steps without food the snake may take at its current length.
    pub fn stale_limit(&self) -> u32 {
        let tail_segments = u32::try_from(self.snake.len() - 1).unwrap_or(u32::MAX);
        self.config.stale_base.saturating_add(tail_segments.saturating_mul(self.config.stale_per_segment))
    }

    pub fn reset(&mut self) {
        let center = Point::new(self.config.width / 2, self.config.height / 2);
        self.snake = Snake::new(center, Direction::Right);
        self.score = 0;
        self.terminal = false;
        self.steps_since_food = 0;
        self.steps = 0;
        self.food = self.place_food();
        debug!(food = ?self.food, "game reset");
    }

    pub fn step(&mut self, action: Action) -> f32 {
        self.step_outcome(action).reward
    }

    pub fn step_outcome(&mut self, action: Action) -> StepOutcome {
        let direction = turn(self.snake.heading(), action);
        self.step_direction(direction)
    }

    /// Advance one tick heading `direction`; a reversal keeps the current heading.
    pub fn step_direction(&mut self, direction: Direction) -> StepOutcome {
        if self.terminal {
            return StepOutcome { reward: self.config.terminal_reward, event: StepEvent::AlreadyOver };
        }

        let dist_before = self.distance_to_food();

        self.snake.set_direction(direction);
        self.snake.move_forward();
        self.steps += 1;
        self.steps_since_food += 1;

        let head = self.snake.head();

        // order matters: walls, body, food, shaping, hunger
        if self.is_wall(head) {
            self.terminal = true;
            return StepOutcome { reward: self.config.wall_reward, event: StepEvent::HitWall };
        }

        if self.snake.is_self_collision() {
            self.terminal = true;
            return StepOutcome { reward: self.config.self_collision_reward, event: StepEvent::HitSelf };
        }

        if self.food == Some(head) {
            self.snake.grow();
            self.score += self.config.score_increment;
            self.steps_since_food = 0;
            self.food = self.place_food();
            debug!(score = self.score, length = self.snake.len(), "food captured");

            if self.food.is_none() {
                self.terminal = true;
                return StepOutcome { reward: self.config.food_reward, event: StepEvent::BoardFilled };
            }
            return StepOutcome { reward: self.config.food_reward, event: StepEvent::AteFood };
        }

        let mut reward = self.config.step_reward;
        if let (Some(before), Some(after)) = (dist_before, self.distance_to_food()) {
            if after < before {
                reward += self.config.closer_reward;
            } else if after > before {
                reward += self.config.farther_reward;
            }
        }

        if self.steps_since_food > self.stale_limit() {
            self.terminal = true;
            reward += self.config.stale_reward;
            return StepOutcome { reward, event: StepEvent::Starved };
        }

        StepOutcome { reward, event: StepEvent::Moved }
    }

    // state: [heading u,d,l,r; food left,right,above,below; danger f,l,r]
    pub fn feature_vector(&self) -> Features {
        let head = self.snake.head();
        let heading = self.snake.heading();

        let mut features = [0.0; FEATURE_LEN];

        let heading_slot = match heading {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        };
        features[heading_slot] = 1.0;

        if let Some(food) = self.food {
            features[4] = (food.x < head.x) as i32 as f32;
            features[5] = (food.x > head.x) as i32 as f32;
            features[6] = (food.y < head.y) as i32 as f32;
            features[7] = (food.y > head.y) as i32 as f32;
        }

        features[8] = self.is_danger(head.shifted(heading)) as i32 as f32;
        features[9] = self.is_danger(head.shifted(heading.left())) as i32 as f32;
        features[10] = self.is_danger(head.shifted(heading.right())) as i32 as f32;

        features
    }

    fn is_wall(&self, cell: Point) -> bool {
        cell.x <= 0 || cell.x >= self.config.width - 1 || cell.y <= 0 || cell.y >= self.config.height - 1
    }

    fn is_danger(&self, cell: Point) -> bool {
        self.is_wall(cell) || self.snake.occupies(cell)
    }

    fn distance_to_food(&self) -> Option<i32> {
        self.food.map(|food| self.snake.head().manhattan(food))
    }

    // rejection-sample the interior, then pick among whatever cells are still free
    fn place_food(&mut self) -> Option<Point> {
        let (width, height) = (self.config.width, self.config.height);

        for _ in 0..FOOD_PLACEMENT_ATTEMPTS {
            let cell = Point::new(self.rng.random_range(1..width - 1), self.rng.random_range(1..height - 1));
            if !self.snake.occupies(cell) {
                return Some(cell);
            }
        }

        let free: Vec<Point> = (1..height - 1)
            .flat_map(|y| (1..width - 1).map(move |x| Point::new(x, y)))
            .filter(|&cell| !self.snake.occupies(cell))
            .collect();

        warn!(free_cells = free.len(), "food placement fell back to scanning free cells");
        free.choose(&mut self.rng).copied()
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = self.snake.head();
        for y in 0..self.config.height {
            for x in 0..self.config.width {
                let cell = Point::new(x, y);
                let glyph = if self.is_wall(cell) {
                    '#'
                } else if cell == head {
                    '@'
                } else if self.snake.occupies(cell) {
                    'o'
                } else if self.food == Some(cell) {
                    '*'
                } else {
                    ' '
                };
                write!(f, "{glyph}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(width: i32, height: i32) -> Game {
        Game::new(GameConfig::new(width, height), 7).unwrap()
    }

    fn set_snake(game: &mut Game, segments: &[(i32, i32)], heading: Direction) {
        let body = segments.iter().map(|&(x, y)| Point::new(x, y)).collect();
        game.snake = Snake::from_segments(body, heading).unwrap();
    }

    #[test]
    fn test_rejects_tiny_grid() {
        assert!(matches!(
            Game::new(GameConfig::new(3, 3), 0),
            Err(SnakeError::InvalidGrid { width: 3, height: 3 })
        ));
        assert!(Game::new(GameConfig::new(4, 3), 0).is_ok());
    }

    #[test]
    fn test_reset_state() {
        let mut game = game(20, 10);
        game.step(Action::Straight);
        game.reset();

        assert_eq!(game.snake().len(), 1);
        assert_eq!(game.snake().head(), Point::new(10, 5));
        assert_eq!(game.snake().heading(), Direction::Right);
        assert_eq!(game.score(), 0);
        assert!(!game.is_terminal());
        assert_eq!(game.steps_since_food(), 0);

        let food = game.food().unwrap();
        assert!(!game.is_wall(food));
        assert_ne!(food, game.snake().head());
    }

    #[test]
    fn test_same_seed_same_food() {
        let a = game(20, 10);
        let b = game(20, 10);
        assert_eq!(a.food(), b.food());
    }

    #[test]
    fn test_step_ate_food_reward() {
        let mut game = game(20, 10);
        game.reset();
        game.food = Some(Point::new(11, 5));

        let outcome = game.step_outcome(Action::Straight);

        assert_eq!(outcome.event, StepEvent::AteFood);
        assert_eq!(outcome.reward, game.config().food_reward);
        assert_eq!(game.score(), game.config().score_increment);
        assert!(!game.is_terminal());
        assert_eq!(game.steps_since_food(), 0);
        assert_eq!(game.snake().len(), 2);

        let food = game.food().unwrap();
        assert!(!game.snake().occupies(food));
    }

    #[test]
    fn test_step_wall_death() {
        let mut game = game(20, 10);
        set_snake(&mut game, &[(18, 5)], Direction::Right);
        game.food = Some(Point::new(2, 2));

        let outcome = game.step_outcome(Action::Straight);

        assert_eq!(outcome.event, StepEvent::HitWall);
        assert_eq!(outcome.reward, game.config().wall_reward);
        assert!(game.is_terminal());
    }

    #[test]
    fn test_wall_beats_food_on_border() {
        // food can never be on the border, but the wall check still wins if it were
        let mut game = game(20, 10);
        set_snake(&mut game, &[(1, 1)], Direction::Up);
        game.food = Some(Point::new(1, 0));

        let outcome = game.step_outcome(Action::Straight);
        assert_eq!(outcome.event, StepEvent::HitWall);
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn test_step_self_collision() {
        let mut game = game(20, 10);
        set_snake(&mut game, &[(5, 5), (6, 5), (6, 6), (5, 6), (4, 6)], Direction::Down);
        game.food = Some(Point::new(15, 2));

        // heading down into (5, 6), which is still occupied after the tail moves
        let outcome = game.step_outcome(Action::Straight);

        assert_eq!(outcome.event, StepEvent::HitSelf);
        assert_eq!(outcome.reward, game.config().self_collision_reward);
        assert!(game.is_terminal());
    }

    #[test]
    fn test_step_after_terminal_is_noop() {
        let mut game = game(20, 10);
        set_snake(&mut game, &[(18, 5)], Direction::Right);
        game.step(Action::Straight);
        assert!(game.is_terminal());

        let steps = game.steps();
        let head = game.snake().head();
        let outcome = game.step_outcome(Action::TurnLeft);

        assert_eq!(outcome.event, StepEvent::AlreadyOver);
        assert_eq!(outcome.reward, game.config().terminal_reward);
        assert_eq!(game.steps(), steps);
        assert_eq!(game.snake().head(), head);
    }

    #[test]
    fn test_distance_shaping() {
        let mut game = game(20, 10);
        set_snake(&mut game, &[(10, 5)], Direction::Right);
        game.food = Some(Point::new(15, 5));

        let closer = game.step(Action::Straight);
        let config = game.config().clone();
        assert!((closer - (config.step_reward + config.closer_reward)).abs() < 1e-6);

        game.food = Some(Point::new(2, 5));
        let farther = game.step(Action::TurnLeft);
        // moved up: x unchanged, y away from food
        assert!((farther - (config.step_reward + config.farther_reward)).abs() < 1e-6);
    }

    #[test]
    fn test_starvation_after_stale_limit() {
        let mut config = GameConfig::new(20, 10);
        config.stale_base = 5;
        let mut game = Game::new(config, 1).unwrap();
        game.food = Some(Point::new(2, 2));
        assert_eq!(game.stale_limit(), 5);

        let mut events = Vec::new();
        for _ in 0..10 {
            events.push(game.step_outcome(Action::TurnRight).event);
        }

        assert!(events[..5].iter().all(|&e| e == StepEvent::Moved));
        assert_eq!(events[5], StepEvent::Starved);
        assert!(events[6..].iter().all(|&e| e == StepEvent::AlreadyOver));
    }

    #[test]
    fn test_stale_limit_scales_with_length() {
        let mut game = game(20, 10);
        set_snake(&mut game, &[(5, 5), (4, 5), (3, 5)], Direction::Right);
        let config = game.config().clone();
        assert_eq!(game.stale_limit(), config.stale_base + 2 * config.stale_per_segment);
    }

    #[test]
    fn test_feature_vector_heading_and_food() {
        let mut game = game(20, 10);
        set_snake(&mut game, &[(10, 5)], Direction::Up);
        game.food = Some(Point::new(3, 2));

        let expected = [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        let mut features = game.feature_vector();
        assert_eq!(features[0], 1.0);
        features[0] = 0.0;
        assert_eq!(features, expected);
    }

    #[test]
    fn test_feature_vector_danger_relative_to_heading() {
        let mut game = game(20, 10);
        // heading right along the top row: wall on the left, body segment to the right
        set_snake(&mut game, &[(5, 1), (5, 2), (4, 2), (4, 1)], Direction::Right);
        game.food = Some(Point::new(15, 1));

        let features = game.feature_vector();
        assert_eq!(features[3], 1.0);
        assert_eq!(features[8], 0.0, "front");
        assert_eq!(features[9], 1.0, "left is the top wall");
        assert_eq!(features[10], 1.0, "right is the body");
    }

    #[test]
    fn test_feature_vector_danger_heading_up() {
        let mut game = game(20, 10);
        // up the left column: wall on the left, body to the right
        set_snake(&mut game, &[(1, 4), (1, 5), (2, 5), (2, 4)], Direction::Up);

        let features = game.feature_vector();
        assert_eq!(features[0], 1.0);
        assert_eq!(features[8], 0.0, "front");
        assert_eq!(features[9], 1.0, "left is the left wall");
        assert_eq!(features[10], 1.0, "right is the body");

        set_snake(&mut game, &[(10, 1)], Direction::Up);
        let features = game.feature_vector();
        assert_eq!(features[8], 1.0, "front is the top wall");
        assert_eq!(features[9], 0.0);
        assert_eq!(features[10], 0.0);
    }

    #[test]
    fn test_feature_vector_danger_heading_down() {
        let mut game = game(20, 10);
        // down the right column: left is the right wall, right is the body
        set_snake(&mut game, &[(18, 4), (18, 3), (17, 3), (17, 4)], Direction::Down);

        let features = game.feature_vector();
        assert_eq!(features[1], 1.0);
        assert_eq!(features[8], 0.0, "front");
        assert_eq!(features[9], 1.0, "left is the right wall");
        assert_eq!(features[10], 1.0, "right is the body");
    }

    #[test]
    fn test_feature_vector_danger_heading_left() {
        let mut game = game(20, 10);
        // left along the bottom row: left is the bottom wall, right is the body
        set_snake(&mut game, &[(4, 8), (5, 8), (5, 7), (4, 7)], Direction::Left);

        let features = game.feature_vector();
        assert_eq!(features[2], 1.0);
        assert_eq!(features[8], 0.0, "front");
        assert_eq!(features[9], 1.0, "left is the bottom wall");
        assert_eq!(features[10], 1.0, "right is the body");

        set_snake(&mut game, &[(1, 5)], Direction::Left);
        let features = game.feature_vector();
        assert_eq!(features[8], 1.0, "front is the left wall");
        assert_eq!(features[9], 0.0);
        assert_eq!(features[10], 0.0);
    }

    #[test]
    fn test_stale_limit_saturates() {
        let config = GameConfig { stale_per_segment: u32::MAX, ..GameConfig::new(20, 10) };
        let mut game = Game::new(config, 1).unwrap();
        assert_eq!(game.stale_limit(), 100);

        set_snake(&mut game, &[(5, 5), (4, 5), (3, 5)], Direction::Right);
        assert_eq!(game.stale_limit(), u32::MAX);
    }

    #[test]
    fn test_huge_grid_dimensions_do_not_overflow() {
        // the interior cell count exceeds i32::MAX
        let mut game = game(100_000, 100_000);
        assert!(game.food().is_some());
        game.step(Action::Straight);
        assert!(!game.is_terminal());
    }

    #[test]
    fn test_feature_vector_without_food() {
        let mut game = game(20, 10);
        game.food = None;
        let features = game.feature_vector();
        assert!(features[4..8].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_food_fallback_finds_last_free_cell() {
        // 4x4 grid: interior is the 2x2 block (1..=2, 1..=2)
        let mut game = game(4, 4);
        set_snake(&mut game, &[(1, 1), (2, 1), (2, 2)], Direction::Left);

        assert_eq!(game.place_food(), Some(Point::new(1, 2)));
    }

    #[test]
    fn test_filling_the_board_ends_the_game() {
        // 5x3 grid: interior is the row (1..=3, 1); the snake just ate, so its tail is doubled
        let mut game = game(5, 3);
        set_snake(&mut game, &[(2, 1), (3, 1), (3, 1)], Direction::Left);
        game.food = Some(Point::new(1, 1));

        let outcome = game.step_outcome(Action::Straight);

        assert_eq!(outcome.event, StepEvent::BoardFilled);
        assert_eq!(outcome.reward, game.config().food_reward);
        assert!(game.is_terminal());
        assert_eq!(game.food(), None);
    }

    #[test]
    fn test_render_layout() {
        let mut game = game(6, 4);
        set_snake(&mut game, &[(2, 1), (1, 1)], Direction::Right);
        game.food = Some(Point::new(4, 2));

        let frame = game.to_string();
        let rows: Vec<&str> = frame.lines().collect();
        assert_eq!(rows, vec!["######", "#o@  #", "#   *#", "######"]);
    }
}
