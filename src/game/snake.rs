use std::collections::VecDeque;

use super::geometry::{Direction, Point};

#[derive(Debug, Clone, PartialEq)]
pub struct Snake {
    body: VecDeque<Point>, // head first, never empty
    heading: Direction,
}

impl Snake {
    pub fn new(start: Point, heading: Direction) -> Self {
        let mut body = VecDeque::new();
        body.push_back(start);
        Self { body, heading }
    }

    /// Builds a snake from an explicit head-first layout. `None` if `segments` is empty.
    pub fn from_segments(segments: Vec<Point>, heading: Direction) -> Option<Self> {
        if segments.is_empty() {
            return None;
        }
        Some(Self { body: segments.into(), heading })
    }

    pub fn head(&self) -> Point {
        self.body[0]
    }

    pub fn tail(&self) -> Point {
        self.body[self.body.len() - 1]
    }

    pub fn heading(&self) -> Direction {
        self.heading
    }

    pub fn segments(&self) -> &VecDeque<Point> {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn occupies(&self, cell: Point) -> bool {
        self.body.contains(&cell)
    }

    /// Shift one cell along the heading. Bounds are the game's concern.
    pub fn move_forward(&mut self) {
        let new_head = self.head().shifted(self.heading);
        self.body.push_front(new_head);
        self.body.pop_back();
    }

    // the duplicate tail is dropped by the next move instead of the real one
    pub fn grow(&mut self) {
        let tail = self.tail();
        self.body.push_back(tail);
    }

    /// Reversals are ignored.
    pub fn set_direction(&mut self, direction: Direction) {
        if direction != self.heading.opposite() {
            self.heading = direction;
        }
    }

    pub fn is_self_collision(&self) -> bool {
        let head = self.head();
        self.body.iter().skip(1).any(|&segment| segment == head)
    }
}
