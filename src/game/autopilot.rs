use std::collections::{HashSet, VecDeque};

use super::cell::Cell;
use super::direction::Direction;
use super::state::{Frame, Game, Status, TickOutcome};

/// Greedy steering: among the moves that don't collide on the next tick, prefer those that leave
/// at least a body's worth of open space, then the one closest to the food.
///
/// Falls back to the current direction when every move is fatal.
pub fn steer(frame: &Frame) -> Direction {
    let head = frame.head();
    let body: HashSet<Cell> = frame.snake.iter().copied().collect();

    Direction::ALL
        .into_iter()
        .filter(|dir| !dir.is_opposite(frame.direction))
        .filter_map(|dir| {
            let next = head.step(dir);
            if !next.in_bounds(frame.size) || body.contains(&next) {
                return None;
            }

            let cramped = open_area(next, &body, frame.size) < frame.snake.len();
            let distance = frame.food.map(|food| next.distance(food)).unwrap_or(0);
            Some(((cramped, distance), dir))
        })
        .min_by_key(|(key, _)| *key)
        .map(|(_, dir)| dir)
        .unwrap_or(frame.direction)
}

/// Cells reachable from `from` without crossing `blocked`, `from` included.
fn open_area(from: Cell, blocked: &HashSet<Cell>, size: i32) -> usize {
    let mut seen = HashSet::from([from]);
    let mut queue = VecDeque::from([from]);

    while let Some(cell) = queue.pop_front() {
        for dir in Direction::ALL {
            let next = cell.step(dir);
            if next.in_bounds(size) && !blocked.contains(&next) && seen.insert(next) {
                queue.push_back(next);
            }
        }
    }

    seen.len()
}

/// Plays `game` to the end without a timer, steering before every tick. Stops early after
/// `max_ticks`.
pub fn play_out(game: &mut Game, max_ticks: u64) -> (TickOutcome, u64) {
    game.start();

    let mut outcome = TickOutcome::Skipped;
    let mut ticks = 0;
    while game.status() == Status::Running && ticks < max_ticks {
        game.steer(steer(&game.frame()));
        outcome = game.tick();
        ticks += 1;
    }

    (outcome, ticks)
}

#[cfg(test)]
mod test {
    use super::*;

    fn frame(snake: &[(i32, i32)], direction: Direction, food: (i32, i32)) -> Frame {
        Game::from_layout(20, snake, direction, food).frame()
    }

    #[test]
    fn test_heads_for_food() {
        assert_eq!(steer(&frame(&[(10, 10)], Direction::Right, (15, 10))), Direction::Right);
        assert_eq!(steer(&frame(&[(10, 10)], Direction::Right, (10, 2))), Direction::Up);
        assert_eq!(steer(&frame(&[(10, 10)], Direction::Right, (10, 18))), Direction::Down);
    }

    #[test]
    fn test_never_reverses() {
        // food straight behind: must turn rather than reverse
        let dir = steer(&frame(&[(10, 10), (11, 10)], Direction::Left, (15, 10)));
        assert_ne!(dir, Direction::Right);
    }

    #[test]
    fn test_avoids_walls_and_body() {
        // in the top-right corner moving Right: only Down is safe
        assert_eq!(steer(&frame(&[(19, 0)], Direction::Right, (0, 0))), Direction::Down);

        // along the right wall heading Down, food further down the wall
        let snake = [(19, 5), (19, 4), (18, 4)];
        assert_eq!(steer(&frame(&snake, Direction::Down, (19, 19))), Direction::Down);

        // boxed in on three sides: the only open cell wins even though food is elsewhere
        let snake = [(5, 5), (5, 4), (4, 4), (4, 5), (4, 6), (5, 6), (6, 6)];
        assert_eq!(steer(&frame(&snake, Direction::Down, (0, 0))), Direction::Right);
    }

    #[test]
    fn test_open_area() {
        let blocked = HashSet::from([Cell::new(1, 0), Cell::new(1, 1), Cell::new(0, 2)]);
        // (0,0) and (0,1) are walled off on a 3x3 board
        assert_eq!(open_area(Cell::new(0, 0), &blocked, 3), 2);
        assert_eq!(open_area(Cell::new(2, 2), &blocked, 3), 4);
    }

    #[test]
    fn test_play_out_scores_and_ends() {
        let mut game = Game::seeded(7);
        let (outcome, ticks) = play_out(&mut game, 50_000);

        assert!(game.score() >= 1);
        assert!(ticks > 0);
        assert!(
            matches!(outcome, TickOutcome::Collided | TickOutcome::BoardFull)
                || ticks == 50_000
        );
    }
}
