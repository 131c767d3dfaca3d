pub const SERVER_PORT: u16 = 3000;
pub const SERVICE_NAME: &str = "snake-board";

// GAME
//
// Grid is square; cells are addressed `(x, y)` with `(0, 0)` top-left.
pub const GRID_SIZE: i32 = 20;
pub const START_CELL: (i32, i32) = (10, 10);
pub const INITIAL_TICK_MS: u64 = 150;
pub const MIN_TICK_MS: u64 = 50;
pub const SPEEDUP_STEP_MS: u64 = 20;
pub const SPEEDUP_EVERY: u32 = 5;

// LEADERBOARD
pub const USERNAME_MAX_CHARS: usize = 32;
pub const SNAPSHOT_LIMIT: usize = 101;
pub const DEFAULT_TOP_LIMIT: usize = 10;
pub const MAX_TOP_LIMIT: usize = 1000;
/// Largest score every backend stores exactly; redis keeps sorted-set scores as doubles (2^53 - 1)
pub const MAX_SCORE: i64 = (1 << 53) - 1;

pub const REDIS_KEY_PREFIX: &str = "scores";
pub const ALL_TIME_PARTITION: &str = "all";

pub const DEFAULT_MEMORY_PAGE_SIZE: usize = 1000;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_MS: u64 = 50;
pub const RETRY_MAX_DELAY_MS: u64 = 2_000;

/// Emoji blocks accepted in usernames, inclusive.
pub const USERNAME_EMOJI_RANGES: &[(u32, u32)] = &[
    (0x1F600, 0x1F64F),
    (0x1F300, 0x1F5FF),
    (0x1F680, 0x1F6FF),
    (0x1F700, 0x1F77F),
    (0x1F780, 0x1F7FF),
    (0x1F800, 0x1F8FF),
    (0x1F900, 0x1F9FF),
    (0x1FA00, 0x1FA6F),
    (0x1FA70, 0x1FAFF),
    (0x2600, 0x26FF),
    (0x2700, 0x27BF),
];
