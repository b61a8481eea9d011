// Library interface for the engine core: position representation, move
// generation, the transposition table, search, and the static evaluator.
// The UCI text loop and GUI are external collaborators that drive this
// crate through `Engine::find_best_move`.

pub mod board;
pub mod defs;
pub mod engine;
pub mod evaluation;
pub mod misc;
pub mod movegen;
pub mod position;
pub mod search;

pub use board::Board;
pub use defs::{FEN_START_POSITION, FEN_KIWIPETE_POSITION};
pub use engine::{Engine, EngineConfig};
pub use evaluation::{evaluate, Evaluator};
pub use movegen::MoveGenerator;
pub use position::Position;
