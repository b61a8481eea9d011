/* =======================================================================
Rustic is a chess playing engine.
Copyright (C) 2019-2024, Marcel Vanthoor
https://rustic-chess.org/

Rustic is written in the Rust programming language. It is an original
work, not derived from any engine that came before it. However, it does
use a lot of concepts which are well-known and are in use by most if not
all classical alpha/beta-based chess engines.

Rustic is free software: you can redistribute it and/or modify it under
the terms of the GNU General Public License version 3 as published by
the Free Software Foundation.

Rustic is distributed in the hope that it will be useful, but WITHOUT
ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License
for more details.

You should have received a copy of the GNU General Public License along
with this program.  If not, see <http://www.gnu.org/licenses/>.
======================================================================= */

// Lazy-SMP orchestration: `Engine` owns the transposition table across
// calls, fans a `find_best_move` call out over N-1 helper threads plus
// the calling thread, and reports the canonical thread's stats.

pub mod defs;
pub mod transposition;

use crate::board::zobrist;
pub use crate::engine::defs::EngineConfig;
use crate::engine::defs::{SearchStats, TT};
use crate::movegen::defs::Move;
use crate::movegen::magics;
use crate::position::Position;
use crate::search::alpha_beta::Worker;
use std::num::NonZeroUsize;
use std::sync::atomic::AtomicBool;

pub struct Engine {
    config: EngineConfig,
    tt: TT,
    last_stats: SearchStats,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        magics::init_magics();
        zobrist::init_zobrist();
        Self {
            tt: TT::new(config.tt_size_mb),
            config,
            last_stats: SearchStats::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        if config.tt_size_mb != self.config.tt_size_mb {
            self.tt.resize(config.tt_size_mb);
        }
        self.config = config;
    }

    fn worker_count(&self) -> usize {
        if self.config.threads > 0 {
            self.config.threads
        } else {
            std::thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1).max(1).saturating_sub(1).max(1)
        }
    }

    /// Runs iterative deepening up to `max_depth`, fanning out over
    /// `threads - 1` helper threads that share the transposition table
    /// with the calling thread. Returns the best move from the most
    /// complete depth the calling ("main") thread reached before `stop`
    /// was observed, and records full stats in `last_stats()`.
    pub fn find_best_move(&mut self, pos: &mut Position, max_depth: i8, stop: &AtomicBool) -> Option<Move> {
        self.tt.new_generation();
        let threads = self.worker_count();
        let config = self.config;

        let result = if threads <= 1 {
            let mut main_worker = Worker::new(config, &self.tt, stop);
            main_worker.iterative_deepening(pos, max_depth)
        } else {
            std::thread::scope(|scope| {
                for i in 1..threads {
                    let mut helper_pos = pos.clone();
                    let tt = &self.tt;
                    scope.spawn(move || {
                        let offset = (i % 2) as i8;
                        let mut helper = Worker::new_helper(config, tt, stop, offset);
                        helper.iterative_deepening(&mut helper_pos, max_depth);
                    });
                }

                let mut main_worker = Worker::new(config, &self.tt, stop);
                main_worker.iterative_deepening(pos, max_depth)
            })
        };

        self.last_stats = SearchStats {
            nodes: result.nodes,
            elapsed_ms: result.elapsed_ms,
            nps: result.nps,
            depth_completed: result.depth_completed,
            best_score: result.best_score,
            best_move: result.best_move.unwrap_or_default(),
            best_pv: result.best_pv,
            top_moves: result.top_moves,
        };

        result.best_move
    }

    pub fn last_stats(&self) -> &SearchStats {
        &self.last_stats
    }

    pub fn tt_cluster_count(&self) -> usize {
        self.tt.cluster_count()
    }

    pub fn new_game(&mut self) {
        self.tt.clear();
    }
}
