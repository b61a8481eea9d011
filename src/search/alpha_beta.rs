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

// Iterative deepening at the root, PVS negamax, and quiescence. One
// `Worker` is built per search thread; it owns everything about the
// search except the transposition table and the shared stop flag, which
// it only ever touches through `&TT`/`&AtomicBool` (see module docs on
// `Engine::find_best_move`).

use super::defs::{lmr_table, LmrTable, SearchLocal, MAX_PLY};
use super::time::Clock;
use crate::board::defs::PIECE_VALUES;
use crate::defs::SearchBounds;
use crate::engine::defs::{EngineConfig, HashFlag, SearchData, TT};
use crate::evaluation::Evaluator;
use crate::movegen::defs::{Move, MoveList, MoveType};
use crate::movegen::MoveGenerator;
use crate::position::Position;
use std::sync::atomic::{AtomicBool, Ordering};

const STOP_CHECK_MASK: u64 = 1023;

// Quiet checks are only worth the extra do_move/undo_move probe near the
// root of the quiescence tree; further down, a quiet check that doesn't
// win material is very unlikely to change the outcome and the branching
// factor cost isn't worth it.
const QSEARCH_QUIET_CHECK_PLY_MAX: usize = 2;

/// Everything returned from one `find_best_move` call, before it's copied
/// into the engine's public `SearchStats`.
pub struct RootResult {
    pub best_move: Option<Move>,
    pub best_score: i32,
    pub best_pv: Vec<Move>,
    pub depth_completed: i8,
    pub nodes: u64,
    pub elapsed_ms: u128,
    pub nps: u64,
    pub top_moves: Vec<(Move, i32)>,
}

pub struct Worker<'a> {
    config: EngineConfig,
    tt: &'a TT,
    move_gen: MoveGenerator,
    evaluator: Evaluator,
    stop: &'a AtomicBool,
    local: SearchLocal,
    lmr: &'static LmrTable,
    clock: Clock,
    depth_skip_offset: i8,
}

impl<'a> Worker<'a> {
    pub fn new(config: EngineConfig, tt: &'a TT, stop: &'a AtomicBool) -> Self {
        Self {
            lmr: lmr_table(config.lmr_base as f64 / 100.0 + 0.33, 3.6),
            config,
            tt,
            move_gen: MoveGenerator::new(),
            evaluator: Evaluator::new(),
            stop,
            local: SearchLocal::new(),
            clock: Clock::start(),
            depth_skip_offset: 0,
        }
    }

    /// Builds a helper-thread worker that skips every other depth,
    /// staggered by `offset`, so lazy-SMP helpers diverge from the main
    /// thread's search order instead of duplicating it exactly.
    pub fn new_helper(config: EngineConfig, tt: &'a TT, stop: &'a AtomicBool, offset: i8) -> Self {
        let mut worker = Self::new(config, tt, stop);
        worker.depth_skip_offset = offset;
        worker
    }

    fn should_stop(&self) -> bool {
        self.local.nodes & STOP_CHECK_MASK == 0 && self.stop.load(Ordering::Relaxed)
    }

    /// Runs iterative deepening from depth 1 to `max_depth`, respecting
    /// `stop` between (and, approximately, within) depths. Returns the
    /// best move and stats from the last fully completed depth.
    pub fn iterative_deepening(&mut self, pos: &mut Position, max_depth: i8) -> RootResult {
        self.clock = Clock::start();
        let mut best_move = None;
        let mut best_score = 0;
        let mut best_pv = Vec::new();
        let mut depth_completed = 0;
        let mut top_moves = Vec::new();

        let mut window = self.config.aspiration_window;
        let mut prev_score = 0;

        for depth in 1..=max_depth.max(1) {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }

            if depth > 1 && self.depth_skip_offset != 0 && (depth + self.depth_skip_offset) % 2 == 0 {
                continue;
            }

            let (alpha, beta) = if depth > 1 && self.config.use_aspiration {
                (prev_score - window, prev_score + window)
            } else {
                (-SearchBounds::INF, SearchBounds::INF)
            };

            let result = self.search_root(pos, depth, alpha, beta);
            if self.stop.load(Ordering::Relaxed) && result.is_none() {
                break;
            }

            let Some((score, moves)) = result else { break };

            // Aspiration re-search: widen and retry at the same depth.
            let mut score = score;
            let mut moves = moves;
            if self.config.use_aspiration && (score <= alpha || score >= beta) {
                let mut widened = window;
                loop {
                    if self.stop.load(Ordering::Relaxed) {
                        break;
                    }
                    widened *= 2;
                    let (a, b) = if score <= alpha {
                        (prev_score - widened, SearchBounds::INF)
                    } else {
                        (-SearchBounds::INF, prev_score + widened)
                    };
                    match self.search_root(pos, depth, a, b) {
                        Some((s, m)) if s > a && s < b => {
                            score = s;
                            moves = m;
                            break;
                        }
                        Some((s, m)) => {
                            score = s;
                            moves = m;
                            if widened >= SearchBounds::INF {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }

            if self.stop.load(Ordering::Relaxed) {
                break;
            }

            prev_score = score;
            window = self.config.aspiration_window;
            best_score = score;
            best_pv = self.local.pv.line(0).to_vec();
            best_move = best_pv.first().copied().or_else(|| moves.first().map(|(m, _)| *m));
            top_moves = moves;
            depth_completed = depth;
        }

        RootResult {
            best_move,
            best_score,
            best_pv,
            depth_completed,
            nodes: self.local.nodes,
            elapsed_ms: self.clock.elapsed_ms(),
            nps: self.clock.nps(self.local.nodes),
            top_moves,
        }
    }

    /// One root search at `depth` within `[alpha, beta]`. Returns `None`
    /// if stopped before any root move completed.
    fn search_root(&mut self, pos: &mut Position, depth: i8, alpha: i32, beta: i32) -> Option<(i32, Vec<(Move, i32)>)> {
        self.local.pv.clear(0);
        let legal = self.move_gen.generate_legal(pos);
        if legal.is_empty() {
            return Some((if pos.in_check() { -SearchBounds::MATE } else { SearchBounds::STALEMATE }, Vec::new()));
        }

        let tt_move = self.tt.probe(pos.hash(), 0).map(|d| d.best_move);
        let ordered = self.order_root_moves(pos, &legal, tt_move);

        let mut alpha = alpha;
        let mut best_score = -SearchBounds::INF;
        let mut scored = Vec::with_capacity(ordered.len());
        let mut any_completed = false;

        for (index, m) in ordered.iter().enumerate() {
            if !pos.do_move(*m) {
                continue;
            }

            // Only the leading `full_rescore_top_k` root moves (by move
            // ordering) get the expensive full-window re-search on a
            // null-window fail-high; moves ordered further back are very
            // unlikely to be best, so their null-window value is kept as
            // an approximation to save the re-search.
            let score = if index == 0 {
                -self.negamax(pos, depth - 1, -beta, -alpha, 1, true)
            } else {
                let null_window = -self.negamax(pos, depth - 1, -alpha - 1, -alpha, 1, false);
                if null_window > alpha && null_window < beta && index < self.config.full_rescore_top_k {
                    -self.negamax(pos, depth - 1, -beta, -alpha, 1, true)
                } else {
                    null_window
                }
            };

            pos.undo_move();

            if self.stop.load(Ordering::Relaxed) && !any_completed {
                return None;
            }

            scored.push((*m, score));
            any_completed = true;

            if score > best_score {
                best_score = score;
                if score > alpha {
                    alpha = score;
                    self.local.pv.clear(0);
                    self.local.pv.update(0, *m);
                }
            }

            if alpha >= beta {
                break;
            }

            if self.stop.load(Ordering::Relaxed) {
                break;
            }
        }

        scored.sort_by(|a, b| b.1.cmp(&a.1));
        Some((best_score, scored))
    }

    /// PVS negamax. Returns a score in `[-INF, INF]`, relative to the
    /// side to move at `pos`.
    #[allow(clippy::too_many_arguments)]
    fn negamax(&mut self, pos: &mut Position, mut depth: i8, mut alpha: i32, beta: i32, ply: usize, is_pv: bool) -> i32 {
        self.local.pv.clear(ply);
        self.local.nodes += 1;
        if self.should_stop() {
            return 0;
        }

        if ply > 0 && pos.is_draw() {
            return SearchBounds::DRAW;
        }

        if depth <= 0 {
            return self.quiescence(pos, alpha, beta, ply);
        }

        let in_check = pos.in_check();
        if in_check {
            depth += 1;
        }

        let key = pos.hash();
        let tt_entry = self.tt.probe(key, ply as i32);
        let mut tt_move = Move::default();
        if let Some(entry) = tt_entry {
            tt_move = entry.best_move;
            if entry.depth as i8 >= depth && !is_pv {
                let cutoff = match entry.bound {
                    HashFlag::Exact => true,
                    HashFlag::Lower => entry.value >= beta,
                    HashFlag::Upper => entry.value <= alpha,
                };
                if cutoff {
                    return entry.value;
                }
            }
        }

        let static_eval = tt_entry.map(|e| e.static_eval).unwrap_or_else(|| self.evaluator.eval(pos));

        if !is_pv && !in_check {
            if self.config.use_reverse_futility && depth <= 8 {
                let margin = 80 * depth as i32;
                if static_eval - margin >= beta {
                    return static_eval;
                }
            }

            if self.config.use_null_move
                && depth >= 2
                && static_eval >= beta
                && pos.board().non_pawn_material_count(pos.side_to_move()) > 0
            {
                let reduction = 3 + depth / 4;
                pos.do_null();
                let score = -self.negamax(pos, depth - 1 - reduction, -beta, -beta + 1, ply + 1, false);
                pos.undo_null();
                if self.stop.load(Ordering::Relaxed) {
                    return 0;
                }
                if score >= beta && score.abs() < SearchBounds::MATE_THRESHOLD {
                    return beta;
                }
            }

            if self.config.use_probcut && depth >= 5 {
                let probcut_beta = beta + 160;
                let mut captures = MoveList::new();
                self.move_gen.generate_into(pos, MoveType::Captures, &mut captures);
                for i in 0..captures.len() {
                    let m = captures.get_move(i);
                    if !pos.see_non_negative(m) {
                        continue;
                    }
                    if !pos.do_move(m) {
                        continue;
                    }
                    let score = -self.negamax(pos, depth - 4, -probcut_beta, -probcut_beta + 1, ply + 1, false);
                    pos.undo_move();
                    if self.stop.load(Ordering::Relaxed) {
                        return 0;
                    }
                    if score >= probcut_beta {
                        return score;
                    }
                }
            }
        }

        if self.config.use_iid && tt_move.is_null() && depth >= 5 && is_pv {
            self.negamax(pos, depth - 2, alpha, beta, ply, is_pv);
            if let Some(entry) = self.tt.probe(key, ply as i32) {
                tt_move = entry.best_move;
            }
        }

        let mut pseudo_legal = MoveList::new();
        self.move_gen.generate_into(pos, MoveType::All, &mut pseudo_legal);

        let mut best_score = -SearchBounds::INF;
        let mut best_move = Move::default();
        let mut moves_played = 0usize;
        let side = pos.side_to_move();
        let prev_move = if ply > 0 { self.last_move(pos) } else { None };
        let followup_move = self.followup_move(pos);
        let counter = prev_move.map(|(pf, pt)| self.local.counter_moves.get(side, pf, pt));
        let followup = followup_move.map(|(ff, ft)| self.local.followup_moves.get(side, ff, ft));
        let ordered = self.order_moves(pos, &pseudo_legal, tt_move, ply, counter, followup);

        // Singular extension: the TT move is searched at the root of its
        // own subtree against a lowered bound with every sibling; if all
        // siblings fail low, the TT move is the only move worth playing
        // and gets extended by one ply when it's actually searched below.
        let mut singular_move = Move::default();
        if self.config.use_singular_ext && is_pv && !tt_move.is_null() && depth >= 6 {
            if let Some(entry) = tt_entry {
                if entry.bound == HashFlag::Exact && entry.depth as i8 >= depth - 3 {
                    let singular_beta = entry.value - 2 * depth as i32;
                    let reduced_depth = (depth - 1) / 2;
                    let mut fails_low = true;
                    for scored in ordered.iter() {
                        let m = scored.mv;
                        if m == tt_move {
                            continue;
                        }
                        if !pos.do_move(m) {
                            continue;
                        }
                        let score = -self.negamax(pos, reduced_depth, -singular_beta - 1, -singular_beta, ply + 1, false);
                        pos.undo_move();
                        if self.stop.load(Ordering::Relaxed) {
                            return 0;
                        }
                        if score >= singular_beta {
                            fails_low = false;
                            break;
                        }
                    }
                    if fails_low {
                        singular_move = tt_move;
                    }
                }
            }
        }

        let mut quiet_count = 0usize;
        for scored in ordered.iter() {
            let m = scored.mv;
            let is_quiet = !m.is_tactical();
            if is_quiet {
                quiet_count += 1;
            }

            if !is_pv
                && moves_played > 0
                && is_quiet
                && !in_check
                && self.config.use_threat_signals
                && depth <= self.config.threat_signals_depth_max
                && quiet_count as i32 > self.config.threat_signals_quiet_cap
                && self.local.history.get(side, m.from(), m.to()) < self.config.threat_signals_hist_min
                && !self.is_killer(ply, m)
            {
                continue;
            }

            if !is_pv
                && moves_played > 0
                && is_quiet
                && !in_check
                && self.config.use_lmp
                && depth <= self.config.lmp_depth_max
                && moves_played as i32 >= self.config.lmp_base + depth as i32 * depth as i32
                && !self.is_killer(ply, m)
            {
                continue;
            }

            if !is_pv
                && moves_played > 0
                && is_quiet
                && !in_check
                && self.config.use_futility
                && depth == 1
                && static_eval + self.config.futility_margin <= alpha
            {
                continue;
            }

            if !is_pv
                && self.config.use_see_pruning
                && m.is_capture()
                && depth <= 6
                && !pos.see_non_negative(m)
            {
                continue;
            }

            if !pos.do_move(m) {
                continue;
            }

            moves_played += 1;

            let extension: i8 = if m == singular_move { 1 } else { 0 };

            let mut reduction = 0i8;
            if self.config.use_lmr
                && moves_played > 1
                && is_quiet
                && !in_check
                && depth >= 2
                && !self.is_killer(ply, m)
                && m != tt_move
            {
                reduction = self.lmr.reduction(depth, moves_played);
                let hist = self.local.history.get(side, m.from(), m.to());
                if hist > 4000 {
                    reduction = (reduction - 1).max(0);
                }
                reduction = reduction.min(self.config.lmr_max);
            }

            let score = if moves_played == 1 {
                -self.negamax(pos, depth - 1 + extension, -beta, -alpha, ply + 1, is_pv)
            } else {
                let reduced_depth = depth - 1 + extension - reduction;
                let mut s = -self.negamax(pos, reduced_depth, -alpha - 1, -alpha, ply + 1, false);
                if s > alpha && reduction > 0 {
                    s = -self.negamax(pos, depth - 1, -alpha - 1, -alpha, ply + 1, false);
                }
                if s > alpha && s < beta {
                    s = -self.negamax(pos, depth - 1, -beta, -alpha, ply + 1, true);
                }
                s
            };

            pos.undo_move();

            if self.stop.load(Ordering::Relaxed) {
                return 0;
            }

            if score > best_score {
                best_score = score;
                best_move = m;
                if score > alpha {
                    alpha = score;
                    self.local.pv.update(ply, m);
                }
            }

            if alpha >= beta {
                if is_quiet {
                    self.local.killers.update(ply, m);
                    self.local.history.update(side, m.from(), m.to(), depth);
                    if let Some((pf, pt)) = prev_move {
                        self.local.counter_moves.update(side, pf, pt, m);
                    }
                    if let Some((ff, ft)) = followup_move {
                        self.local.followup_moves.update(side, ff, ft, m);
                    }
                }
                break;
            }
        }

        if moves_played == 0 {
            return if in_check { -SearchBounds::MATE + ply as i32 } else { SearchBounds::STALEMATE };
        }

        let bound = if best_score >= beta {
            HashFlag::Lower
        } else if best_score > alpha {
            HashFlag::Exact
        } else {
            HashFlag::Upper
        };
        self.tt.store(key, best_score, depth.max(0) as u8, bound, best_move, static_eval, ply as i32);

        best_score
    }

    fn quiescence(&mut self, pos: &mut Position, mut alpha: i32, beta: i32, ply: usize) -> i32 {
        self.local.nodes += 1;
        if self.should_stop() {
            return 0;
        }
        if pos.is_draw() {
            return SearchBounds::DRAW;
        }

        // In check, there is no stand-pat: a side in check might be
        // getting mated, so every evasion has to be searched rather than
        // only captures.
        let in_check = pos.in_check();

        let mut stand = -SearchBounds::INF;
        if !in_check {
            stand = self.evaluator.eval(pos);
            if stand >= beta {
                return beta;
            }
            if stand > alpha {
                alpha = stand;
            }
        }
        if ply >= MAX_PLY - 1 {
            return if in_check { alpha } else { stand.max(alpha) };
        }

        let mut candidates = MoveList::new();
        if in_check {
            self.move_gen.generate_into(pos, MoveType::All, &mut candidates);
        } else {
            self.move_gen.generate_into(pos, MoveType::Captures, &mut candidates);
            if self.config.qsearch_quiet_checks && ply <= QSEARCH_QUIET_CHECK_PLY_MAX {
                self.add_quiet_checks(pos, &mut candidates);
            }
        }
        let ordered = if in_check {
            self.order_moves(pos, &candidates, Move::default(), ply, None, None)
        } else {
            self.order_captures(pos, &candidates)
        };

        let mut moves_played = 0usize;
        for scored in ordered.iter() {
            let m = scored.mv;
            if !in_check {
                if scored.score < 0 {
                    continue;
                }
                if stand + scored.score + 200 < alpha {
                    continue;
                }
            }
            if !pos.do_move(m) {
                continue;
            }
            moves_played += 1;
            let score = -self.quiescence(pos, -beta, -alpha, ply + 1);
            pos.undo_move();

            if self.stop.load(Ordering::Relaxed) {
                return 0;
            }

            if score >= beta {
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
        }

        if in_check && moves_played == 0 {
            return -SearchBounds::MATE + ply as i32;
        }

        alpha
    }

    // -------------------------------------------------------------
    // Move ordering
    // -------------------------------------------------------------

    fn last_move(&self, pos: &Position) -> Option<(usize, usize)> {
        pos.move_played(1).map(|m| (m.from(), m.to()))
    }

    fn followup_move(&self, pos: &Position) -> Option<(usize, usize)> {
        pos.move_played(2).map(|m| (m.from(), m.to()))
    }

    fn is_killer(&self, ply: usize, m: Move) -> bool {
        let k = self.local.killers.get(ply);
        k[0] == m || k[1] == m
    }

    fn mvv_lva(m: Move) -> i32 {
        PIECE_VALUES[m.captured()] * 100 - PIECE_VALUES[m.piece()]
    }

    fn order_root_moves(&mut self, pos: &mut Position, legal: &MoveList, tt_move: Option<Move>) -> Vec<Move> {
        let mut moves: Vec<(Move, i32)> = legal
            .iter()
            .map(|m| (*m, self.root_order_score(pos, *m, tt_move)))
            .collect();
        moves.sort_by(|a, b| b.1.cmp(&a.1));
        moves.into_iter().map(|(m, _)| m).collect()
    }

    fn root_order_score(&self, pos: &Position, m: Move, tt_move: Option<Move>) -> i32 {
        if Some(m) == tt_move {
            return i32::MAX;
        }
        if m.is_capture() {
            return 1_000_000 + Self::mvv_lva(m) + if pos.see_non_negative(m) { 500 } else { -500 };
        }
        if m.is_promotion() {
            return 900_000 + PIECE_VALUES[m.promoted()];
        }
        0
    }

    fn order_moves(
        &self,
        pos: &Position,
        pseudo_legal: &MoveList,
        tt_move: Move,
        ply: usize,
        counter_move: Option<Move>,
        followup_move: Option<Move>,
    ) -> Vec<ScoredMove> {
        let killers = self.local.killers.get(ply);
        let side = pos.side_to_move();
        let mut moves: Vec<ScoredMove> = pseudo_legal
            .iter()
            .map(|m| {
                let m = *m;
                let score = if m == tt_move {
                    2_000_000
                } else if m.is_capture() {
                    1_000_000 + Self::mvv_lva(m) + if pos.see_non_negative(m) { 500 } else { -10_000 }
                } else if m.is_promotion() {
                    900_000 + PIECE_VALUES[m.promoted()]
                } else if m == killers[0] {
                    800_000
                } else if m == killers[1] {
                    799_000
                } else if counter_move == Some(m) && !m.is_null() {
                    700_000
                } else if followup_move == Some(m) && !m.is_null() {
                    650_000
                } else {
                    self.local.history.get(side, m.from(), m.to())
                };
                ScoredMove { mv: m, score }
            })
            .collect();
        moves.sort_by(|a, b| b.score.cmp(&a.score));
        moves
    }

    // Appends quiet (non-capture, non-promotion) moves that give check to
    // `candidates`: probed with a do_move/undo_move round trip since
    // "does this move give check" isn't answerable from the pseudo-legal
    // bitboards alone without replaying the move.
    fn add_quiet_checks(&self, pos: &mut Position, candidates: &mut MoveList) {
        let mut quiets = MoveList::new();
        self.move_gen.generate_into(pos, MoveType::All, &mut quiets);
        for m in quiets.iter() {
            if m.is_capture() || m.is_promotion() {
                continue;
            }
            if !pos.do_move(*m) {
                continue;
            }
            let gives_check = pos.in_check();
            pos.undo_move();
            if gives_check {
                candidates.push(*m);
            }
        }
    }

    fn order_captures(&self, pos: &Position, captures: &MoveList) -> Vec<ScoredMove> {
        let mut moves: Vec<ScoredMove> = captures
            .iter()
            .map(|m| {
                let m = *m;
                ScoredMove { mv: m, score: pos.see(m) }
            })
            .collect();
        moves.sort_by(|a, b| b.score.cmp(&a.score));
        moves
    }
}

struct ScoredMove {
    mv: Move,
    score: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::zobrist;
    use crate::engine::transposition::TT;
    use crate::movegen::magics;
    use std::sync::atomic::AtomicBool;

    fn init() {
        magics::init_magics();
        zobrist::init_zobrist();
    }

    fn search(fen: &str, depth: i8) -> RootResult {
        init();
        let mut pos = Position::new();
        pos.set_from_fen(fen).unwrap();
        let tt = TT::new(1);
        let stop = AtomicBool::new(false);
        let mut worker = Worker::new(EngineConfig::default(), &tt, &stop);
        worker.iterative_deepening(&mut pos, depth)
    }

    // Black king h8, white king g6 confines g7/h7, white rook a1 mates
    // by checking along the back rank: Ra1-a8#.
    #[test]
    fn finds_mate_in_one_with_king_and_rook() {
        let result = search("7k/8/6K1/8/8/8/8/R7 w - - 0 1", 3);
        assert!(result.best_score > SearchBounds::MATE_THRESHOLD);
        assert_eq!(result.best_score, SearchBounds::MATE - 1);
        let mv = result.best_move.expect("a mating move must be found");
        assert_eq!(mv.to(), 56); // a8
    }

    #[test]
    fn reports_stalemate_as_zero_score_with_no_move() {
        // Black to move, king on a8, no legal moves, not in check.
        let result = search("k7/2Q5/1K6/8/8/8/8/8 b - - 0 1", 2);
        assert_eq!(result.best_score, 0);
        assert!(result.best_move.is_none());
    }

    #[test]
    fn threefold_repetition_scores_as_draw_at_root() {
        init();
        let mut pos = Position::new();
        pos.set_from_fen(crate::defs::FEN_START_POSITION).unwrap();
        for uci in ["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8"] {
            pos.apply_uci_move(uci).unwrap();
        }
        assert!(pos.threefold_repetition());

        let tt = TT::new(1);
        let stop = AtomicBool::new(false);
        let mut worker = Worker::new(EngineConfig::default(), &tt, &stop);
        let result = worker.iterative_deepening(&mut pos, 2);
        assert_eq!(result.best_score, 0);
    }

    // 8/8/8/2k5/3Pp3/8/8/4K3 b - d3 0 1: black's e4 pawn may legally
    // capture en passant on d3.
    #[test]
    fn en_passant_capture_is_legal_without_a_pin() {
        init();
        let mut pos = Position::new();
        pos.set_from_fen("8/8/8/2k5/3Pp3/8/8/4K3 b - d3 0 1").unwrap();
        assert!(pos.apply_uci_move("e4d3").is_ok());
    }

    // Replacing the empty c5 square with a white rook on a4 pins the
    // black e4 pawn to its king along the 4th rank once d4 and the
    // captured pawn both leave the rank; exd3 must be rejected.
    #[test]
    fn en_passant_capture_is_illegal_when_it_exposes_the_king() {
        init();
        let mut pos = Position::new();
        pos.set_from_fen("8/8/8/8/R2Pp2k/8/8/4K3 b - d3 0 1").unwrap();
        assert!(pos.apply_uci_move("e4d3").is_err());
    }
}
