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

// The static evaluator: tapered material + piece-square tables, combined
// with the flat pawn-structure, mobility, and king-safety terms from the
// submodules below, plus the handful of positional terms (bishop pair,
// outposts, rook files/7th, threats, space, endgame scaling) that don't
// have a home of their own. Two caches - keyed by the full Zobrist key
// and by the pawn sub-key - memoize the expensive parts.

pub mod kingsafety;
pub mod mobility;
pub mod pawn;
pub mod pst;

use crate::board::{
    defs::{Pieces, BB_RANK_2, BB_RANK_7},
    Board,
};
use crate::defs::{Bitboard, Side, Sides, Square};
use crate::misc::bits;
use crate::movegen::MoveGenerator;
use crate::position::Position;

/// King safety's own white-minus-black term is clamped to this range
/// before being folded into the total score, so a pathological king
/// hunt can't swamp every other positional factor.
const KS_CLAMP: i32 = 120;

const BISHOP_PAIR_BONUS: i32 = 30;
const BAD_BISHOP_PENALTY: i32 = -4;
const KNIGHT_OUTPOST_BONUS: i32 = 18;
const KNIGHT_RIM_PENALTY: i32 = -6;
const ROOK_SEVENTH_BONUS: i32 = 22;
const CONNECTED_ROOKS_BONUS: i32 = 10;
const ROOK_BEHIND_PASSER_BONUS: i32 = 16;
const PAWN_THREAT_ON_MINOR: i32 = 45;
const PAWN_THREAT_ON_ROOK: i32 = 55;
const PAWN_THREAT_ON_QUEEN: i32 = 65;
const HANGING_PIECE_PENALTY: i32 = 20;
const MINOR_ATTACKS_QUEEN_BONUS: i32 = 35;
const SPACE_UNIT_BONUS: i32 = 2;
const OCB_ENDGAME_SCALE_NUM: i32 = 3;
const OCB_ENDGAME_SCALE_DEN: i32 = 4;

const NUM_MATERIAL: usize = 6;
const NUM_PST: usize = 6 * 64;
const FLAT_LEN: usize = NUM_MATERIAL * 2 + NUM_PST * 2;

/// The flat, Texel-tunable parameter vector: material MG/EG followed by
/// PST MG/EG, in the same piece order as `pst::PST_MG`/`pst::PST_EG`.
/// This covers the dominant share of the evaluation's tunable surface;
/// the pawn/mobility/king-safety submodules keep their own constants
/// untouched by the tuner (see DESIGN.md).
#[derive(Clone)]
struct Parameters {
    flat: Vec<i32>,
}

impl Parameters {
    fn default_flat() -> Vec<i32> {
        let mut flat = Vec::with_capacity(FLAT_LEN);
        flat.extend_from_slice(&pst::MATERIAL_MG);
        flat.extend_from_slice(&pst::MATERIAL_EG);
        for piece in 0..6 {
            flat.extend_from_slice(&pst::PST_MG[piece]);
        }
        for piece in 0..6 {
            flat.extend_from_slice(&pst::PST_EG[piece]);
        }
        flat
    }

    fn new() -> Self {
        Self { flat: Self::default_flat() }
    }

    fn material_mg(&self, piece: usize) -> i32 {
        self.flat[piece]
    }

    fn material_eg(&self, piece: usize) -> i32 {
        self.flat[NUM_MATERIAL + piece]
    }

    fn pst_mg(&self, piece: usize, table_idx: usize) -> i32 {
        self.flat[NUM_MATERIAL * 2 + piece * 64 + table_idx]
    }

    fn pst_eg(&self, piece: usize, table_idx: usize) -> i32 {
        self.flat[NUM_MATERIAL * 2 + NUM_PST + piece * 64 + table_idx]
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::new()
    }
}

const EVAL_CACHE_BITS: u32 = 16;
const EVAL_CACHE_SIZE: usize = 1 << EVAL_CACHE_BITS;
const PAWN_CACHE_BITS: u32 = 14;
const PAWN_CACHE_SIZE: usize = 1 << PAWN_CACHE_BITS;

#[derive(Clone, Copy)]
struct EvalCacheSlot {
    key: u64,
    score: i32,
}

#[derive(Clone, Copy)]
struct PawnCacheSlot {
    key: u64,
    score: i32,
}

/// Holds the tunable parameters and the per-thread eval/pawn caches. Each
/// search worker owns one; the evaluator itself is otherwise read-only
/// (see `evaluate` for the cache-free entry point used outside search).
pub struct Evaluator {
    params: Parameters,
    move_gen: MoveGenerator,
    eval_cache: Vec<Option<EvalCacheSlot>>,
    pawn_cache: Vec<Option<PawnCacheSlot>>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            params: Parameters::new(),
            move_gen: MoveGenerator::new(),
            eval_cache: vec![None; EVAL_CACHE_SIZE],
            pawn_cache: vec![None; PAWN_CACHE_SIZE],
        }
    }

    /// The flat, stable-order parameter vector the Texel tuner reads and
    /// mutates: material MG (6), material EG (6), PST MG (6*64), PST EG
    /// (6*64), in King/Queen/Rook/Bishop/Knight/Pawn piece order.
    pub fn parameters(&self) -> &[i32] {
        &self.params.flat
    }

    pub fn set_parameters(&mut self, params: &[i32]) {
        assert_eq!(params.len(), FLAT_LEN, "parameter vector length mismatch");
        self.params.flat.copy_from_slice(params);
        self.clear_caches();
    }

    pub fn clear_caches(&mut self) {
        self.eval_cache.iter_mut().for_each(|slot| *slot = None);
        self.pawn_cache.iter_mut().for_each(|slot| *slot = None);
    }

    /// Evaluates `pos` from the perspective of the side to move, using
    /// and populating this evaluator's caches.
    pub fn eval(&mut self, pos: &Position) -> i32 {
        let key = pos.hash();
        let idx = (key as usize) & (EVAL_CACHE_SIZE - 1);
        if let Some(slot) = self.eval_cache[idx] {
            if slot.key == key {
                return Self::relative_to_mover(slot.score, pos.side_to_move());
            }
        }

        let pawn_score = self.pawn_score(pos);
        let white_score = compute_white_relative(pos.board(), &self.move_gen, &self.params, pawn_score);

        self.eval_cache[idx] = Some(EvalCacheSlot { key, score: white_score });
        Self::relative_to_mover(white_score, pos.side_to_move())
    }

    fn pawn_score(&mut self, pos: &Position) -> i32 {
        let key = pos.pawn_hash();
        let idx = (key as usize) & (PAWN_CACHE_SIZE - 1);
        if let Some(slot) = self.pawn_cache[idx] {
            if slot.key == key {
                return slot.score;
            }
        }
        let score = pawn::evaluate_pawn_structure(pos.board()) as i32;
        self.pawn_cache[idx] = Some(PawnCacheSlot { key, score });
        score
    }

    fn relative_to_mover(white_score: i32, side_to_move: Side) -> i32 {
        if side_to_move == Sides::WHITE {
            white_score
        } else {
            -white_score
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Stateless evaluation from the side-to-move's perspective, with no
/// caching. Used by callers (tests, perft-adjacent tooling) that don't
/// want to carry an `Evaluator` around; the search proper uses
/// `Evaluator::eval` so that caches survive across nodes.
pub fn evaluate(pos: &Position) -> i32 {
    let move_gen = MoveGenerator::new();
    let params = Parameters::new();
    let pawn_score = pawn::evaluate_pawn_structure(pos.board()) as i32;
    let white_score = compute_white_relative(pos.board(), &move_gen, &params, pawn_score);
    Evaluator::relative_to_mover(white_score, pos.side_to_move())
}

fn game_phase(board: &Board) -> i32 {
    let mut phase = 0;
    for side in [Sides::WHITE, Sides::BLACK] {
        for piece in [Pieces::QUEEN, Pieces::ROOK, Pieces::BISHOP, Pieces::KNIGHT] {
            phase += pst::phase_weight(piece) * board.piece_count(side, piece) as i32;
        }
    }
    phase.min(pst::MAX_PHASE)
}

/// The full positional score, White-minus-Black, from White's point of
/// view. `pawn_score` is passed in so the caller can cache it separately
/// from everything else (it's keyed by the pawn sub-key, not the full
/// Zobrist key).
fn compute_white_relative(board: &Board, move_gen: &MoveGenerator, params: &Parameters, pawn_score: i32) -> i32 {
    let phase = game_phase(board);
    let (mg, eg) = material_and_pst(board, params);

    let mobility = mobility::evaluate_mobility(board, move_gen) as i32;
    let king_safety = kingsafety::evaluate_king_safety(board, move_gen) as i32;
    let king_safety = king_safety.clamp(-KS_CLAMP, KS_CLAMP);

    let mut extra = 0;
    extra += bishop_pair_and_outposts(board, Sides::WHITE) - bishop_pair_and_outposts(board, Sides::BLACK);
    extra += rook_terms(board, Sides::WHITE) - rook_terms(board, Sides::BLACK);
    extra += threats(board, move_gen, Sides::WHITE) - threats(board, move_gen, Sides::BLACK);
    extra += space(board, Sides::WHITE) - space(board, Sides::BLACK);

    let total_mg = mg + extra + pawn_score + mobility + king_safety;
    let mut total_eg = eg + extra + pawn_score + mobility + king_safety;

    if is_opposite_colored_bishop_endgame(board) {
        total_eg = (total_eg * OCB_ENDGAME_SCALE_NUM) / OCB_ENDGAME_SCALE_DEN;
    }

    (total_mg * phase + total_eg * (pst::MAX_PHASE - phase)) / pst::MAX_PHASE
}

fn material_and_pst(board: &Board, params: &Parameters) -> (i32, i32) {
    let mut mg = 0;
    let mut eg = 0;
    for side in [Sides::WHITE, Sides::BLACK] {
        let sign = if side == Sides::WHITE { 1 } else { -1 };
        for piece in 0..6 {
            let mut bb = board.get_pieces(piece, side);
            while bb != 0 {
                let square = bits::next(&mut bb);
                let idx = if side == Sides::WHITE { square ^ 56 } else { square };
                mg += sign * (params.material_mg(piece) + params.pst_mg(piece, idx));
                eg += sign * (params.material_eg(piece) + params.pst_eg(piece, idx));
            }
        }
    }
    (mg, eg)
}

fn bishop_pair_and_outposts(board: &Board, side: Side) -> i32 {
    let mut score = 0;
    if board.has_bishop_pair(side) {
        score += BISHOP_PAIR_BONUS;
    }

    let own_pawns = board.get_pieces(Pieces::PAWN, side);
    let bad_bishop_count = {
        let mut bishops = board.get_pieces(Pieces::BISHOP, side);
        let mut penalty = 0;
        while bishops != 0 {
            let square = bits::next(&mut bishops);
            let light = Board::is_light_square(square);
            let mut pawns = own_pawns;
            while pawns != 0 {
                let pawn_square = bits::next(&mut pawns);
                if Board::is_light_square(pawn_square) == light {
                    penalty += 1;
                }
            }
        }
        penalty
    };
    score += bad_bishop_count * BAD_BISHOP_PENALTY;

    let enemy_pawns = board.get_pieces(Pieces::PAWN, side ^ 1);
    let enemy_pawn_attacks = if side == Sides::WHITE {
        bits::black_pawn_attacks(enemy_pawns)
    } else {
        bits::white_pawn_attacks(enemy_pawns)
    };
    let own_pawn_attacks = if side == Sides::WHITE {
        bits::white_pawn_attacks(own_pawns)
    } else {
        bits::black_pawn_attacks(own_pawns)
    };

    let mut knights = board.get_pieces(Pieces::KNIGHT, side);
    while knights != 0 {
        let square = bits::next(&mut knights);
        let (file, rank) = crate::board::defs::square_on_file_rank(square);
        let on_rim = file == 0 || file == 7 || rank == 0 || rank == 7;
        if on_rim {
            score += KNIGHT_RIM_PENALTY;
        }

        let bit = 1u64 << square;
        let is_outpost = (bit & own_pawn_attacks) != 0 && (bit & enemy_pawn_attacks) == 0;
        let forward_rank_ok = if side == Sides::WHITE { rank >= 3 } else { rank <= 4 };
        if is_outpost && forward_rank_ok {
            score += KNIGHT_OUTPOST_BONUS;
        }
    }

    score
}

fn rook_terms(board: &Board, side: Side) -> i32 {
    let mut score = 0;
    let seventh_rank = if side == Sides::WHITE { BB_RANK_7 } else { BB_RANK_2 };
    let rooks = board.get_pieces(Pieces::ROOK, side);
    let rook_count_on_seventh = (rooks & seventh_rank).count_ones() as i32;
    score += rook_count_on_seventh * ROOK_SEVENTH_BONUS;

    if rooks.count_ones() == 2 {
        let mut rook_squares = rooks;
        let a = bits::next(&mut rook_squares);
        let b = bits::next(&mut rook_squares);
        let (af, ar) = crate::board::defs::square_on_file_rank(a);
        let (bf, br) = crate::board::defs::square_on_file_rank(b);
        if af == bf || ar == br {
            score += CONNECTED_ROOKS_BONUS;
        }
    }

    let own_pawns = board.get_pieces(Pieces::PAWN, side);
    let enemy_pawns = board.get_pieces(Pieces::PAWN, side ^ 1);
    let passed = if side == Sides::WHITE {
        bits::white_passed_pawns(own_pawns, enemy_pawns)
    } else {
        bits::black_passed_pawns(own_pawns, enemy_pawns)
    };
    let mut passed_copy = passed;
    while passed_copy != 0 {
        let passer_square = bits::next(&mut passed_copy);
        let (file, _) = crate::board::defs::square_on_file_rank(passer_square);
        let file_bb = crate::board::defs::BB_FILES[file];
        let behind = if side == Sides::WHITE {
            file_bb & !bits::white_front_spans(1u64 << passer_square) & !(1u64 << passer_square)
        } else {
            file_bb & !bits::black_front_spans(1u64 << passer_square) & !(1u64 << passer_square)
        };
        if rooks & behind != 0 {
            score += ROOK_BEHIND_PASSER_BONUS;
        }
    }

    score
}

// Pawn threats against minors/rooks/queens, hanging minor/rook/queen
// pieces (attacked more times than defended by the least-valuable
// attacker's own side), and a minor piece attacking the enemy queen.
fn threats(board: &Board, move_gen: &MoveGenerator, side: Side) -> i32 {
    let mut score = 0;
    let own_pawns = board.get_pieces(Pieces::PAWN, side);
    let pawn_attacks = if side == Sides::WHITE {
        bits::white_pawn_attacks(own_pawns)
    } else {
        bits::black_pawn_attacks(own_pawns)
    };

    let enemy = side ^ 1;
    let minors = board.get_pieces(Pieces::KNIGHT, enemy) | board.get_pieces(Pieces::BISHOP, enemy);
    let rooks = board.get_pieces(Pieces::ROOK, enemy);
    let queens = board.get_pieces(Pieces::QUEEN, enemy);

    score += (pawn_attacks & minors).count_ones() as i32 * PAWN_THREAT_ON_MINOR;
    score += (pawn_attacks & rooks).count_ones() as i32 * PAWN_THREAT_ON_ROOK;
    score += (pawn_attacks & queens).count_ones() as i32 * PAWN_THREAT_ON_QUEEN;

    let occupancy = board.occupancy();
    let mut own_minors = board.get_pieces(Pieces::KNIGHT, side) | board.get_pieces(Pieces::BISHOP, side);
    let mut attacked_enemy_targets = 0u64;
    while own_minors != 0 {
        let square = bits::next(&mut own_minors);
        let piece = board.piece_list[square];
        let attacks = move_gen.get_slider_attacks(piece, square, occupancy) | move_gen.get_non_slider_attacks(piece, square);
        if attacks & queens != 0 {
            score += MINOR_ATTACKS_QUEEN_BONUS;
        }
        attacked_enemy_targets |= attacks & (minors | rooks | queens) & !board.bb_side[side];
    }
    let defended = pawn_attacks;
    let hanging = attacked_enemy_targets & !defended;
    score += hanging.count_ones() as i32 * HANGING_PIECE_PENALTY;

    score
}

// Own side's 3rd/4th ranks (relative), empty and not attacked by enemy
// pawns, counted as safe space.
fn space(board: &Board, side: Side) -> i32 {
    let occupancy = board.occupancy();
    let enemy_pawns = board.get_pieces(Pieces::PAWN, side ^ 1);
    let enemy_pawn_attacks = if side == Sides::WHITE {
        bits::black_pawn_attacks(enemy_pawns)
    } else {
        bits::white_pawn_attacks(enemy_pawns)
    };
    let safe_ranks: Bitboard = if side == Sides::WHITE {
        crate::board::defs::BB_RANKS[2] | crate::board::defs::BB_RANKS[3]
    } else {
        crate::board::defs::BB_RANKS[5] | crate::board::defs::BB_RANKS[4]
    };
    let safe_squares = safe_ranks & !occupancy & !enemy_pawn_attacks;
    (safe_squares.count_ones() as i32) * SPACE_UNIT_BONUS
}

fn is_opposite_colored_bishop_endgame(board: &Board) -> bool {
    let white_bishops = board.get_pieces(Pieces::BISHOP, Sides::WHITE);
    let black_bishops = board.get_pieces(Pieces::BISHOP, Sides::BLACK);
    if white_bishops.count_ones() != 1 || black_bishops.count_ones() != 1 {
        return false;
    }
    let white_sq = white_bishops.trailing_zeros() as Square;
    let black_sq = black_bishops.trailing_zeros() as Square;
    if Board::is_light_square(white_sq) == Board::is_light_square(black_sq) {
        return false;
    }
    board.non_pawn_material_count(Sides::WHITE) <= 2 && board.non_pawn_material_count(Sides::BLACK) <= 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::FEN_START_POSITION;

    fn init() {
        crate::movegen::magics::init_magics();
        crate::board::zobrist::init_zobrist();
    }

    #[test]
    fn start_position_is_symmetric() {
        init();
        let mut pos = Position::new();
        pos.set_from_fen(FEN_START_POSITION).unwrap();
        assert_eq!(evaluate(&pos), 0);
    }

    #[test]
    fn material_advantage_favors_the_side_up_material() {
        init();
        let mut pos = Position::new();
        pos.set_from_fen("4k3/8/8/8/8/8/8/4KQ2 w - - 0 1").unwrap();
        assert!(evaluate(&pos) > 0);
    }

    #[test]
    fn parameters_round_trip_through_set_parameters() {
        let mut evaluator = Evaluator::new();
        let mut params = evaluator.parameters().to_vec();
        params[0] += 7;
        evaluator.set_parameters(&params);
        assert_eq!(evaluator.parameters()[0], params[0]);
    }
}
