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

// Owns a Board plus everything about the game that isn't "where are the
// pieces": side to move, rights, the move/undo history, and the
// incrementally-maintained Zobrist keys. A search worker clones its own
// Position off the root once and then only ever mutates it through
// do_move/undo_move/do_null/undo_null - nothing here is shared between
// threads.

use crate::board::defs::{Pieces, BB_SQUARES, PIECE_CHAR_LOWERCASE, PIECE_CHAR_UPPERCASE, PIECE_VALUES};
use crate::board::gamestate::GameState;
use crate::board::history::History;
use crate::board::zobrist::{self, ZobristKey};
use crate::board::Board;
use crate::defs::{Bitboard, Castling, Piece, Side, Sides, Square, EMPTY, NO_SQUARE};
use crate::misc::bits;
use crate::misc::parse;
use crate::movegen::defs::Move;
use crate::movegen::magics;

/// History record pushed on `do_move`, popped on `undo_move`. Carries
/// everything `undo_move` needs to reverse a move bit-for-bit: the whole
/// prior GameState (cheap to copy, see GameState's own doc comment) plus
/// what was captured, since the board itself no longer knows that once
/// the capturing move has been applied.
#[derive(Clone, Copy, Default)]
pub struct StateInfo {
    pub prev_state: GameState,
    pub mv: Move,
    pub captured_piece: Piece,
    pub captured_square: Square,
}

/// History record pushed on `do_null`, popped on `undo_null`.
#[derive(Clone, Copy, Default)]
pub struct NullState {
    pub prev_en_passant: Option<u8>,
    pub prev_castling: u8,
}

pub struct Position {
    board: Board,
    state: GameState,
    history: History<StateInfo>,
    null_history: History<NullState>,
}

impl Position {
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            state: GameState::new(),
            history: History::new(),
            null_history: History::new(),
        }
    }

    /// Sized for a search worker's cloned position: a shorter history
    /// buffer than the main game uses, since a worker never needs more
    /// than the root game history plus its own search depth.
    pub fn new_for_search() -> Self {
        Self {
            board: Board::new(),
            state: GameState::new(),
            history: History::new_for_search(),
            null_history: History::new_for_search(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn game_state(&self) -> &GameState {
        &self.state
    }

    pub fn side_to_move(&self) -> Side {
        self.state.active_color as Side
    }

    pub fn hash(&self) -> ZobristKey {
        self.state.zobrist_key
    }

    pub fn pawn_hash(&self) -> ZobristKey {
        self.state.pawn_key
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn ply_from_root(&self) -> usize {
        self.history.len()
    }

    /// The move that was played `plies_ago` half-moves back (1 = the
    /// opponent's last move, 2 = this side's own previous move), or
    /// `None` if the history doesn't go back that far or a null move
    /// sits at that slot.
    pub fn move_played(&self, plies_ago: usize) -> Option<Move> {
        if plies_ago == 0 || plies_ago > self.history.len() {
            return None;
        }
        let mv = self.history.get_ref(self.history.len() - plies_ago).mv;
        if mv.is_null() {
            None
        } else {
            Some(mv)
        }
    }

    // -------------------------------------------------------------
    // Attacks
    // -------------------------------------------------------------

    /// The union of every square from which a piece of color `by` attacks
    /// `sq`, given `occ`. The single routine behind both `is_attacked` and
    /// SEE's attacker search: computing "what attacks this square" once
    /// and reusing it avoids the two routines silently drifting apart.
    pub fn attacks_to(&self, sq: Square, by: Side, occ: Bitboard) -> Bitboard {
        let board = &self.board;
        let pawns = board.get_pieces(Pieces::PAWN, by) & magics::pawn_attacks(by ^ 1, sq);
        let knights = board.get_pieces(Pieces::KNIGHT, by) & magics::knight_attacks(sq);
        let kings = board.get_pieces(Pieces::KING, by) & magics::king_attacks(sq);
        let diagonal_sliders = board.get_pieces(Pieces::BISHOP, by) | board.get_pieces(Pieces::QUEEN, by);
        let straight_sliders = board.get_pieces(Pieces::ROOK, by) | board.get_pieces(Pieces::QUEEN, by);
        let bishop_rays = magics::bishop_attacks(sq, occ) & diagonal_sliders;
        let rook_rays = magics::rook_attacks(sq, occ) & straight_sliders;

        pawns | knights | kings | bishop_rays | rook_rays
    }

    pub fn is_attacked(&self, sq: Square, by: Side) -> bool {
        self.is_attacked_with_occupancy(sq, by, self.board.occupancy())
    }

    pub fn is_attacked_with_occupancy(&self, sq: Square, by: Side, occ: Bitboard) -> bool {
        self.attacks_to(sq, by, occ) != EMPTY
    }

    pub fn in_check(&self) -> bool {
        let side = self.side_to_move();
        self.is_attacked(self.board.king_square(side), side ^ 1)
    }

    // -------------------------------------------------------------
    // Make / unmake
    // -------------------------------------------------------------

    /// Applies `m`. Returns false (and leaves the position exactly as it
    /// was) iff the mover's own king ends up attacked - the generator
    /// produces pseudo-legal moves, so the caller is expected to try this
    /// and discard the move on a false return rather than pre-filtering.
    pub fn do_move(&mut self, m: Move) -> bool {
        let prev_state = self.state;
        let side = self.side_to_move();
        let opponent = side ^ 1;
        let from = m.from();
        let to = m.to();
        let piece = m.piece();

        let mut captured_piece = Pieces::NONE;
        let mut captured_square = NO_SQUARE;

        let z = zobrist::zobrist();

        // 1. Clear EP file from hash, clear ep_square.
        self.state.zobrist_key ^= z.en_passant(self.state.ep_square_option());
        self.state.en_passant = None;

        // 2. Remove a captured piece, including EP captures.
        if m.is_en_passant() {
            captured_piece = Pieces::PAWN;
            captured_square = if side == Sides::WHITE { to - 8 } else { to + 8 };
            self.board.remove_piece(opponent, Pieces::PAWN, captured_square);
            self.state.zobrist_key ^= z.piece(opponent, Pieces::PAWN, captured_square);
            self.state.pawn_key ^= z.piece(opponent, Pieces::PAWN, captured_square);
        } else if m.is_capture() {
            captured_piece = m.captured();
            captured_square = to;
            self.board.remove_piece(opponent, captured_piece, to);
            self.state.zobrist_key ^= z.piece(opponent, captured_piece, to);
            if captured_piece == Pieces::PAWN {
                self.state.pawn_key ^= z.piece(opponent, Pieces::PAWN, to);
            }
        }

        // 3. Move the piece; promotions change the piece type on arrival.
        self.board.remove_piece(side, piece, from);
        self.state.zobrist_key ^= z.piece(side, piece, from);
        if piece == Pieces::PAWN {
            self.state.pawn_key ^= z.piece(side, Pieces::PAWN, from);
        }

        let landing_piece = if m.is_promotion() { m.promoted() } else { piece };
        self.board.put_piece(side, landing_piece, to);
        self.state.zobrist_key ^= z.piece(side, landing_piece, to);
        if landing_piece == Pieces::PAWN {
            self.state.pawn_key ^= z.piece(side, Pieces::PAWN, to);
        }

        // 4. Castling: move the corresponding rook too.
        if m.is_castle() {
            let (rook_from, rook_to) = Self::castle_rook_squares(&m);
            self.board.move_piece(side, Pieces::ROOK, rook_from, rook_to);
            self.state.zobrist_key ^= z.piece(side, Pieces::ROOK, rook_from);
            self.state.zobrist_key ^= z.piece(side, Pieces::ROOK, rook_to);
        }

        // 5. Halfmove clock.
        if piece == Pieces::PAWN || m.is_capture() {
            self.state.halfmove_clock = 0;
        } else {
            self.state.halfmove_clock += 1;
        }

        // 6. Double pawn push sets ep_square, hashed in only if it is
        // actually capturable.
        if piece == Pieces::PAWN && from.abs_diff(to) == 16 {
            let ep_square = (from + to) / 2;
            let enemy_pawns = self.board.get_pieces(Pieces::PAWN, opponent);
            if enemy_pawns & magics::pawn_attacks(side, ep_square) != EMPTY {
                self.state.en_passant = Some(ep_square as u8);
                self.state.zobrist_key ^= z.en_passant(Some(ep_square));
            }
        }

        // 7. Castling rights: clear on king/rook squares touched either
        // as the moving square or as the destination (a capture on a
        // rook's home square revokes that right too).
        let old_rights = self.state.castling;
        let mut new_rights = old_rights;
        Self::touch_castling_rights(&mut new_rights, from);
        Self::touch_castling_rights(&mut new_rights, to);
        if new_rights != old_rights {
            self.state.zobrist_key ^= z.castling(old_rights);
            self.state.zobrist_key ^= z.castling(new_rights);
            self.state.castling = new_rights;
        }

        // 8. Flip side to move.
        self.state.zobrist_key ^= z.side(Sides::BLACK);
        self.state.active_color = opponent as u8;
        if side == Sides::BLACK {
            self.state.fullmove_number += 1;
        }

        // Legality check: undo everything if the mover's king is attacked.
        if self.is_attacked(self.board.king_square(side), opponent) {
            self.undo_move_raw(prev_state, m, captured_piece, captured_square);
            return false;
        }

        self.history.push(StateInfo { prev_state, mv: m, captured_piece, captured_square });
        true
    }

    /// Reverses the most recent `do_move`.
    pub fn undo_move(&mut self) {
        let info = self.history.pop();
        self.undo_move_raw(info.prev_state, info.mv, info.captured_piece, info.captured_square);
    }

    // Shared by undo_move and the legality-check rollback inside do_move:
    // restores the board purely from the move's own fields plus the
    // GameState snapshot taken before the move, without touching history.
    fn undo_move_raw(&mut self, prev_state: GameState, m: Move, captured_piece: Piece, captured_square: Square) {
        let side = prev_state.active_color as Side;
        let opponent = side ^ 1;
        let from = m.from();
        let to = m.to();
        let piece = m.piece();
        let landing_piece = if m.is_promotion() { m.promoted() } else { piece };

        self.board.remove_piece(side, landing_piece, to);
        self.board.put_piece(side, piece, from);

        if m.is_castle() {
            let (rook_from, rook_to) = Self::castle_rook_squares(&m);
            self.board.move_piece(side, Pieces::ROOK, rook_to, rook_from);
        }

        if captured_piece != Pieces::NONE {
            self.board.put_piece(opponent, captured_piece, captured_square);
        }

        self.state = prev_state;
    }

    /// Pushes a null move: flips the side to move without moving a piece.
    /// Only legal when not in check (callers must verify this).
    pub fn do_null(&mut self) {
        let z = zobrist::zobrist();
        self.null_history.push(NullState {
            prev_en_passant: self.state.en_passant,
            prev_castling: self.state.castling,
        });

        self.state.zobrist_key ^= z.en_passant(self.state.ep_square_option());
        self.state.en_passant = None;
        self.state.zobrist_key ^= z.side(Sides::BLACK);
        self.state.active_color = (self.state.active_color as Side ^ 1) as u8;
    }

    pub fn undo_null(&mut self) {
        let info = self.null_history.pop();
        let z = zobrist::zobrist();
        self.state.zobrist_key ^= z.side(Sides::BLACK);
        self.state.active_color = (self.state.active_color as Side ^ 1) as u8;
        self.state.zobrist_key ^= z.en_passant(self.state.ep_square_option());
        self.state.zobrist_key ^= z.en_passant(info.prev_en_passant.map(|s| s as Square));
        self.state.en_passant = info.prev_en_passant;
        self.state.castling = info.prev_castling;
    }

    // The king's own destination square disambiguates white from black
    // (g1/c1 vs g8/c8), so the rook's from/to squares are a pure function
    // of where the king landed.
    fn castle_rook_squares(m: &Move) -> (Square, Square) {
        match m.to() {
            6 => (7, 5),   // WK: h1 -> f1
            2 => (0, 3),   // WQ: a1 -> d1
            62 => (63, 61), // BK: h8 -> f8
            58 => (56, 59), // BQ: a8 -> d8
            other => unreachable!("castle move landed on non-castling square {other}"),
        }
    }

    // -------------------------------------------------------------
    // Draw detection
    // -------------------------------------------------------------

    pub fn fifty_move_rule(&self) -> bool {
        self.state.halfmove_clock >= 100
    }

    pub fn insufficient_material(&self) -> bool {
        let board = &self.board;
        let total_non_king = (0..5).map(|p| {
            board.piece_count(Sides::WHITE, p) + board.piece_count(Sides::BLACK, p)
        }).sum::<u32>();

        if total_non_king == 0 {
            return true;
        }

        let pawns = board.piece_count(Sides::WHITE, Pieces::PAWN) + board.piece_count(Sides::BLACK, Pieces::PAWN);
        let rooks = board.piece_count(Sides::WHITE, Pieces::ROOK) + board.piece_count(Sides::BLACK, Pieces::ROOK);
        let queens = board.piece_count(Sides::WHITE, Pieces::QUEEN) + board.piece_count(Sides::BLACK, Pieces::QUEEN);
        let knights = board.piece_count(Sides::WHITE, Pieces::KNIGHT) + board.piece_count(Sides::BLACK, Pieces::KNIGHT);
        let bishops_w = board.piece_count(Sides::WHITE, Pieces::BISHOP);
        let bishops_b = board.piece_count(Sides::BLACK, Pieces::BISHOP);
        let bishops = bishops_w + bishops_b;

        if pawns != 0 || rooks != 0 || queens != 0 {
            return false;
        }

        // K+minor vs K.
        if knights + bishops <= 1 {
            return true;
        }

        // K+B vs K+B with same-colored bishops.
        if knights == 0 && bishops_w == 1 && bishops_b == 1 {
            let mut bb_w = self.board.get_pieces(Pieces::BISHOP, Sides::WHITE);
            let mut bb_b = self.board.get_pieces(Pieces::BISHOP, Sides::BLACK);
            let sq_w = bits::next(&mut bb_w);
            let sq_b = bits::next(&mut bb_b);
            return Board::is_light_square(sq_w) == Board::is_light_square(sq_b);
        }

        false
    }

    /// True once the same Zobrist key has occurred twice before in the
    /// reachable history (so this would be the third occurrence),
    /// scanning back only to the last irreversible move (captures and
    /// pawn moves reset the halfmove clock, which bounds the scan).
    pub fn threefold_repetition(&self) -> bool {
        self.repetition_count() >= 2
    }

    /// A single earlier occurrence is enough to treat a search node as a
    /// drawn repetition cycle and cut it short, even though the game
    /// itself only actually draws on the third occurrence.
    pub fn has_repeated_once(&self) -> bool {
        self.repetition_count() >= 1
    }

    fn repetition_count(&self) -> usize {
        let current_key = self.state.zobrist_key;
        let len = self.history.len();
        let clock = self.state.halfmove_clock as usize;
        let scan_back = clock.min(len);

        let mut occurrences = 0;
        for i in 1..=scan_back {
            let info = self.history.get_ref(len - i);
            if info.prev_state.zobrist_key == current_key {
                occurrences += 1;
            }
        }
        occurrences
    }

    pub fn is_draw(&self) -> bool {
        self.fifty_move_rule() || self.insufficient_material() || self.threefold_repetition()
    }

    // -------------------------------------------------------------
    // SEE
    // -------------------------------------------------------------

    /// Static exchange evaluation on `m`'s target square: returns whether
    /// the full capture sequence is non-losing for the side to move.
    pub fn see_non_negative(&self, m: Move) -> bool {
        self.see(m) >= 0
    }

    /// Static exchange evaluation: the net material gain (centipawns) of
    /// playing out the full capture sequence on `m`'s target square.
    /// Used both for `see_non_negative` and directly by the search's
    /// capture ordering and SEE-pruning.
    pub fn see(&self, m: Move) -> i32 {
        if !m.is_capture() {
            return 0;
        }

        let to = m.to();
        let side = self.side_to_move();
        let mut occ = self.board.occupancy();
        occ &= !BB_SQUARES[m.from()];

        let target_value = if m.is_en_passant() {
            PIECE_VALUES[Pieces::PAWN]
        } else {
            PIECE_VALUES[m.captured()]
        };

        if m.is_en_passant() {
            let captured_square = if side == Sides::WHITE { to - 8 } else { to + 8 };
            occ &= !BB_SQUARES[captured_square];
        }

        let mut gain = [0i32; 32];
        gain[0] = target_value;
        let mut depth = 0usize;
        let mut attacker_value = PIECE_VALUES[m.piece()];
        let mut side_to_capture = side ^ 1;

        loop {
            depth += 1;
            gain[depth] = attacker_value - gain[depth - 1];
            if gain[depth].max(-gain[depth - 1]) < 0 {
                break;
            }

            let attackers = self.attacks_to(to, side_to_capture, occ);
            match Self::least_valuable_attacker(&self.board, attackers, side_to_capture) {
                Some((from, piece)) => {
                    occ &= !BB_SQUARES[from];
                    attacker_value = PIECE_VALUES[piece];
                    side_to_capture ^= 1;
                }
                None => break,
            }
        }

        while depth > 0 {
            depth -= 1;
            gain[depth] = -gain[depth + 1].max(-gain[depth]);
        }
        gain[0]
    }

    fn least_valuable_attacker(board: &Board, attackers: Bitboard, side: Side) -> Option<(Square, Piece)> {
        const ASCENDING_VALUE: [Piece; 6] =
            [Pieces::PAWN, Pieces::KNIGHT, Pieces::BISHOP, Pieces::ROOK, Pieces::QUEEN, Pieces::KING];
        for &piece in ASCENDING_VALUE.iter() {
            let mut candidates = board.get_pieces(piece, side) & attackers;
            if candidates != EMPTY {
                return Some((bits::next(&mut candidates), piece));
            }
        }
        None
    }

    // -------------------------------------------------------------
    // Castling helpers
    // -------------------------------------------------------------

    fn touch_castling_rights(rights: &mut u8, square: Square) {
        match square {
            4 => *rights &= !(Castling::WK | Castling::WQ),
            0 => *rights &= !Castling::WQ,
            7 => *rights &= !Castling::WK,
            60 => *rights &= !(Castling::BK | Castling::BQ),
            56 => *rights &= !Castling::BQ,
            63 => *rights &= !Castling::BK,
            _ => {}
        }
    }

    // -------------------------------------------------------------
    // FEN / UCI
    // -------------------------------------------------------------

    pub fn set_from_fen(&mut self, fen: &str) -> Result<(), String> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(format!("FEN must have 6 fields, found {}", fields.len()));
        }

        let mut board = Board::new();
        let mut rank = 7usize;
        let mut file = 0usize;
        for c in fields[0].chars() {
            match c {
                '/' => {
                    if file != 8 {
                        return Err(format!("rank had {file} files, expected 8"));
                    }
                    if rank == 0 {
                        return Err("too many ranks in board field".to_string());
                    }
                    rank -= 1;
                    file = 0;
                }
                '1'..='8' => {
                    file += c.to_digit(10).unwrap() as usize;
                    if file > 8 {
                        return Err("rank overflowed 8 files".to_string());
                    }
                }
                _ => {
                    let (side, piece) = Self::fen_char_to_piece(c).ok_or_else(|| format!("invalid piece char '{c}'"))?;
                    if file >= 8 {
                        return Err("rank overflowed 8 files".to_string());
                    }
                    let square = rank * 8 + file;
                    board.put_piece(side, piece, square);
                    file += 1;
                }
            }
        }
        if file != 8 || rank != 0 {
            return Err("board field did not describe exactly 8 ranks".to_string());
        }
        board.rebuild_derived_state();

        let active_color = match fields[1] {
            "w" => Sides::WHITE as u8,
            "b" => Sides::BLACK as u8,
            other => return Err(format!("invalid side to move '{other}'")),
        };

        let mut castling = 0u8;
        if fields[2] != "-" {
            for c in fields[2].chars() {
                castling |= match c {
                    'K' => Castling::WK,
                    'Q' => Castling::WQ,
                    'k' => Castling::BK,
                    'q' => Castling::BQ,
                    other => return Err(format!("invalid castling char '{other}'")),
                };
            }
        }

        let en_passant = match fields[3] {
            "-" => None,
            s => {
                let sq = parse::algebraic_to_square(s).ok_or_else(|| format!("invalid en-passant square '{s}'"))?;
                let capturing_side = active_color as Side;
                let capturing_pawns = board.get_pieces(Pieces::PAWN, capturing_side);
                if capturing_pawns & magics::pawn_attacks(capturing_side ^ 1, sq) != EMPTY {
                    Some(sq as u8)
                } else {
                    None
                }
            }
        };

        let halfmove_clock: u8 = fields[4].parse().map_err(|_| "invalid halfmove clock".to_string())?;
        let fullmove_number: u16 = fields[5].parse().map_err(|_| "invalid fullmove number".to_string())?;
        if fullmove_number == 0 {
            return Err("fullmove number must be >= 1".to_string());
        }

        self.board = board;
        self.state = GameState {
            active_color,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
            zobrist_key: 0,
            pawn_key: 0,
        };
        self.history.clear();
        self.null_history.clear();
        self.recompute_hash();
        Ok(())
    }

    fn fen_char_to_piece(c: char) -> Option<(Side, Piece)> {
        if let Some(idx) = PIECE_CHAR_UPPERCASE.iter().position(|&p| p == c) {
            return Some((Sides::WHITE, idx));
        }
        if let Some(idx) = PIECE_CHAR_LOWERCASE.iter().position(|&p| p == c) {
            return Some((Sides::BLACK, idx));
        }
        None
    }

    /// Recomputes the Zobrist key and pawn sub-key from scratch. Used
    /// after loading a FEN, where there is no prior incremental key to
    /// build on.
    fn recompute_hash(&mut self) {
        let z = zobrist::zobrist();
        let mut key = 0u64;
        let mut pawn_key = 0u64;

        for side in [Sides::WHITE, Sides::BLACK] {
            for piece in 0..Pieces::NONE {
                let mut bb = self.board.get_pieces(piece, side);
                while bb != EMPTY {
                    let square = bits::next(&mut bb);
                    key ^= z.piece(side, piece, square);
                    if piece == Pieces::PAWN {
                        pawn_key ^= z.piece(side, Pieces::PAWN, square);
                    }
                }
            }
        }

        key ^= z.castling(self.state.castling);
        key ^= z.en_passant(self.state.ep_square_option());
        if self.state.active_color as Side == Sides::BLACK {
            key ^= z.side(Sides::BLACK);
        }

        self.state.zobrist_key = key;
        self.state.pawn_key = pawn_key;
    }

    pub fn get_fen(&self) -> String {
        let mut board_field = String::new();
        for rank in (0..8).rev() {
            let mut empty_run = 0;
            for file in 0..8 {
                let square = rank * 8 + file;
                match self.board.get_piece(square) {
                    None => empty_run += 1,
                    Some((piece, side)) => {
                        if empty_run > 0 {
                            board_field.push_str(&empty_run.to_string());
                            empty_run = 0;
                        }
                        let c = if side == Sides::WHITE { PIECE_CHAR_UPPERCASE[piece] } else { PIECE_CHAR_LOWERCASE[piece] };
                        board_field.push(c);
                    }
                }
            }
            if empty_run > 0 {
                board_field.push_str(&empty_run.to_string());
            }
            if rank > 0 {
                board_field.push('/');
            }
        }

        let side_field = if self.side_to_move() == Sides::WHITE { "w" } else { "b" };

        let mut castling_field = String::new();
        if self.state.castling & Castling::WK != 0 {
            castling_field.push('K');
        }
        if self.state.castling & Castling::WQ != 0 {
            castling_field.push('Q');
        }
        if self.state.castling & Castling::BK != 0 {
            castling_field.push('k');
        }
        if self.state.castling & Castling::BQ != 0 {
            castling_field.push('q');
        }
        if castling_field.is_empty() {
            castling_field.push('-');
        }

        let ep_field = match self.state.ep_square_option() {
            Some(sq) => parse::square_to_algebraic(sq),
            None => "-".to_string(),
        };

        format!(
            "{board_field} {side_field} {castling_field} {ep_field} {} {}",
            self.state.halfmove_clock, self.state.fullmove_number
        )
    }

    /// Parses and applies a UCI move string against the legal move list.
    /// Leaves the position unmutated and returns an error if the string
    /// doesn't name a legal move.
    pub fn apply_uci_move(&mut self, uci: &str) -> Result<(), String> {
        let potential = parse::algebraic_move_to_number(uci).ok_or_else(|| format!("malformed UCI move '{uci}'"))?;

        let generator = crate::movegen::MoveGenerator::new();
        let legal = generator.generate_legal(self);
        for m in legal.iter() {
            if m.from() == potential.0 && m.to() == potential.1 {
                let promo_matches = if m.is_promotion() { m.promoted() == potential.2 } else { potential.2 == Pieces::NONE };
                if promo_matches {
                    let applied = self.do_move(*m);
                    debug_assert!(applied, "generate_legal produced an illegal move");
                    return Ok(());
                }
            }
        }
        Err(format!("'{uci}' is not a legal move in this position"))
    }
}

impl GameState {
    pub(crate) fn ep_square_option(&self) -> Option<Square> {
        self.en_passant.map(|s| s as Square)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Position {
    fn clone(&self) -> Self {
        Self {
            board: self.board.clone(),
            state: self.state,
            history: self.history.clone(),
            null_history: self.null_history.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{FEN_KIWIPETE_POSITION, FEN_START_POSITION};

    fn init() {
        magics::init_magics();
        zobrist::init_zobrist();
    }

    #[test]
    fn start_position_round_trips_through_fen() {
        init();
        let mut pos = Position::new();
        pos.set_from_fen(FEN_START_POSITION).unwrap();
        assert_eq!(pos.get_fen(), FEN_START_POSITION);
    }

    #[test]
    fn kiwipete_round_trips_through_fen() {
        init();
        let mut pos = Position::new();
        pos.set_from_fen(FEN_KIWIPETE_POSITION).unwrap();
        assert_eq!(pos.get_fen(), FEN_KIWIPETE_POSITION);
    }

    #[test]
    fn do_move_undo_move_restores_hash_and_history_length() {
        init();
        let mut pos = Position::new();
        pos.set_from_fen(FEN_START_POSITION).unwrap();
        let hash_before = pos.hash();
        let len_before = pos.history_len();

        let applied = pos.apply_uci_move("e2e4");
        assert!(applied.is_ok());
        assert_ne!(pos.hash(), hash_before);

        pos.undo_move();
        assert_eq!(pos.hash(), hash_before);
        assert_eq!(pos.history_len(), len_before);
    }

    #[test]
    fn castling_rights_are_revoked_by_rook_capture() {
        init();
        let mut pos = Position::new();
        pos.set_from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        assert!(pos.apply_uci_move("a1a8").is_ok());
        assert_eq!(pos.game_state().castling & Castling::BQ, 0);
        assert_eq!(pos.game_state().castling & Castling::WQ, 0);
    }

    #[test]
    fn insufficient_material_detects_k_vs_k() {
        init();
        let mut pos = Position::new();
        pos.set_from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(pos.insufficient_material());
    }

    #[test]
    fn fifty_move_rule_triggers_at_100_halfmoves() {
        init();
        let mut pos = Position::new();
        pos.set_from_fen("4k3/8/8/8/8/8/8/4K3 w - - 99 50").unwrap();
        assert!(!pos.fifty_move_rule());
        pos.state.halfmove_clock = 100;
        assert!(pos.fifty_move_rule());
    }

    #[test]
    fn side_to_move_changes_the_hash_for_an_otherwise_identical_position() {
        init();
        let mut white_to_move = Position::new();
        white_to_move.set_from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let mut black_to_move = Position::new();
        black_to_move.set_from_fen("4k3/8/8/8/8/8/8/4K3 b - - 0 1").unwrap();
        assert_ne!(white_to_move.hash(), black_to_move.hash());
    }

    #[test]
    fn set_from_fen_drops_an_ep_square_with_no_capturing_pawn() {
        init();
        let mut pos = Position::new();
        pos.set_from_fen("4k3/8/8/8/4P3/8/8/4K3 b - e3 0 1").unwrap();
        assert_eq!(pos.game_state().en_passant, None);
        assert_eq!(pos.get_fen(), "4k3/8/8/8/4P3/8/8/4K3 b - - 0 1");
    }

    #[test]
    fn set_from_fen_keeps_an_ep_square_with_a_capturing_pawn() {
        init();
        let mut pos = Position::new();
        pos.set_from_fen("4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1").unwrap();
        assert_eq!(pos.game_state().en_passant, Some(parse::algebraic_to_square("e3").unwrap() as u8));
        assert_eq!(pos.get_fen(), "4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1");
    }
}
