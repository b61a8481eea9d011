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

use crate::board::zobrist::ZobristKey;
use crate::defs::{Sides, Square, NO_SQUARE};

// Everything about a position that is not "where are the pieces": whose
// turn it is, what the players are still allowed to do, and the
// incrementally-maintained Zobrist keys the repetition detector and pawn
// cache need. This is cheap to copy, which is what lets Position push/pop
// it (by value, through StateInfo) on every make/unmake instead of having
// to diff two board snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameState {
    pub active_color: u8,
    pub castling: u8,
    pub en_passant: Option<u8>,
    pub halfmove_clock: u8,
    pub fullmove_number: u16,
    pub zobrist_key: ZobristKey,
    pub pawn_key: ZobristKey,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            active_color: Sides::WHITE as u8,
            castling: 0,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            zobrist_key: 0,
            pawn_key: 0,
        }
    }

    pub fn ep_square(&self) -> Square {
        self.en_passant.map(|s| s as Square).unwrap_or(NO_SQUARE)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
