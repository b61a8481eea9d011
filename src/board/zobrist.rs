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

use crate::defs::{NrOf, Piece, Side, Sides, Square};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::OnceLock;

pub type ZobristKey = u64;

// Fixed seed: the Zobrist tables must be identical across process runs so
// that a key computed now and a key computed after a restart agree (this
// matters for book/tuning reproducibility even though the engine itself
// does not persist anything to disk).
const ZOBRIST_SEED: u64 = 0x5EED_BA5E_C0FF_EE11;

#[derive(Clone)]
pub struct ZobristRandoms {
    piece: [[[ZobristKey; NrOf::SQUARES]; NrOf::PIECE_TYPES]; Sides::BOTH],
    castling: [ZobristKey; NrOf::CASTLING_PERMISSIONS],
    en_passant_file: [ZobristKey; NrOf::FILES],
    side: [ZobristKey; Sides::BOTH],
}

impl ZobristRandoms {
    pub fn new() -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(ZOBRIST_SEED);

        let mut piece = [[[0; NrOf::SQUARES]; NrOf::PIECE_TYPES]; Sides::BOTH];
        for s in piece.iter_mut() {
            for p in s.iter_mut() {
                for key in p.iter_mut() {
                    *key = rng.next_u64();
                }
            }
        }

        let mut castling = [0; NrOf::CASTLING_PERMISSIONS];
        for key in castling.iter_mut() {
            *key = rng.next_u64();
        }

        let mut en_passant_file = [0; NrOf::FILES];
        for key in en_passant_file.iter_mut() {
            *key = rng.next_u64();
        }

        let side = [0, rng.next_u64()];

        Self {
            piece,
            castling,
            en_passant_file,
            side,
        }
    }

    pub fn piece(&self, side: Side, piece: Piece, square: Square) -> ZobristKey {
        self.piece[side][piece][square]
    }

    pub fn castling(&self, permissions: u8) -> ZobristKey {
        self.castling[(permissions & 0x0F) as usize]
    }

    /// Hashes the en-passant file. Pass `None` to get the "no EP" key (0),
    /// which makes toggling-twice-to-clear safe without a branch at the
    /// caller.
    pub fn en_passant(&self, square: Option<Square>) -> ZobristKey {
        match square {
            Some(sq) => self.en_passant_file[sq % 8],
            None => 0,
        }
    }

    pub fn side(&self, side: Side) -> ZobristKey {
        self.side[side]
    }
}

impl Default for ZobristRandoms {
    fn default() -> Self {
        Self::new()
    }
}

static ZOBRIST: OnceLock<ZobristRandoms> = OnceLock::new();

/// Builds the process-wide Zobrist tables. Idempotent, like `init_magics`;
/// safe to call from every `Engine::new`.
pub fn init_zobrist() {
    ZOBRIST.get_or_init(ZobristRandoms::new);
}

pub fn zobrist() -> &'static ZobristRandoms {
    ZOBRIST.get().expect("init_zobrist() must run before Zobrist hashing is used")
}
