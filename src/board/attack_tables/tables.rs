//! Precomputed attack tables for leaper pieces (knights, kings, pawns).

use once_cell::sync::Lazy;

pub(crate) static KNIGHT_ATTACKS: Lazy<[u64; 64]> = Lazy::new(|| {
    let mut attacks = [0u64; 64];
    let deltas = [
        (2, 1),
        (1, 2),
        (-1, 2),
        (-2, 1),
        (-2, -1),
        (-1, -2),
        (1, -2),
        (2, -1),
    ];
    for (sq, slot) in attacks.iter_mut().enumerate() {
        let r = (sq / 8) as isize;
        let f = (sq % 8) as isize;
        let mut mask = 0u64;
        for (dr, df) in deltas {
            let nr = r + dr;
            let nf = f + df;
            if (0..8).contains(&nr) && (0..8).contains(&nf) {
                mask |= 1u64 << ((nr as usize) * 8 + (nf as usize));
            }
        }
        *slot = mask;
    }
    attacks
});

pub(crate) static KING_ATTACKS: Lazy<[u64; 64]> = Lazy::new(|| {
    let mut attacks = [0u64; 64];
    let deltas = [
        (1, 0),
        (-1, 0),
        (0, 1),
        (0, -1),
        (1, 1),
        (1, -1),
        (-1, 1),
        (-1, -1),
    ];
    for (sq, slot) in attacks.iter_mut().enumerate() {
        let r = (sq / 8) as isize;
        let f = (sq % 8) as isize;
        let mut mask = 0u64;
        for (dr, df) in deltas {
            let nr = r + dr;
            let nf = f + df;
            if (0..8).contains(&nr) && (0..8).contains(&nf) {
                mask |= 1u64 << ((nr as usize) * 8 + (nf as usize));
            }
        }
        *slot = mask;
    }
    attacks
});

/// `PAWN_ATTACKS[color][square]`: squares a pawn of that color attacks from there.
pub(crate) static PAWN_ATTACKS: Lazy<[[u64; 64]; 2]> = Lazy::new(|| {
    let mut attacks = [[0u64; 64]; 2];
    for sq in 0..64 {
        let r = (sq / 8) as isize;
        let f = (sq % 8) as isize;
        for (c, dr) in [(0usize, 1isize), (1, -1)] {
            let nr = r + dr;
            if (0..8).contains(&nr) {
                for df in [-1isize, 1] {
                    let nf = f + df;
                    if (0..8).contains(&nf) {
                        attacks[c][sq] |= 1u64 << ((nr as usize) * 8 + (nf as usize));
                    }
                }
            }
        }
    }
    attacks
});
