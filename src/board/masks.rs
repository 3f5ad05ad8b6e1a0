//! Precomputed square-relation masks.

use once_cell::sync::Lazy;

use super::types::bitboard::file_mask;

/// `BETWEEN[a][b]`: squares strictly between a and b when they share a
/// rank, file, or diagonal; empty otherwise. Used for castle-path checks.
pub(crate) static BETWEEN: Lazy<Box<[[u64; 64]; 64]>> = Lazy::new(|| {
    let mut between = Box::new([[0u64; 64]; 64]);
    for a in 0..64usize {
        for b in 0..64usize {
            if a == b {
                continue;
            }
            let (ar, af) = ((a / 8) as isize, (a % 8) as isize);
            let (br, bf) = ((b / 8) as isize, (b % 8) as isize);
            let dr = (br - ar).signum();
            let df = (bf - af).signum();
            let aligned = ar == br || af == bf || (br - ar).abs() == (bf - af).abs();
            if !aligned {
                continue;
            }
            let mut mask = 0u64;
            let (mut r, mut f) = (ar + dr, af + df);
            while (r, f) != (br, bf) {
                mask |= 1u64 << (r * 8 + f);
                r += dr;
                f += df;
            }
            between[a][b] = mask;
        }
    }
    between
});

/// `ADJACENT_FILES[file]`: the one or two neighbouring files.
pub(crate) static ADJACENT_FILES: Lazy<[u64; 8]> = Lazy::new(|| {
    let mut masks = [0u64; 8];
    for (file, slot) in masks.iter_mut().enumerate() {
        if file > 0 {
            *slot |= file_mask(file - 1);
        }
        if file < 7 {
            *slot |= file_mask(file + 1);
        }
    }
    masks
});

/// `PASSED_SPANS[color][square]`: squares an enemy pawn would have to occupy
/// to stop a pawn on `square` from being passed - the three files ahead of it.
pub(crate) static PASSED_SPANS: Lazy<[[u64; 64]; 2]> = Lazy::new(|| {
    let mut spans = [[0u64; 64]; 2];
    for sq in 0..64usize {
        let rank = sq / 8;
        let file = sq % 8;
        let files = file_mask(file) | ADJACENT_FILES[file];
        let ahead_white: u64 = if rank < 7 { !0u64 << ((rank + 1) * 8) } else { 0 };
        let behind_black: u64 = if rank > 0 { !(!0u64 << (rank * 8)) } else { 0 };
        spans[0][sq] = files & ahead_white;
        spans[1][sq] = files & behind_black;
    }
    spans
});
