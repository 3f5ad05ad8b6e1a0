//! Board-level test suites.

mod fen;
mod make_unmake;
