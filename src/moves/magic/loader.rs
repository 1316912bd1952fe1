use super::precompute::{MagicTableSeed, generate_magic_tables};
use super::structs::MagicTables;

/// Builds the magic bitboard tables used for sliding piece attack lookups.
///
/// With the `deterministic_magic` feature enabled, generation uses a fixed
/// seed so the resulting magics (and therefore perft/search traces) are
/// reproducible across runs and machines.
pub fn load_magic_tables() -> MagicTables {
    let seed = if cfg!(feature = "deterministic_magic") {
        MagicTableSeed::Fixed(0x5A17_4F2E_9C3B_0011)
    } else {
        MagicTableSeed::Random
    };

    generate_magic_tables(seed).expect("magic table generation failed")
}
