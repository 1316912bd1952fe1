//! Builds the magic bitboard lookup tables used by `MagicTables`.
//!
//! For every square we derive the relevant occupancy mask (blockers beyond the
//! board edge never change the attack set, so they're excluded), enumerate
//! every subset of that mask via the carry-rippler trick, and search for a
//! magic multiplier that hashes each subset to a collision-free index.

use super::attacks::{bishop_attacks_per_square, rook_attacks_per_square};
use super::search::find_magic_number_for_square;
use super::structs::{BishopMagicTables, MagicEntry, MagicTables, RookMagicTables};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[derive(Debug, Clone, Copy)]
pub enum MagicTableSeed {
    /// Reproducible tables, used when the `deterministic_magic` feature is on.
    Fixed(u64),
    Random,
}

fn rook_relevant_mask(square: usize) -> u64 {
    let rank = (square / 8) as i32;
    let file = (square % 8) as i32;
    let mut mask = 0u64;

    for r in (rank + 1)..7 {
        mask |= 1u64 << (r * 8 + file);
    }
    for r in 1..rank {
        mask |= 1u64 << (r * 8 + file);
    }
    for f in (file + 1)..7 {
        mask |= 1u64 << (rank * 8 + f);
    }
    for f in 1..file {
        mask |= 1u64 << (rank * 8 + f);
    }

    mask
}

fn bishop_relevant_mask(square: usize) -> u64 {
    let rank = (square / 8) as i32;
    let file = (square % 8) as i32;
    let mut mask = 0u64;

    for &(dr, df) in &[(1, 1), (1, -1), (-1, 1), (-1, -1)] {
        let mut r = rank + dr;
        let mut f = file + df;
        while (1..7).contains(&r) && (1..7).contains(&f) {
            mask |= 1u64 << (r * 8 + f);
            r += dr;
            f += df;
        }
    }

    mask
}

/// Enumerates every subset of `mask`, including the empty set and `mask` itself.
fn subsets_of(mask: u64) -> Vec<u64> {
    let mut subsets = Vec::with_capacity(1usize << mask.count_ones());
    let mut subset = 0u64;
    loop {
        subsets.push(subset);
        if subset == mask {
            break;
        }
        subset = subset.wrapping_sub(mask) & mask;
    }
    subsets
}

fn build_entry<R: rand::RngCore>(
    square: usize,
    mask: u64,
    rng: &mut R,
    attacks_for: fn(usize, u64) -> u64,
) -> Result<MagicEntry, String> {
    let blockers = subsets_of(mask);
    let attacks: Vec<u64> = blockers.iter().map(|&b| attacks_for(square, b)).collect();

    let bits = mask.count_ones();
    let shift = 64 - bits;
    let magic = find_magic_number_for_square(&blockers, &attacks, shift, rng)?;

    let mut table = vec![0u64; 1usize << bits];
    for (&blocker, &attack) in blockers.iter().zip(attacks.iter()) {
        let index = ((blocker.wrapping_mul(magic)) >> shift) as usize;
        table[index] = attack;
    }

    Ok(MagicEntry {
        magic,
        shift,
        mask,
        table: table.into_boxed_slice(),
    })
}

pub fn generate_magic_tables(seed: MagicTableSeed) -> Result<MagicTables, String> {
    let mut rng = match seed {
        MagicTableSeed::Fixed(s) => StdRng::seed_from_u64(s),
        MagicTableSeed::Random => StdRng::from_os_rng(),
    };

    let mut rook_entries = Vec::with_capacity(64);
    let mut bishop_entries = Vec::with_capacity(64);

    for square in 0..64 {
        let rook_mask = rook_relevant_mask(square);
        rook_entries.push(build_entry(
            square,
            rook_mask,
            &mut rng,
            rook_attacks_per_square,
        )?);

        let bishop_mask = bishop_relevant_mask(square);
        bishop_entries.push(build_entry(
            square,
            bishop_mask,
            &mut rng,
            bishop_attacks_per_square,
        )?);
    }

    Ok(MagicTables {
        rook: RookMagicTables {
            entries: rook_entries,
        },
        bishop: BishopMagicTables {
            entries: bishop_entries,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rook_mask_excludes_board_edge() {
        // d4 (27): relevant rook bits exclude rank 1/8 and file a/h.
        let mask = rook_relevant_mask(27);
        assert_eq!(mask & 0xFF, 0);
        assert_eq!(mask & 0xFF00_0000_0000_0000, 0);
        assert_eq!(mask & 0x0101_0101_0101_0101, 0);
    }

    #[test]
    fn generated_rook_table_matches_scan_generator() {
        let tables = generate_magic_tables(MagicTableSeed::Fixed(1)).unwrap();
        let square = 27usize;
        let blockers = (1u64 << 19) | (1u64 << 35);
        let expected = rook_attacks_per_square(square, blockers);
        assert_eq!(tables.rook.get_attacks(square, blockers), expected);
    }

    #[test]
    fn generated_bishop_table_matches_scan_generator() {
        let tables = generate_magic_tables(MagicTableSeed::Fixed(1)).unwrap();
        let square = 27usize;
        let blockers = (1u64 << 36) | (1u64 << 18);
        let expected = bishop_attacks_per_square(square, blockers);
        assert_eq!(tables.bishop.get_attacks(square, blockers), expected);
    }
}
