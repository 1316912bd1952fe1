use crate::moves::types::Move;

// Make sure MATE_THRESHOLD matches what we define in search.rs (30000)
pub const MATE_THRESHOLD: i32 = 30000;

/// Ways per set. A set is a small bucket of slots sharing an index; a probe
/// scans every way in the set and compares the full stored key.
const TT_WAYS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeType {
    Exact = 0,
    LowerBound = 1, // Beta cutoff (failed high)
    UpperBound = 2, // Alpha cutoff (failed low)
}

#[derive(Clone, Copy, Debug)]
pub struct TTEntry {
    pub key: u64,
    pub best_move: Option<Move>,
    pub score: i16,
    pub depth: u8,
    pub bound: u8, // 0=Exact, 1=Lower, 2=Upper
    pub generation: u8,
}

impl TTEntry {
    const EMPTY: TTEntry = TTEntry {
        key: 0,
        best_move: None,
        score: 0,
        depth: 0,
        bound: 0,
        generation: 0,
    };

    fn is_empty(&self) -> bool {
        self.key == 0
    }
}

#[derive(Clone, Copy)]
struct TTSet {
    ways: [TTEntry; TT_WAYS],
}

pub struct TranspositionTable {
    sets: Vec<TTSet>,
    pub generation: u8,
}

impl TranspositionTable {
    pub fn new(size_mb: usize) -> Self {
        let set_size = std::mem::size_of::<TTSet>();
        let num_sets = ((size_mb * 1024 * 1024) / set_size).max(1);

        // Round down to power of 2 so index masking works.
        let mut capacity = 1;
        while capacity * 2 <= num_sets {
            capacity *= 2;
        }

        Self {
            sets: vec![
                TTSet {
                    ways: [TTEntry::EMPTY; TT_WAYS],
                };
                capacity
            ],
            generation: 0,
        }
    }

    pub fn new_search(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn clear(&mut self) {
        for set in self.sets.iter_mut() {
            set.ways = [TTEntry::EMPTY; TT_WAYS];
        }
        self.generation = 0;
    }

    fn set_index(&self, key: u64) -> usize {
        (key as usize) & (self.sets.len() - 1)
    }

    pub fn save(
        &mut self,
        key: u64,
        mv: Option<Move>,
        score: i32,
        depth: u8,
        bound: u8,
        _ply: i32,
    ) {
        let score_i16 = score.clamp(-32000, 32000) as i16;
        let index = self.set_index(key);
        let set = &mut self.sets[index];

        // Prefer an exact match so depth/age rules govern the same key.
        if let Some(slot) = set.ways.iter_mut().find(|e| e.key == key) {
            if slot.depth <= depth || slot.generation != self.generation {
                let best_move = if mv.is_some() { mv } else { slot.best_move };
                *slot = TTEntry {
                    key,
                    best_move,
                    score: score_i16,
                    depth,
                    bound,
                    generation: self.generation,
                };
            }
            return;
        }

        // Replacement policy: empty slot, else any entry from an earlier
        // generation, else (within the current generation) lowest depth.
        let victim = set
            .ways
            .iter_mut()
            .min_by_key(|e| {
                if e.is_empty() {
                    (0u8, 0u8)
                } else {
                    let is_current_gen = e.generation == self.generation;
                    (1u8 + is_current_gen as u8, e.depth)
                }
            })
            .expect("TT set is never empty");

        *victim = TTEntry {
            key,
            best_move: mv,
            score: score_i16,
            depth,
            bound,
            generation: self.generation,
        };
    }

    pub fn probe(
        &self,
        key: u64,
        _depth: u8,
        _alpha: i32,
        _beta: i32,
        _ply: i32,
    ) -> Option<(Option<Move>, i32, u8, u8)> {
        let index = self.set_index(key);
        let set = &self.sets[index];

        set.ways
            .iter()
            .find(|e| e.key == key)
            .map(|e| (e.best_move, e.score as i32, e.depth, e.bound))
    }

    /// Counts of occupied slots by bound class (exact, lower, upper), sampled
    /// over the same window as `hashfull`.
    pub fn bound_counts(&self) -> (usize, usize, usize) {
        let sample = self.sets.len().min(1000);
        let mut exact = 0;
        let mut lower = 0;
        let mut upper = 0;
        for entry in self.sets[..sample].iter().flat_map(|s| s.ways.iter()) {
            if entry.is_empty() {
                continue;
            }
            match entry.bound {
                0 => exact += 1,
                1 => lower += 1,
                _ => upper += 1,
            }
        }
        (exact, lower, upper)
    }

    /// Occupancy in per-mille, sampled over the first 1000 sets (or all sets
    /// if there are fewer than that).
    pub fn hashfull(&self) -> u32 {
        let sample = self.sets.len().min(1000);
        if sample == 0 {
            return 0;
        }
        let occupied: usize = self.sets[..sample]
            .iter()
            .flat_map(|s| s.ways.iter())
            .filter(|e| !e.is_empty())
            .count();
        let total_slots = sample * TT_WAYS;
        ((occupied * 1000) / total_slots) as u32
    }
}
