//! Basic-block boundary derivation from a function's bytecode.

use rustc_hash::FxHashSet;

use crate::bytecode::{Func, Offset};

/// Offsets of instructions that end a basic block in `func`.
///
/// A block ends at an instruction that branches, returns, or throws, and at
/// the instruction preceding any branch target (a leader splits the block in
/// front of it). Single linear pass over the instruction list.
pub fn block_end_offsets(func: &Func) -> FxHashSet<Offset> {
    let instrs = func.instrs();
    let mut leaders = FxHashSet::default();
    for instr in instrs {
        if let Some(target) = instr.target() {
            leaders.insert(target);
        }
        if instr.ends_block() {
            // Fallthrough after a block-ending instruction starts a block.
            leaders.insert(instr.offset + instr.len);
        }
    }

    let mut ends = FxHashSet::default();
    for (i, instr) in instrs.iter().enumerate() {
        let next_is_leader = instrs
            .get(i + 1)
            .is_some_and(|next| leaders.contains(&next.offset));
        if instr.ends_block() || next_is_leader || i + 1 == instrs.len() {
            ends.insert(instr.offset);
        }
    }
    ends
}
