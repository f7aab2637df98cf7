//! Region descriptors: the unit of bytecode a profiling translation covers.

use crate::bytecode::SrcKey;
use crate::rec::TransId;

/// Where a post-condition type assertion applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// A local variable slot
    Local(u32),
    /// A stack slot relative to the frame
    Stack(i32),
}

/// Coarse value types tracked by post-conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Any value
    Cell,
    /// Null
    Null,
    /// Boolean
    Bool,
    /// Integer
    Int,
    /// Double
    Dbl,
    /// String
    Str,
    /// Array
    Arr,
    /// Object
    Obj,
}

/// A single type assertion at a location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeAssertion {
    /// Location the assertion applies to
    pub location: Location,
    /// Asserted type
    pub ty: ValueType,
}

/// Type state proven to hold when control leaves a block.
///
/// `changed` assertions are new facts; `refined` assertions narrow facts
/// that already held on entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostConditions {
    /// Newly established assertions
    pub changed: Vec<TypeAssertion>,
    /// Narrowed entry assertions
    pub refined: Vec<TypeAssertion>,
}

/// One basic block of a region
#[derive(Debug, Clone)]
pub struct RegionBlock {
    id: u32,
    start: SrcKey,
    last: SrcKey,
    post_conds: PostConditions,
    prof_trans_id: Option<TransId>,
}

impl RegionBlock {
    /// Create a block spanning `start..=last`
    pub fn new(id: u32, start: SrcKey, last: SrcKey) -> Self {
        RegionBlock { id, start, last, post_conds: PostConditions::default(), prof_trans_id: None }
    }

    /// Block id
    pub fn id(&self) -> u32 {
        self.id
    }

    /// First source key of the block
    pub fn start(&self) -> SrcKey {
        self.start
    }

    /// Last source key of the block
    pub fn last(&self) -> SrcKey {
        self.last
    }

    /// Post-conditions on exit from the block
    pub fn post_conds(&self) -> &PostConditions {
        &self.post_conds
    }

    /// Set the exit post-conditions
    pub fn set_post_conds(&mut self, pconds: PostConditions) {
        self.post_conds = pconds;
    }

    /// Profiling translation that covers this block, once installed
    pub fn prof_trans_id(&self) -> Option<TransId> {
        self.prof_trans_id
    }

    /// Record the owning profiling translation
    pub fn set_prof_trans_id(&mut self, id: TransId) {
        self.prof_trans_id = Some(id);
    }
}

/// An ordered set of blocks selected for one translation
#[derive(Debug, Clone)]
pub struct RegionDesc {
    blocks: Vec<RegionBlock>,
}

impl RegionDesc {
    /// Region over the given blocks. The first block is the entry.
    pub fn new(blocks: Vec<RegionBlock>) -> Self {
        RegionDesc { blocks }
    }

    /// Single-block region spanning `start..=last`
    pub fn single(start: SrcKey, last: SrcKey) -> Self {
        RegionDesc { blocks: vec![RegionBlock::new(0, start, last)] }
    }

    /// Whether the region has no blocks
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Blocks in region order
    pub fn blocks(&self) -> &[RegionBlock] {
        &self.blocks
    }

    /// Mutable blocks in region order
    pub fn blocks_mut(&mut self) -> &mut [RegionBlock] {
        &mut self.blocks
    }

    /// Entry block. The region must not be empty.
    pub fn entry(&self) -> &RegionBlock {
        &self.blocks[0]
    }

    /// First source key of the region
    pub fn start(&self) -> SrcKey {
        self.entry().start()
    }

    /// Last source key of the region's final block
    pub fn last_src_key(&self) -> SrcKey {
        self.blocks.last().expect("empty region").last()
    }

    /// Rewrite the id of the block currently numbered `old`
    pub fn renumber_block(&mut self, old: u32, new: u32) {
        for b in &mut self.blocks {
            if b.id == old {
                b.id = new;
                return;
            }
        }
        panic!("renumber_block: no block with id {old}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::FuncId;

    #[test]
    fn test_single_block_region() {
        let start = SrcKey::at(FuncId(1), 0);
        let last = SrcKey::at(FuncId(1), 12);
        let r = RegionDesc::single(start, last);
        assert!(!r.is_empty());
        assert_eq!(r.start(), start);
        assert_eq!(r.last_src_key(), last);
        assert_eq!(r.entry().id(), 0);
    }

    #[test]
    fn test_renumber_entry_block() {
        let sk = SrcKey::at(FuncId(1), 0);
        let mut r = RegionDesc::single(sk, sk);
        r.renumber_block(0, 42);
        assert_eq!(r.entry().id(), 42);
    }

    #[test]
    fn test_post_conditions_attach_to_last_block() {
        let sk = SrcKey::at(FuncId(1), 0);
        let mut r = RegionDesc::single(sk, sk);
        let pconds = PostConditions {
            changed: vec![TypeAssertion { location: Location::Local(0), ty: ValueType::Int }],
            refined: vec![],
        };
        r.blocks_mut().last_mut().unwrap().set_post_conds(pconds.clone());
        assert_eq!(r.blocks().last().unwrap().post_conds(), &pconds);
    }
}
