//! Per-translation profiling records.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::bytecode::{FuncId, SrcKey};
use crate::region::RegionDesc;

/// Identifier of a translation, allocated monotonically by the registry
pub type TransId = u32;

/// Sentinel for "no translation"
pub const INVALID_TRANS_ID: TransId = u32::MAX;

/// Kind of profiling translation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransKind {
    /// A profiled bytecode region
    Profile,
    /// A function-entry profiling prologue
    ProfPrologue,
}

/// Translations that called into a profiling prologue.
///
/// Main callers enter through the regular entry; guard callers enter through
/// the prologue's guard.
#[derive(Debug, Default, Clone)]
pub struct CallerRec {
    /// Callers entering through the main entry
    pub main_callers: Vec<TransId>,
    /// Callers entering through the guard
    pub guard_callers: Vec<TransId>,
}

/// A profiling translation record: either a profiled region or a prologue.
///
/// The original kept both shapes in overlapping storage discriminated by a
/// kind tag; here each shape is an enum variant.
#[derive(Debug)]
pub enum ProfTransRec {
    /// A profiled bytecode region
    Region {
        /// Last source key covered by the region
        last_sk: SrcKey,
        /// Start source key
        sk: SrcKey,
        /// The region this translation was generated from
        region: Arc<RegionDesc>,
        /// Size of the generated machine code
        asm_size: u32,
    },
    /// A function-entry profiling prologue
    Prologue {
        /// Entry source key
        sk: SrcKey,
        /// Argument count this prologue was specialized for
        num_args: u32,
        /// Size of the generated machine code
        asm_size: u32,
        /// Recorded callers, appended to as calls are bound
        callers: Mutex<CallerRec>,
    },
}

impl ProfTransRec {
    /// Record for a profiled region. The region must be nonempty and start
    /// at `sk`.
    pub fn new_region(last_sk: SrcKey, sk: SrcKey, region: Arc<RegionDesc>, asm_size: u32) -> Self {
        assert!(!region.is_empty() && region.start() == sk);
        ProfTransRec::Region { last_sk, sk, region, asm_size }
    }

    /// Record for a profiling prologue specialized for `num_args`
    pub fn new_prologue(sk: SrcKey, num_args: u32, asm_size: u32) -> Self {
        ProfTransRec::Prologue { sk, num_args, asm_size, callers: Mutex::new(CallerRec::default()) }
    }

    /// Kind tag
    pub fn kind(&self) -> TransKind {
        match self {
            ProfTransRec::Region { .. } => TransKind::Profile,
            ProfTransRec::Prologue { .. } => TransKind::ProfPrologue,
        }
    }

    /// Start source key
    pub fn src_key(&self) -> SrcKey {
        match self {
            ProfTransRec::Region { sk, .. } | ProfTransRec::Prologue { sk, .. } => *sk,
        }
    }

    /// Last source key. Only region records have one.
    pub fn last_src_key(&self) -> Option<SrcKey> {
        match self {
            ProfTransRec::Region { last_sk, .. } => Some(*last_sk),
            ProfTransRec::Prologue { .. } => None,
        }
    }

    /// Owning function
    pub fn func_id(&self) -> FuncId {
        self.src_key().func_id()
    }

    /// Generated-code size
    pub fn asm_size(&self) -> u32 {
        match self {
            ProfTransRec::Region { asm_size, .. } | ProfTransRec::Prologue { asm_size, .. } => {
                *asm_size
            }
        }
    }

    /// Region descriptor. Only region records have one.
    pub fn region(&self) -> Option<&Arc<RegionDesc>> {
        match self {
            ProfTransRec::Region { region, .. } => Some(region),
            ProfTransRec::Prologue { .. } => None,
        }
    }

    /// Specialized argument count. Only prologue records have one.
    pub fn prologue_args(&self) -> Option<u32> {
        match self {
            ProfTransRec::Prologue { num_args, .. } => Some(*num_args),
            ProfTransRec::Region { .. } => None,
        }
    }

    /// Append a caller to a prologue record.
    ///
    /// Panics on region records; callers are a prologue-only concept.
    pub fn record_caller(&self, caller: TransId, guard: bool) {
        match self {
            ProfTransRec::Prologue { callers, .. } => {
                let mut rec = callers.lock();
                if guard {
                    rec.guard_callers.push(caller);
                } else {
                    rec.main_callers.push(caller);
                }
            }
            ProfTransRec::Region { .. } => panic!("record_caller on a region record"),
        }
    }

    /// Snapshot of the recorded callers. Empty for region records.
    pub fn callers(&self) -> CallerRec {
        match self {
            ProfTransRec::Prologue { callers, .. } => callers.lock().clone(),
            ProfTransRec::Region { .. } => CallerRec::default(),
        }
    }
}
