//! PGO profile registry
//!
//! In-memory catalog of the JIT's profiling translations:
//! - **Records**: region profiles and prologue profiles, indexed by a
//!   monotonically allocated translation id (`rec` module)
//! - **Lookups**: prologues by (function, argument count), default-value
//!   funclets by source key, jump sites, per-function region lists, cached
//!   basic-block terminator offsets (`prof_data` module)
//! - **Counters**: per-translation execution counters with a one-time
//!   post-warmup reset, and the exported `jit.*` service counters
//!   (`counters` module)
//! - **Lifecycle**: a process-wide singleton published with acquire/release
//!   semantics; request handles keep the registry alive across a discard

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Bytecode identities: functions, offsets, source keys
pub mod bytecode;

/// Basic-block boundary derivation
pub mod cfg;

/// Execution and service counters
pub mod counters;

/// The registry and its process-wide lifecycle
pub mod prof_data;

/// Per-translation profiling records
pub mod rec;

/// Region descriptors and post-conditions
pub mod region;

pub use bytecode::{Func, FuncId, Instr, InstrKind, Offset, SrcKey};
pub use prof_data::{
    discard_prof_data, global_prof_data, process_init_prof_data, request_count,
    request_init_prof_data, ProfData, ProfDataConfig, TargetProfileInfo, TargetProfileKey,
};
pub use rec::{CallerRec, ProfTransRec, TransId, TransKind, INVALID_TRANS_ID};
pub use region::{Location, PostConditions, RegionBlock, RegionDesc, TypeAssertion, ValueType};
