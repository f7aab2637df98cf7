//! The PGO registry: an append-only indexed table of profiling translation
//! records with the auxiliary lookup maps the JIT queries during region
//! selection and retranslation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::bytecode::{Func, FuncId, Offset, SrcKey};
use crate::cfg;
use crate::counters::{service, ProfCounters};
use crate::rec::{ProfTransRec, TransId, TransKind, INVALID_TRANS_ID};
use crate::region::{PostConditions, RegionDesc};

/// Registry configuration
#[derive(Debug, Clone)]
pub struct ProfDataConfig {
    /// Whether PGO is enabled at all
    pub pgo: bool,
    /// Initial value of per-translation execution counters
    pub pgo_threshold: i64,
    /// Request count after which counters are reset once
    pub reset_counters_request: u64,
    /// Server mode disables counter decay (counters start saturated)
    pub server_mode: bool,
    /// Expected number of profiled functions, used to size the maps
    pub func_count_hint: usize,
    /// Retain the registry's storage for the process lifetime after a
    /// discard, instead of reclaiming it with the last request handle
    pub keep_prof_data: bool,
}

impl Default for ProfDataConfig {
    fn default() -> Self {
        ProfDataConfig {
            pgo: true,
            pgo_threshold: 2000,
            reset_counters_request: 50,
            server_mode: false,
            func_count_hint: 1024,
            keep_prof_data: false,
        }
    }
}

/// Key of a per-translation optimization-target profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetProfileKey {
    /// Owning translation
    pub trans_id: TransId,
    /// Profile name (e.g. the instruction or helper being profiled)
    pub name: String,
}

/// One recorded optimization-target profile observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetProfileInfo {
    /// Profile key
    pub key: TargetProfileKey,
    /// Human-readable rendering of the profiled data
    pub debug_info: String,
}

/// In-memory catalog of per-translation profiling records.
///
/// Shared/exclusive locking mirrors the access pattern: the record table and
/// target-profile map take a `RwLock`, the per-function region list takes an
/// exclusive `Mutex`, and the pure lookup tables are concurrent maps.
pub struct ProfData {
    config: ProfDataConfig,
    counters: ProfCounters,
    counters_reset: AtomicBool,

    trans_recs: RwLock<Vec<Option<Arc<ProfTransRec>>>>,
    func_prof_trans: Mutex<FxHashMap<FuncId, Vec<TransId>>>,

    prologue_db: DashMap<(FuncId, u32), TransId>,
    dv_funclet_db: DashMap<u64, TransId>,
    jmp_to_trans_id: DashMap<usize, TransId>,
    block_end_offsets: DashMap<u32, Arc<FxHashSet<Offset>>>,

    profiling_funcs: DashSet<FuncId>,
    optimized_funcs: DashSet<FuncId>,
    optimized_sks: DashSet<u64>,

    target_profiles: RwLock<FxHashMap<TransId, Vec<TargetProfileInfo>>>,
}

impl ProfData {
    /// Create a registry with the given configuration
    pub fn new(config: ProfDataConfig) -> Self {
        // Server mode keeps counters saturated so nothing retranslates off
        // profile before the reset request threshold.
        let initial = if config.server_mode { i64::MAX } else { config.pgo_threshold };
        ProfData {
            counters: ProfCounters::new(initial),
            counters_reset: AtomicBool::new(false),
            trans_recs: RwLock::new(Vec::new()),
            func_prof_trans: Mutex::new(FxHashMap::default()),
            prologue_db: DashMap::with_capacity(config.func_count_hint * 2),
            dv_funclet_db: DashMap::with_capacity(config.func_count_hint * 2),
            jmp_to_trans_id: DashMap::with_capacity(config.func_count_hint * 10),
            block_end_offsets: DashMap::with_capacity(config.func_count_hint),
            profiling_funcs: DashSet::with_capacity(config.func_count_hint),
            optimized_funcs: DashSet::with_capacity(config.func_count_hint),
            optimized_sks: DashSet::with_capacity(config.func_count_hint),
            target_profiles: RwLock::new(FxHashMap::default()),
            config,
        }
    }

    /// Registry configuration
    pub fn config(&self) -> &ProfDataConfig {
        &self.config
    }

    /// Allocate the next translation id
    pub fn alloc_trans_id(&self) -> TransId {
        let mut recs = self.trans_recs.write();
        recs.push(None);
        let id = (recs.len() - 1) as TransId;
        self.counters.ensure(id);
        id
    }

    /// Number of allocated translation ids
    pub fn num_trans_recs(&self) -> usize {
        self.trans_recs.read().len()
    }

    /// Record for `id`, if one has been installed
    pub fn trans_rec(&self, id: TransId) -> Option<Arc<ProfTransRec>> {
        self.trans_recs.read().get(id as usize)?.clone()
    }

    /// Install a region-profile record.
    ///
    /// The region must consist of exactly one block starting at the region's
    /// start key. The entry block is renumbered to `trans_id`, the
    /// post-conditions attach to the last block, and default-value-funclet
    /// entries are indexed for lookup. The record becomes visible in the
    /// table before it is appended to the per-function list, so readers that
    /// find the id in the list always see the record.
    pub fn add_trans_profile(
        &self,
        trans_id: TransId,
        func: &Func,
        mut region: RegionDesc,
        pconds: PostConditions,
        asm_size: u32,
    ) {
        assert!(!region.is_empty());
        assert_eq!(region.blocks().len(), 1);
        let last_sk = region.last_src_key();
        let start_sk = region.start();

        region.renumber_block(region.entry().id(), trans_id);
        for b in region.blocks_mut() {
            b.set_prof_trans_id(trans_id);
        }
        if let Some(last) = region.blocks_mut().last_mut() {
            last.set_post_conds(pconds);
        }

        let func_id = start_sk.func_id();
        if start_sk.is_func_entry() && start_sk.entry_offset() != 0 {
            assert!(func.is_dv_entry(start_sk.entry_offset()));
            // DV funclets normally have a single translation; functions with
            // retranslated funclets keep the id of the first one.
            self.dv_funclet_db.entry(start_sk.to_atomic_int()).or_insert(trans_id);
        }

        {
            let mut recs = self.trans_recs.write();
            recs[trans_id as usize] =
                Some(Arc::new(ProfTransRec::new_region(last_sk, start_sk, Arc::new(region), asm_size)));
        }

        let mut func_trans = self.func_prof_trans.lock();
        func_trans.entry(func_id).or_default().push(trans_id);
    }

    /// Install a prologue-profile record for `n_args`.
    ///
    /// Panics if a prologue for (function, argument count) was already
    /// installed; duplicate insertion is a contract violation.
    pub fn add_trans_prof_prologue(
        &self,
        trans_id: TransId,
        sk: SrcKey,
        n_args: u32,
        asm_size: u32,
    ) {
        match self.prologue_db.entry((sk.func_id(), n_args)) {
            Entry::Occupied(e) => panic!(
                "attempting to insert prologue {} (func: {:?}, args: {}) but found prologue {}",
                trans_id,
                sk.func_id(),
                n_args,
                e.get()
            ),
            Entry::Vacant(v) => {
                v.insert(trans_id);
            }
        }

        let mut recs = self.trans_recs.write();
        recs[trans_id as usize] = Some(Arc::new(ProfTransRec::new_prologue(sk, n_args, asm_size)));
    }

    /// Translation id of the prologue for calling `func` with `n_args`.
    ///
    /// Calls with more arguments than declared parameters share one
    /// prologue, so the argument count clamps to `params + 1`.
    pub fn prologue_trans_id(&self, func: &Func, n_args: u32) -> TransId {
        let num_params = func.num_non_variadic_params();
        let n_args = n_args.min(num_params + 1);
        self.prologue_db
            .get(&(func.id(), n_args))
            .map(|e| *e.value())
            .unwrap_or(INVALID_TRANS_ID)
    }

    /// Translation id of the default-value funclet entered at `sk`
    pub fn dv_funclet_trans_id(&self, sk: SrcKey) -> TransId {
        assert!(sk.is_func_entry());
        self.dv_funclet_db
            .get(&sk.to_atomic_int())
            .map(|e| *e.value())
            .unwrap_or(INVALID_TRANS_ID)
    }

    /// Profiling translations installed for `func_id`, in install order
    pub fn func_prof_trans(&self, func_id: FuncId) -> Vec<TransId> {
        self.func_prof_trans.lock().get(&func_id).cloned().unwrap_or_default()
    }

    /// Associate a jump site with the translation it targets
    pub fn set_jmp_trans_id(&self, jmp_addr: usize, id: TransId) {
        self.jmp_to_trans_id.insert(jmp_addr, id);
    }

    /// Translation targeted by the jump at `jmp_addr`
    pub fn jmp_trans_id(&self, jmp_addr: usize) -> TransId {
        self.jmp_to_trans_id
            .get(&jmp_addr)
            .map(|e| *e.value())
            .unwrap_or(INVALID_TRANS_ID)
    }

    /// Whether any basic block of `func` ends at `offset`.
    ///
    /// The terminator-offset set is derived from the control-flow graph on
    /// first query and cached per function.
    pub fn any_block_ends_at(&self, func: &Func, offset: Offset) -> bool {
        let ends = self
            .block_end_offsets
            .entry(func.id().to_int())
            .or_insert_with(|| Arc::new(cfg::block_end_offsets(func)))
            .clone();
        ends.contains(&offset)
    }

    // ── Profiling / optimization state ──────────────────────────────────

    /// Mark `func_id` as currently being profiled
    pub fn mark_func_profiling(&self, func_id: FuncId) {
        self.profiling_funcs.insert(func_id);
    }

    /// Whether `func_id` is being profiled
    pub fn is_func_profiling(&self, func_id: FuncId) -> bool {
        self.profiling_funcs.contains(&func_id)
    }

    /// Mark `func_id` as fully optimized, bumping `jit.optimized_funcs`
    pub fn mark_func_optimized(&self, func_id: FuncId) {
        if self.optimized_funcs.insert(func_id) {
            service::bump_optimized_funcs();
        }
    }

    /// Whether `func_id` has been optimized
    pub fn is_func_optimized(&self, func_id: FuncId) -> bool {
        self.optimized_funcs.contains(&func_id)
    }

    /// Mark the source key as covered by an optimized translation
    pub fn mark_src_key_optimized(&self, sk: SrcKey) {
        self.optimized_sks.insert(sk.to_atomic_int());
    }

    /// Whether the source key is covered by an optimized translation
    pub fn is_src_key_optimized(&self, sk: SrcKey) -> bool {
        self.optimized_sks.contains(&sk.to_atomic_int())
    }

    // ── Execution counters ──────────────────────────────────────────────

    /// Current execution counter of translation `id`
    pub fn trans_counter(&self, id: TransId) -> i64 {
        self.counters.get(id)
    }

    /// Decrement the execution counter of translation `id`
    pub fn decrement_trans_counter(&self, id: TransId) -> i64 {
        self.counters.decrement(id)
    }

    /// Reset all execution counters to the PGO threshold, once per process,
    /// after `request_count` passes the configured request threshold.
    pub fn maybe_reset_counters(&self, request_count: u64) {
        if self.counters_reset.load(Ordering::Acquire) {
            return;
        }
        if request_count < self.config.reset_counters_request {
            return;
        }

        let _lock = self.trans_recs.write();
        if self.counters_reset.load(Ordering::Acquire) {
            return;
        }
        self.counters.reset_all(self.config.pgo_threshold);
        self.counters_reset.store(true, Ordering::Release);
    }

    /// Whether the one-time counter reset has happened
    pub fn counters_were_reset(&self) -> bool {
        self.counters_reset.load(Ordering::Acquire)
    }

    // ── Target profiles ─────────────────────────────────────────────────

    /// Record an optimization-target profile observation
    pub fn add_target_profile(&self, info: TargetProfileInfo) {
        let mut profiles = self.target_profiles.write();
        profiles.entry(info.key.trans_id).or_default().push(info);
    }

    /// Observations recorded for translation `trans_id`
    pub fn target_profiles(&self, trans_id: TransId) -> Vec<TargetProfileInfo> {
        self.target_profiles.read().get(&trans_id).cloned().unwrap_or_default()
    }
}

// ── Process-wide singleton ──────────────────────────────────────────────

static PROF_DATA: RwLock<Option<Arc<ProfData>>> = RwLock::new(None);
static KEPT_PROF_DATA: Mutex<Option<Arc<ProfData>>> = Mutex::new(None);
static REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);

/// Create and publish the global registry. No-op when PGO is disabled.
pub fn process_init_prof_data(config: ProfDataConfig) {
    if !config.pgo {
        return;
    }
    *PROF_DATA.write() = Some(Arc::new(ProfData::new(config)));
}

/// Handle to the global registry for the duration of a request.
///
/// The returned `Arc` keeps the registry alive even if it is discarded
/// mid-request, so in-flight readers are never invalidated.
pub fn request_init_prof_data() -> Option<Arc<ProfData>> {
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);
    PROF_DATA.read().clone()
}

/// Number of requests that have attached to the registry
pub fn request_count() -> u64 {
    REQUEST_COUNT.load(Ordering::Relaxed)
}

/// The global registry, if profiling is active
pub fn global_prof_data() -> Option<Arc<ProfData>> {
    PROF_DATA.read().clone()
}

/// Unpublish the global registry.
///
/// New requests see no registry immediately; the storage is reclaimed when
/// the last outstanding request handle drops. With `keep_prof_data` set the
/// registry is parked instead and stays alive for the rest of the process.
pub fn discard_prof_data() {
    let taken = PROF_DATA.write().take();
    if let Some(pd) = taken {
        if pd.config.keep_prof_data {
            *KEPT_PROF_DATA.lock() = Some(pd);
        }
    }
}
