//! Minimal bytecode identities the registry is keyed by.
//!
//! The registry doesn't interpret bytecode; it only needs stable identities
//! for functions and positions (`FuncId`, `SrcKey`) and enough instruction
//! shape (`Instr`) to derive basic-block boundaries on demand.

/// Identifier of a function within the running process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub u32);

impl FuncId {
    /// Raw integer form, used as a map key
    pub fn to_int(self) -> u32 {
        self.0
    }
}

/// Bytecode offset within a function
pub type Offset = u32;

/// A position in a function's bytecode.
///
/// Plain keys name an instruction offset. Function-entry keys name one of
/// the function's entry points: entry offset 0 is the main entry, a nonzero
/// entry offset is a default-value funclet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SrcKey {
    func: FuncId,
    offset: Offset,
    func_entry: bool,
}

impl SrcKey {
    /// Key for the instruction at `offset`
    pub fn at(func: FuncId, offset: Offset) -> Self {
        SrcKey { func, offset, func_entry: false }
    }

    /// Key for a function entry point at `entry_offset`
    pub fn func_entry(func: FuncId, entry_offset: Offset) -> Self {
        SrcKey { func, offset: entry_offset, func_entry: true }
    }

    /// Owning function
    pub fn func_id(self) -> FuncId {
        self.func
    }

    /// Bytecode offset (entry offset for function-entry keys)
    pub fn offset(self) -> Offset {
        self.offset
    }

    /// Entry offset. Only meaningful for function-entry keys.
    pub fn entry_offset(self) -> Offset {
        debug_assert!(self.func_entry);
        self.offset
    }

    /// Whether this is a function-entry key
    pub fn is_func_entry(self) -> bool {
        self.func_entry
    }

    /// Pack into a single integer, usable as a concurrent-map key
    pub fn to_atomic_int(self) -> u64 {
        (u64::from(self.func.0) << 33)
            | (u64::from(self.offset) << 1)
            | u64::from(self.func_entry)
    }
}

/// Control-flow shape of one instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrKind {
    /// Falls through to the next instruction
    Simple,
    /// Unconditional jump
    Jmp {
        /// Jump target offset
        target: Offset,
    },
    /// Conditional jump: taken target plus fallthrough
    JmpCond {
        /// Taken-branch target offset
        target: Offset,
    },
    /// Returns from the function
    Ret,
    /// Unwinds out of the function
    Throw,
}

/// One bytecode instruction: its position, size, and control-flow shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instr {
    /// Offset of the instruction
    pub offset: Offset,
    /// Encoded size in bytes
    pub len: u32,
    /// Control-flow shape
    pub kind: InstrKind,
}

impl Instr {
    /// Whether control flow cannot fall through past this instruction
    pub fn is_terminator(&self) -> bool {
        matches!(self.kind, InstrKind::Jmp { .. } | InstrKind::Ret | InstrKind::Throw)
    }

    /// Whether this instruction ends a basic block
    pub fn ends_block(&self) -> bool {
        !matches!(self.kind, InstrKind::Simple)
    }

    /// Branch target, if the instruction has one
    pub fn target(&self) -> Option<Offset> {
        match self.kind {
            InstrKind::Jmp { target } | InstrKind::JmpCond { target } => Some(target),
            _ => None,
        }
    }
}

/// A function's identity and bytecode, as the registry sees it
#[derive(Debug, Clone)]
pub struct Func {
    id: FuncId,
    name: String,
    num_non_variadic_params: u32,
    /// Entry offsets of default-value funclets, in parameter order
    dv_entries: Vec<Offset>,
    instrs: Vec<Instr>,
}

impl Func {
    /// Create a function record
    pub fn new(
        id: FuncId,
        name: impl Into<String>,
        num_non_variadic_params: u32,
        dv_entries: Vec<Offset>,
        instrs: Vec<Instr>,
    ) -> Self {
        Func { id, name: name.into(), num_non_variadic_params, dv_entries, instrs }
    }

    /// Function id
    pub fn id(&self) -> FuncId {
        self.id
    }

    /// Fully qualified name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of declared non-variadic parameters
    pub fn num_non_variadic_params(&self) -> u32 {
        self.num_non_variadic_params
    }

    /// Whether `offset` is a default-value funclet entry
    pub fn is_dv_entry(&self, offset: Offset) -> bool {
        self.dv_entries.contains(&offset)
    }

    /// Bytecode instructions in offset order
    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }
}
