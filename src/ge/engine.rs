use crate::foundation::error::{GefxError, GefxResult};
use crate::ge::op::CompositingOp;
use crate::memory::pool::DeviceMemory;

/// An op that failed while the engine executed it.
#[derive(Debug)]
pub struct OpFailure {
    /// Position of the op within the synchronised batch.
    pub index: usize,
    /// Op kind, for logs.
    pub kind: &'static str,
    /// What went wrong.
    pub error: GefxError,
}

/// Outcome of waiting for the engine.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Ops that ran to completion.
    pub executed: usize,
    /// Ops that failed; the rest of the batch still ran.
    pub failures: Vec<OpFailure>,
}

impl SyncReport {
    /// `true` when every op completed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Engine counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GeStats {
    /// Ops accepted by `submit`.
    pub submitted: u64,
    /// Ops handed to the hardware by `emit`.
    pub emitted: u64,
    /// Ops that completed.
    pub executed: u64,
    /// Ops that failed during execution.
    pub failed: u64,
    /// Calls to `sync`.
    pub syncs: u64,
}

/// Hardware compositing engine contract.
///
/// The call order for any batch is `submit` (one or more), `emit`, then `sync`. Between `emit`
/// and `sync` every buffer referenced by the emitted ops is busy: the CPU must not touch it and
/// dependent ops must not be started. Inputs must be flushed before `emit`.
pub trait GraphicsEngine {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Validate and queue one op. Invalid ops are rejected with `InvalidOp` and not queued.
    fn submit(&mut self, op: CompositingOp) -> GefxResult<()>;

    /// Hand every queued op to the hardware. Returns how many were emitted.
    fn emit(&mut self, mem: &mut DeviceMemory) -> GefxResult<usize>;

    /// Block until every emitted op has completed.
    fn sync(&mut self, mem: &mut DeviceMemory) -> SyncReport;

    /// `true` when nothing is queued or in flight.
    fn is_idle(&self) -> bool;

    /// Counters since creation.
    fn stats(&self) -> GeStats;
}

/// Available engine implementations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GeKind {
    /// Host-memory engine executing ops at sync time.
    #[default]
    Soft,
}

/// Create a compositing engine.
pub fn create_engine(kind: GeKind) -> GefxResult<Box<dyn GraphicsEngine>> {
    match kind {
        GeKind::Soft => Ok(Box::new(crate::ge::soft::SoftEngine::new())),
    }
}

/// Submit `ops` in order, emit them and wait for completion.
///
/// The whole batch is validated first, so an invalid op queues nothing. Execution failures are
/// returned in the report.
pub fn run_ops<G: GraphicsEngine + ?Sized>(
    ge: &mut G,
    mem: &mut DeviceMemory,
    ops: impl IntoIterator<Item = CompositingOp>,
) -> GefxResult<SyncReport> {
    let ops: Vec<CompositingOp> = ops.into_iter().collect();
    for op in &ops {
        op.validate()?;
    }
    for op in ops {
        ge.submit(op)?;
    }
    ge.emit(mem)?;
    Ok(ge.sync(mem))
}
