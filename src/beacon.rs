//! Beacon runtime support.
//!
//! Everything under `src/beacon/` is the runtime half of the compiler: the
//! data structures and contracts the emitted evaluator is built on. The
//! emitter copies these sources verbatim into the generated project as its
//! `runtime` module (see `emitter/runtime.rs`), which pins down two rules:
//!
//! - **std only.** The generated project must not depend on the compiler or
//!   on the compiler's dependency stack at runtime.
//! - **`super::`-relative imports.** The same text has to resolve both here
//!   (as `crate::beacon::*`) and in the generated tree (as
//!   `crate::runtime::*`), so sibling modules are the only thing these files
//!   may reference.
//!
//! ## How the parts work together
//!
//! ```text
//! CycleRunner::run                 (cycle.rs)
//!   ├─ Store::read_batch              one batched fetch per cycle
//!   ├─ SensorBuffers::record          (buffers.rs) configured sensors only
//!   ├─ Evaluate::evaluate             generated coordinator → generated groups
//!   │    ├─ SensorValues              (values.rs) inputs["x"] / outputs["y"] = …
//!   │    ├─ SensorBuffers::is_at_or_above_threshold_for
//!   │    ├─ math::*                   (math.rs) whitelisted functions
//!   │    └─ Host::send_message        fire-and-forget message seam
//!   ├─ Store::write_batch             one batched write per cycle
//!   └─ sleep(max(0, cycle_time − elapsed))
//! ```
//!
//! The generated group and coordinator files are *not* here (they are pure
//! emitter output), but their entire vocabulary is.

pub mod buffers;
pub mod cycle;
pub mod math;
pub mod values;

pub use buffers::{Sample, SensorBuffers, TemporalBuffer};
pub use cycle::{CycleError, CycleRunner, EvalError, Evaluate, Host, Store, StoreError};
pub use values::SensorValues;
