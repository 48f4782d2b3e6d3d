//! Commit-lifecycle hook for newly inserted solves.
//!
//! The announcer must run exactly once per committed solve, after the
//! transaction is durable, against a query context that already sees the
//! committed rows. This module re-expresses the persistence-event plumbing as
//! an explicit unit-of-work wrapper.
//!
//! ## Architecture
//!
//! - `pending`: per-transaction accumulator of captured solve ids
//! - `session`: transaction wrapper threading the accumulator through
//!   insert/commit/rollback, plus the post-commit dispatch into the evaluator
//!
//! ## Lifecycle
//!
//! 1. The host begins a [`SolveSession`] instead of a bare transaction.
//! 2. Solve inserts inside the session capture their ids into the accumulator.
//! 3. `rollback()` (or dropping the session) discards the accumulator.
//! 4. `commit()` commits first, then drains the accumulator and evaluates each
//!    id on a fresh pool connection. Evaluation failures are logged and
//!    swallowed; they never reach the commit path of the triggering request.

pub mod pending;
pub mod session;

// Public API exports
pub use pending::PendingSolves;
pub use session::{FirstBloodHook, SolveSession};
