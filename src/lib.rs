//! cull: benchmark engine for predicate-filtered ANN search.
//!
//! Given a vector index over a base set and a stream of queries that each
//! carry a similarity vector plus a scalar predicate (an integer range over
//! base ids or an attribute-equality tuple), this crate measures recall,
//! latency, throughput and memory across sweeps of concurrency level and
//! probe depth, comparing two execution strategies:
//!
//! - per-query filtering: each query compiles its own bitmap and issues a
//!   single filtered search, data-parallel across a worker pool;
//! - grouped batching: queries sharing a value-equal predicate compile one
//!   bitmap and share one batched index call.
//!
//! The ANN index itself is an external collaborator behind
//! [`ann::FilteredAnnIndex`]; an exact [`ann::FlatIndex`] ships in-tree so
//! the engine runs and tests without the wrapped library.

pub mod ann;
pub mod benchmark;
pub mod error;
pub mod filtering;
pub mod io;
pub mod predicate;
pub mod search;

pub use ann::{FilteredAnnIndex, FlatIndex};
pub use benchmark::{Harness, ProbeReport, SweepConfig, TrialSelection};
pub use error::{BenchError, Result};
pub use filtering::{compile_bitmap, group_by_predicate, Bitmap};
pub use predicate::{BaseLabels, Predicate, Query};
pub use search::{ExecMode, SearchExecutor, TrialOutput};
