//! Purpose: Library crate behind the `bcp2pg` CLI and its tests.
//! Exports: `api` (model, sources, row reader) and `copy_text`.
//! Role: Decodes BCP native table dumps into text rows; the binary adds I/O policy.
//! Invariants: Decoding is pure over an `io::Read`; no globals or hidden state.
//! Invariants: Callers should prefer `api`; `core` stays public for tests and tools.
pub mod api;
pub mod copy_text;
pub mod core;
