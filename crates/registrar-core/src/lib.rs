//! # ferrosip-registrar-core
//!
//! RFC 3261 §10 registrar for the ferrosip stack, with the Path (RFC 3327),
//! Outbound (RFC 5626) and GRUU (RFC 5627) extensions.
//!
//! The registrar keeps one set of bound contacts per address-of-record,
//! negotiates expiry and q preferences, mints public and temporary GRUUs,
//! and binds outbound flows through synthesized Path entries.
//!
//! ## Structure
//!
//! - [`types`]: [`RegContact`] and its replacement key [`ContactIndex`]
//! - [`store`]: the pluggable [`RegStore`] backend plus the in-memory
//!   default
//! - [`gruu`]: the symmetric envelope for temporary GRUU user parts
//! - [`flow`]: the outbound flow registry seam
//! - [`registrar`]: the REGISTER engine and the find/qfind/is_registered
//!   queries proxies fork on
//!
//! ## Storage model
//!
//! Writes are a single `put` per AOR: either the whole updated contact set
//! is committed or nothing is. Expiry is lazy: readers filter entries
//! whose `expire` has passed.

pub mod config;
pub mod flow;
pub mod gruu;
pub mod registrar;
pub mod store;
pub mod types;

pub use config::RegistrarConfig;
pub use flow::{FlowRegistry, MemoryFlowRegistry, NoFlows};
pub use gruu::{GruuCodec, TempGruuTerm};
pub use registrar::Registrar;
pub use store::{DelOutcome, MemoryStore, RegStore, StoreError};
pub use types::{ContactIndex, RegContact};
