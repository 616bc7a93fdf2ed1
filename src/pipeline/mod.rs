//! Multi-block-size analysis pipeline
//!
//! This module implements the streaming fan-out that turns a directory of
//! data files into per-block-size dedup and compression statistics.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  file paths  ┌──────────────┐  outer buffers ┌──────────────┐
//! │  Coordinator  │─────────────▶│ Splitter pool │───────────────▶│ Hasher pool   │
//! │  (enumerate,  │              │ (read files   │               │ (slice, SHA-  │
//! │   wire, join) │              │  into pooled  │               │  256, zlib    │
//! └──────┬───────┘              │  buffers)     │               │  length)      │
//!        │                      └──────▲───────┘               └──────┬───────┘
//!        │                             │      buffer pool             │ records
//!        │                             └───────(recycled)◀────────────┤
//!        │                                                            ▼
//!        │        Bloom filters from iteration i-1            ┌──────────────┐
//!        └───────────────────────────────────────────────────▶│  Aggregator   │
//!                                                             │ (hash logs +  │
//!                                                             │  statistics)  │
//!                                                             └──────────────┘
//! ```
//!
//! All stages share one unbounded error channel drained by the
//! [`collector::ErrorCollector`]; termination cascades through channel
//! closes, never timeouts.

pub(crate) mod aggregator;
pub(crate) mod buffer;
pub(crate) mod collector;
pub mod coordinator;
pub mod hasher;
pub(crate) mod splitter;

pub(crate) use aggregator::spawn_aggregator;
pub(crate) use hasher::spawn_hashers;
pub(crate) use splitter::spawn_splitters;

pub use coordinator::BlockScan;
pub use hasher::{split_blocks, BlockRecord};
