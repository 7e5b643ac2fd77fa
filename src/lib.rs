//! `dsun-rs` is a toolkit for reading and modifying the resource files of
//! the Dark Sun CRPGs: GFF resource archives, multi-frame image resources,
//! and XMI music files.
//!
//! All format logic lives in [`dsun_types`]; this crate re-exports it.

pub use dsun_types::*;
