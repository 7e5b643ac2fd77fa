//! This crate provides core data types and binary file format support for
//! the `dsun-rs` project.
//!
//! # File Formats
//!
//! - **GFF**: Tagged resource archives holding the game's images, maps,
//!   scripts, and music under four-byte tags
//! - **Image**: Multi-frame image resources in three encodings (row-based
//!   run-length plus the `PLAN` and `PLNR` planar dictionary codecs), with
//!   palettes stored at 6-bit DAC precision
//! - **XMI**: XMIDI music files, scanned and edited byte-precisely to tame
//!   their loop and callback controllers
//!
//! # Examples
//!
//! ```no_run
//! use dsun_types::file::{GffFile, Tag, extract_frames};
//!
//! # fn main() -> Result<(), dsun_types::file::DsFileError> {
//! # let gff_bytes: Vec<u8> = Vec::new();
//! let gff = GffFile::from_bytes(&gff_bytes)?;
//!
//! let image_bytes = gff.get_resource(Tag::new(*b"BMP "), 1)?;
//! for frame in extract_frames(&image_bytes)? {
//! 	println!("{}x{}", frame.width(), frame.height());
//! }
//! # Ok(())
//! # }
//! ```

pub mod file;
pub mod prelude;

// Re-export commonly used file types at crate root for convenience
pub use file::{
	BitOrder, BitReader, Color, ControllerKind, DsFileError, FileType, Frame, GffFile, ImageFile,
	Palette, ResourceDescriptor, Tag, XmiFile,
};
