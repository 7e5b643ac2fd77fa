//! Prelude module for `dsun_types`.
//!
//! This module provides a convenient way to import commonly used types,
//! traits, and constants.
//!
//! # Examples
//!
//! ```no_run
//! use dsun_types::prelude::*;
//!
//! # fn main() -> Result<(), DsFileError> {
//! # let bytes: Vec<u8> = Vec::new();
//! let gff = GffFile::from_bytes(&bytes)?;
//! let frames = extract_frames(&gff.get_resource(Tag::new(*b"BMP "), 1)?)?;
//! # Ok(())
//! # }
//! ```

// File module types
#[doc(inline)]
pub use crate::file::{
	extract_frames,

	AlphaMask,
	// Bit reading
	BitOrder,
	BitReader,

	Color,
	// XMI types
	ControllerKind,
	// Error types
	DsFileError,
	FileType,

	// Image types
	Frame,
	// GFF types
	GffFile,
	ImageFile,
	Palette,
	ResourceDescriptor,

	Tag,
	XmiFile,
};

// Re-export the file module for advanced usage
#[doc(inline)]
pub use crate::file;
