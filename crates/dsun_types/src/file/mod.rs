//! File format support for the `dsun-rs` project.

mod error;

pub mod bits;
pub mod gff;
pub mod image;
pub mod xmi;

use std::fmt;

// Re-export error types
pub use error::{DsFileError, FileType};

// Re-export main file types
pub use bits::{BitOrder, BitReader};
pub use gff::{File as GffFile, ResourceDescriptor};
pub use image::{extract_frames, AlphaMask, Color, File as ImageFile, Frame, Palette};
pub use xmi::{ControllerKind, File as XmiFile};

/// A four-byte ASCII identifier naming a resource family or chunk.
///
/// Tags are treated as opaque identifiers; a handful of well-known values
/// (`GFFI`, `FORM`, `EVNT`, ...) drive control flow during parsing.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag([u8; 4]);

impl Tag {
	/// Creates a tag from its four bytes.
	pub const fn new(bytes: [u8; 4]) -> Self {
		Self(bytes)
	}

	/// Creates a tag from the first four bytes of a slice, if it has four.
	pub fn from_slice(bytes: &[u8]) -> Option<Self> {
		let bytes: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
		Some(Self(bytes))
	}

	/// Returns the tag's bytes.
	#[inline]
	pub fn as_bytes(&self) -> &[u8; 4] {
		&self.0
	}
}

impl fmt::Display for Tag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for &byte in &self.0 {
			// Non-ASCII bytes in a tag render as '?' rather than garbage.
			let c = if byte.is_ascii_graphic() || byte == b' ' {
				byte as char
			} else {
				'?'
			};
			write!(f, "{c}")?;
		}
		Ok(())
	}
}

impl fmt::Debug for Tag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Tag(\"{self}\")")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_tag_display() {
		assert_eq!(Tag::new(*b"GFFI").to_string(), "GFFI");
		assert_eq!(Tag::new(*b"CAT ").to_string(), "CAT ");
		assert_eq!(Tag::new([0x41, 0xFF, 0x42, 0x00]).to_string(), "A?B?");
	}

	#[test]
	fn test_tag_from_slice() {
		assert_eq!(Tag::from_slice(b"EVNTxxxx"), Some(Tag::new(*b"EVNT")));
		assert_eq!(Tag::from_slice(b"EV"), None);
	}
}
