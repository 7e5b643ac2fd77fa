//! Error types for file format parsing and manipulation.
//!
//! This module provides a unified error handling system using [`DsFileError`]
//! for all file formats supported by dsun-rs. Every failure is fatal at the
//! call site; the formats perform no recovery of their own.

use thiserror::Error;

use super::Tag;

/// Unified error type for all file format operations
#[derive(Debug, Error)]
pub enum DsFileError {
	/// An expected tag or header field is missing or garbled
	#[error("{file_type} error: malformed header: {detail}")]
	MalformedHeader {
		/// File type that encountered the error
		file_type: FileType,
		/// What was expected and what was found
		detail: String,
	},

	/// An offset, length, or index exceeds the data it refers to
	#[error("{file_type} error: out of range: {detail}")]
	OutOfRange {
		/// File type that encountered the error
		file_type: FileType,
		/// The violated bound
		detail: String,
	},

	/// Resource lookup failed
	#[error("no resource {tag}-{number} in GFF file")]
	NoSuchResource {
		/// Tag of the requested resource
		tag: Tag,
		/// Number of the requested resource
		number: u32,
	},

	/// The XMI event scan met an unsupported system status byte
	#[error("unhandled system message: 0x{status:02X}")]
	UnhandledStatus {
		/// The offending status byte
		status: u8,
	},

	/// A caller-supplied argument violates a precondition
	#[error("invalid argument: {detail}")]
	InvalidArgument {
		/// The violated precondition
		detail: String,
	},
}

impl DsFileError {
	/// Returns the file type associated with this error, if any
	pub fn file_type(&self) -> Option<FileType> {
		match self {
			Self::MalformedHeader {
				file_type,
				..
			}
			| Self::OutOfRange {
				file_type,
				..
			} => Some(*file_type),
			Self::NoSuchResource {
				..
			} => Some(FileType::Gff),
			Self::UnhandledStatus {
				..
			} => Some(FileType::Xmi),
			Self::InvalidArgument {
				..
			} => None,
		}
	}

	/// Returns true if this is a malformed header error
	pub fn is_malformed_header(&self) -> bool {
		matches!(self, Self::MalformedHeader { .. })
	}

	/// Returns true if this is an out of range error
	pub fn is_out_of_range(&self) -> bool {
		matches!(self, Self::OutOfRange { .. })
	}

	/// Returns true if this is a failed resource lookup
	pub fn is_no_such_resource(&self) -> bool {
		matches!(self, Self::NoSuchResource { .. })
	}

	/// Returns true if this is an unhandled status byte error
	pub fn is_unhandled_status(&self) -> bool {
		matches!(self, Self::UnhandledStatus { .. })
	}

	/// Returns true if this is an invalid argument error
	pub fn is_invalid_argument(&self) -> bool {
		matches!(self, Self::InvalidArgument { .. })
	}

	/// Create a malformed header error
	pub fn malformed_header(file_type: FileType, detail: impl Into<String>) -> Self {
		Self::MalformedHeader {
			file_type,
			detail: detail.into(),
		}
	}

	/// Create an out of range error
	pub fn out_of_range(file_type: FileType, detail: impl Into<String>) -> Self {
		Self::OutOfRange {
			file_type,
			detail: detail.into(),
		}
	}

	/// Create a failed resource lookup error
	pub fn no_such_resource(tag: Tag, number: u32) -> Self {
		Self::NoSuchResource {
			tag,
			number,
		}
	}

	/// Create an invalid argument error
	pub fn invalid_argument(detail: impl Into<String>) -> Self {
		Self::InvalidArgument {
			detail: detail.into(),
		}
	}
}

/// File type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
	/// GFF resource archive
	Gff,
	/// Multi-frame image resource
	Image,
	/// XMI music file
	Xmi,
}

impl FileType {
	/// Returns a human-readable description of this file type
	pub fn description(&self) -> &'static str {
		match self {
			FileType::Gff => "Tagged resource archive",
			FileType::Image => "Multi-frame image resource",
			FileType::Xmi => "XMIDI music file",
		}
	}
}

impl std::fmt::Display for FileType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			FileType::Gff => write!(f, "GFF"),
			FileType::Image => write!(f, "Image"),
			FileType::Xmi => write!(f, "XMI"),
		}
	}
}
