//! XMI music file support.
//!
//! XMI files wrap an XMIDI event stream in an IFF-like envelope. Only the
//! chunks the modifications require are interpreted: `EVNT` carries the event
//! stream, `RBRN` the sequence-branch table. Chunk lengths are big-endian;
//! the branch count inside `RBRN` is little-endian.
//!
//! # File Structure
//!
//! - A leading `FORM` chunk (the `XDIR` directory), skipped whole
//! - `CAT ` with a four-byte subtype
//! - `FORM` with a four-byte subtype
//! - Tagged chunks until the end of the file; `EVNT` and `RBRN` are recorded,
//!   everything else is skipped
//!
//! # Usage Examples
//!
//! ```no_run
//! use dsun_types::file::xmi::File;
//!
//! # fn main() -> Result<(), dsun_types::file::DsFileError> {
//! # let xmi_bytes: Vec<u8> = Vec::new();
//! let mut xmi = File::from_bytes(&xmi_bytes)?;
//!
//! xmi.remove_api_control();
//! xmi.unify_loops();
//! xmi.set_all_loops(4);
//!
//! let rewritten = xmi.to_bytes();
//! // The caller writes `rewritten` back to disk.
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::fmt;

use log::trace;

use super::error::{DsFileError, FileType};
use super::Tag;

pub mod event;
mod mutate;

pub use event::ControllerKind;

use event::{scan_events, ControllerLocations};

/// XMI file constants.
mod constants {
	use super::Tag;

	/// Envelope chunk wrapping the directory and the event form
	pub const FORM: Tag = Tag::new(*b"FORM");

	/// Catalogue chunk between the directory and the event form
	pub const CAT: Tag = Tag::new(*b"CAT ");

	/// Chunk carrying the XMIDI event stream
	pub const EVNT: Tag = Tag::new(*b"EVNT");

	/// Chunk carrying the sequence-branch table
	pub const RBRN: Tag = Tag::new(*b"RBRN");
}

/// The recorded `EVNT` chunk: its position, an editable copy of its body,
/// and the indexed controller locations.
#[derive(Debug, Clone)]
struct EvntChunk {
	data_start: usize,
	data: Vec<u8>,
	controller_locations: ControllerLocations,
}

impl EvntChunk {
	fn locations(&self, kind: ControllerKind) -> &BTreeSet<usize> {
		&self.controller_locations[&kind]
	}
}

/// The recorded `RBRN` chunk position and its observed branch count.
#[derive(Debug, Clone, Copy)]
struct RbrnChunk {
	data_start: usize,
	branch_count: u16,
}

/// A parsed XMI file.
///
/// Mutations edit the recorded `EVNT` body; [`File::to_bytes`] splices the
/// edited body back into the whole-file buffer. All edits are byte-precise:
/// nothing moves, so offsets recorded by other tools stay valid.
#[derive(Debug, Clone)]
pub struct File {
	raw: Vec<u8>,
	evnt: Option<EvntChunk>,
	rbrn: Option<RbrnChunk>,
}

impl File {
	/// Parses an XMI file from a byte slice.
	///
	/// # Errors
	///
	/// Returns an error if the envelope is malformed, a chunk is truncated,
	/// or the event stream holds an unsupported system message.
	pub fn from_bytes(data: &[u8]) -> Result<Self, DsFileError> {
		let raw = data.to_vec();

		let mut position = 0;

		// The leading FORM wraps the XDIR directory; skip it whole.
		let (_, directory_length) = read_chunk_header(&raw, &mut position, Some(constants::FORM))?;
		position += directory_length;

		read_chunk_header(&raw, &mut position, Some(constants::CAT))?;
		read_tag(&raw, &mut position)?;

		read_chunk_header(&raw, &mut position, Some(constants::FORM))?;
		read_tag(&raw, &mut position)?;

		let mut evnt = None;
		let mut rbrn = None;
		while position < raw.len() {
			let (tag, length) = read_chunk_header(&raw, &mut position, None)?;

			let body_end = position + length;
			if body_end > raw.len() {
				return Err(DsFileError::malformed_header(
					FileType::Xmi,
					format!("{tag} chunk of {length} bytes truncated at offset {position}"),
				));
			}

			if tag == constants::EVNT {
				let data = raw[position..body_end].to_vec();
				let controller_locations = scan_events(&data)?;
				trace!("EVNT chunk: {} bytes at offset {position}", data.len());
				evnt = Some(EvntChunk {
					data_start: position,
					data,
					controller_locations,
				});
			} else if tag == constants::RBRN {
				if length < 2 {
					return Err(DsFileError::malformed_header(
						FileType::Xmi,
						format!("RBRN chunk of {length} bytes has no branch count"),
					));
				}
				let branch_count = u16::from_le_bytes([raw[position], raw[position + 1]]);
				trace!("RBRN chunk: {branch_count} sequence branches");
				rbrn = Some(RbrnChunk {
					data_start: position,
					branch_count,
				});
			}

			position = body_end;
		}

		Ok(Self {
			raw,
			evnt,
			rbrn,
		})
	}

	/// Returns the absolute range of the event data, if an `EVNT` chunk is
	/// present.
	pub fn evnt_range(&self) -> Option<(usize, usize)> {
		self.evnt.as_ref().map(|evnt| (evnt.data_start, evnt.data.len()))
	}

	/// Returns the current (possibly edited) event data.
	pub fn event_data(&self) -> Option<&[u8]> {
		self.evnt.as_ref().map(|evnt| evnt.data.as_slice())
	}

	/// Returns the event-data-relative offsets of the recognized controller
	/// messages of one kind.
	pub fn controller_locations(&self, kind: ControllerKind) -> Option<&BTreeSet<usize>> {
		self.evnt.as_ref().map(|evnt| evnt.locations(kind))
	}

	/// Returns the sequence-branch count observed in the `RBRN` chunk.
	pub fn rbrn_branch_count(&self) -> Option<u16> {
		self.rbrn.map(|rbrn| rbrn.branch_count)
	}

	/// Returns the absolute offset of the `RBRN` chunk's branch count.
	pub fn rbrn_count_offset(&self) -> Option<usize> {
		self.rbrn.map(|rbrn| rbrn.data_start)
	}

	/// Serializes the file with all edits applied.
	///
	/// The edited event body is written back into its slice of the original
	/// buffer; everything else is preserved bit for bit. The caller is
	/// responsible for writing the result to disk.
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut bytes = self.raw.clone();

		if let Some(evnt) = &self.evnt {
			bytes[evnt.data_start..evnt.data_start + evnt.data.len()].copy_from_slice(&evnt.data);
		}

		bytes
	}
}

impl fmt::Display for File {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"XMI file: {} bytes, {}, {}",
			self.raw.len(),
			match &self.evnt {
				Some(evnt) => format!("EVNT of {} bytes", evnt.data.len()),
				None => "no EVNT".to_string(),
			},
			match &self.rbrn {
				Some(rbrn) => format!("{} sequence branches", rbrn.branch_count),
				None => "no RBRN".to_string(),
			}
		)
	}
}

fn read_chunk_header(
	bytes: &[u8],
	position: &mut usize,
	expected_tag: Option<Tag>,
) -> Result<(Tag, usize), DsFileError> {
	let tag = read_tag(bytes, position)?;

	if let Some(expected) = expected_tag {
		if tag != expected {
			return Err(DsFileError::malformed_header(
				FileType::Xmi,
				format!("expected {expected} chunk, found {tag}"),
			));
		}
	}

	if bytes.len() < *position + 4 {
		return Err(truncated(*position));
	}
	let length = u32::from_be_bytes([
		bytes[*position],
		bytes[*position + 1],
		bytes[*position + 2],
		bytes[*position + 3],
	]);
	*position += 4;

	Ok((tag, length as usize))
}

fn read_tag(bytes: &[u8], position: &mut usize) -> Result<Tag, DsFileError> {
	let tag = bytes
		.get(*position..*position + 4)
		.and_then(Tag::from_slice)
		.ok_or_else(|| truncated(*position))?;
	*position += 4;

	Ok(tag)
}

fn truncated(position: usize) -> DsFileError {
	DsFileError::malformed_header(
		FileType::Xmi,
		format!("XMI envelope truncated at offset {position}"),
	)
}
