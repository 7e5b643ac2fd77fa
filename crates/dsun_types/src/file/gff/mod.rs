//! GFF resource archive support.
//!
//! GFF files are tagged resource archives: a header points at an index area
//! whose records map four-byte tags to tables of `(resource number, offset,
//! size)` entries. Resource data lives wherever the entries point.
//!
//! # File Structure
//!
//! - **Header:** a little-endian 32-bit index start position at offset 12
//! - **Index area:** two skipped 32-bit fields, a 16-bit tag count, then one
//!   variable-size record per tag
//! - **Primary record:** the tag followed by an inline table with 12-byte
//!   entries carrying the resource number explicitly
//! - **Secondary record:** the tag followed by a reference into the `GFFI`
//!   table (which locates the actual 8-byte-entry table elsewhere in the
//!   file) and by the numbering segments assigning resource numbers
//!
//! # Usage Examples
//!
//! ```no_run
//! use dsun_types::file::gff::File;
//! use dsun_types::file::Tag;
//!
//! # fn main() -> Result<(), dsun_types::file::DsFileError> {
//! # let gff_bytes: Vec<u8> = Vec::new();
//! let gff = File::from_bytes(&gff_bytes)?;
//!
//! for descriptor in gff.describe_resources() {
//! 	println!(
//! 		"{}-{} at {:#X}, {} bytes",
//! 		descriptor.tag, descriptor.number, descriptor.offset, descriptor.size
//! 	);
//! }
//!
//! let tile = gff.get_resource(Tag::new(*b"TILE"), 42)?;
//! let rewritten = gff.replace_resource(Tag::new(*b"TILE"), 42, &tile)?;
//! // The caller writes `rewritten` back to disk.
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, trace};

use super::error::{DsFileError, FileType};
use super::Tag;

mod table;

use table::{GffiTable, NumberingSegment};

/// GFF file constants.
mod constants {
	use super::Tag;

	/// Offset of the index start position in the file header
	pub const INDEX_POINTER_OFFSET: usize = 12;

	/// Reserved tag whose primary table locates the secondary tables
	pub const GFFI: Tag = Tag::new(*b"GFFI");
}

/// Describes one resource of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
	/// Tag of the resource's family
	pub tag: Tag,
	/// Resource number within the tag's namespace
	pub number: u32,
	/// Absolute offset of the resource data
	pub offset: u32,
	/// Size of the resource data in bytes
	pub size: u32,
}

impl fmt::Display for ResourceDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}-{} at {:#X}, {} bytes",
			self.tag, self.number, self.offset, self.size
		)
	}
}

/// A parsed GFF archive.
///
/// The archive owns its byte buffer; tables are flat values reading entry
/// fields straight from it. Replacement returns a new buffer and leaves the
/// parsed archive untouched.
#[derive(Debug, Clone)]
pub struct File {
	bytes: Vec<u8>,
	tables_by_tag: BTreeMap<Tag, GffiTable>,
}

impl File {
	/// Parses a GFF archive from a byte slice.
	///
	/// # Errors
	///
	/// Returns an error if the header or index is malformed, a tag occurs
	/// twice, or any entry points outside the buffer.
	pub fn from_bytes(data: &[u8]) -> Result<Self, DsFileError> {
		let bytes = data.to_vec();
		let tables_by_tag = read_tables(&bytes)?;

		for (tag, table) in &tables_by_tag {
			for index in 0..table.entry_count() {
				let offset = table.offset(&bytes, index) as usize;
				let size = table.size(&bytes, index) as usize;
				if offset + size > bytes.len() {
					return Err(DsFileError::out_of_range(
						FileType::Gff,
						format!(
							"resource {}-{} spans {}..{}, beyond buffer of {} bytes",
							tag,
							table.resource_number(index),
							offset,
							offset + size,
							bytes.len()
						),
					));
				}
			}
		}

		Ok(Self {
			bytes,
			tables_by_tag,
		})
	}

	/// Returns the archive's byte buffer.
	#[inline]
	pub fn as_bytes(&self) -> &[u8] {
		&self.bytes
	}

	/// Returns the tags present in the archive, in sorted order.
	pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
		self.tables_by_tag.keys().copied()
	}

	/// Returns the number of resources under a tag, or None if the tag is
	/// absent.
	pub fn resource_count(&self, tag: Tag) -> Option<usize> {
		self.tables_by_tag.get(&tag).map(GffiTable::entry_count)
	}

	/// Describes every resource of the archive, sorted by offset ascending.
	pub fn describe_resources(&self) -> Vec<ResourceDescriptor> {
		let mut descriptors = Vec::new();

		for (tag, table) in &self.tables_by_tag {
			for index in 0..table.entry_count() {
				descriptors.push(ResourceDescriptor {
					tag: *tag,
					number: table.resource_number(index),
					offset: table.offset(&self.bytes, index),
					size: table.size(&self.bytes, index),
				});
			}
		}

		descriptors.sort_by_key(|descriptor| descriptor.offset);

		descriptors
	}

	/// Returns true if the archive holds the given resource.
	pub fn has_resource(&self, tag: Tag, resource_number: u32) -> bool {
		self.tables_by_tag
			.get(&tag)
			.is_some_and(|table| table.index_for_resource_number(resource_number).is_some())
	}

	/// Returns a copy of the resource's bytes.
	///
	/// # Errors
	///
	/// Returns [`DsFileError::NoSuchResource`] if the resource is absent.
	pub fn get_resource(&self, tag: Tag, resource_number: u32) -> Result<Vec<u8>, DsFileError> {
		let (table, index) = self.locate(tag, resource_number)?;

		let offset = table.offset(&self.bytes, index) as usize;
		let size = table.size(&self.bytes, index) as usize;

		Ok(self.bytes[offset..offset + size].to_vec())
	}

	/// Replaces a resource's bytes, returning the rewritten archive buffer.
	///
	/// A replacement no larger than the existing resource overwrites it in
	/// place; a larger one is appended at the end of the buffer and the
	/// entry's offset is repointed there. Entries of other resources are
	/// preserved bit for bit, and the buffer never shrinks. The caller is
	/// responsible for writing the returned buffer back to disk.
	///
	/// # Errors
	///
	/// Returns [`DsFileError::NoSuchResource`] if the resource is absent.
	pub fn replace_resource(
		&self,
		tag: Tag,
		resource_number: u32,
		replacement: &[u8],
	) -> Result<Vec<u8>, DsFileError> {
		let (table, index) = self.locate(tag, resource_number)?;

		let old_size = table.size(&self.bytes, index) as usize;
		let new_size = replacement.len() as u32;

		if replacement.len() <= old_size {
			// The replacement fits in the old space.
			let offset = table.offset(&self.bytes, index) as usize;
			debug!(
				"replacing {tag}-{resource_number} in place at {offset:#X} ({} -> {} bytes)",
				old_size,
				replacement.len()
			);

			let mut rewritten = self.bytes.clone();
			rewritten[offset..offset + replacement.len()].copy_from_slice(replacement);
			table.set_size(&mut rewritten, index, new_size);

			Ok(rewritten)
		} else {
			// The (larger) replacement must be appended to the end of the
			// file.
			let new_offset = u32::try_from(self.bytes.len()).map_err(|_| {
				DsFileError::out_of_range(FileType::Gff, "archive exceeds 4 GiB".to_string())
			})?;
			debug!(
				"replacing {tag}-{resource_number} by appending at {new_offset:#X} \
				 ({old_size} -> {} bytes)",
				replacement.len()
			);

			let mut rewritten = Vec::with_capacity(self.bytes.len() + replacement.len());
			rewritten.extend_from_slice(&self.bytes);
			rewritten.extend_from_slice(replacement);
			table.set_offset(&mut rewritten, index, new_offset);
			table.set_size(&mut rewritten, index, new_size);

			Ok(rewritten)
		}
	}

	fn locate(&self, tag: Tag, resource_number: u32) -> Result<(&GffiTable, usize), DsFileError> {
		let table = self
			.tables_by_tag
			.get(&tag)
			.ok_or_else(|| DsFileError::no_such_resource(tag, resource_number))?;
		let index = table
			.index_for_resource_number(resource_number)
			.ok_or_else(|| DsFileError::no_such_resource(tag, resource_number))?;

		Ok((table, index))
	}
}

impl fmt::Display for File {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"GFF archive: {} tags, {} bytes",
			self.tables_by_tag.len(),
			self.bytes.len()
		)
	}
}

/// A secondary tag's table reference, held until the `GFFI` table is known.
struct SecondaryTableDescriptor {
	tag: Tag,
	secondary_table_index: usize,
	segments: Vec<NumberingSegment>,
}

fn read_tables(bytes: &[u8]) -> Result<BTreeMap<Tag, GffiTable>, DsFileError> {
	let index_start = read_u32_le(bytes, constants::INDEX_POINTER_OFFSET)? as usize;

	// Two unknown fields precede the tag count.
	let mut position = index_start + 8;

	let tag_count = read_u16_le(bytes, position)?;
	position += 2;
	trace!("GFF index at {index_start:#X} holds {tag_count} tag records");

	let mut tables_by_tag = BTreeMap::new();
	let mut secondary_descriptors = Vec::new();

	for _ in 0..tag_count {
		let tag = read_tag(bytes, position)?;
		position += 4;

		if tables_by_tag.contains_key(&tag)
			|| secondary_descriptors.iter().any(|d: &SecondaryTableDescriptor| d.tag == tag)
		{
			return Err(DsFileError::out_of_range(
				FileType::Gff,
				format!("encountered a second table for tag {tag}"),
			));
		}

		let entry_count_if_primary = read_u32_le(bytes, position)?;
		position += 4;

		if entry_count_if_primary > 0 {
			// The count just read is the table's first field.
			let table_start = position - 4;
			let table = GffiTable::read_primary(bytes, table_start)?;
			position = table_start + table.total_size();
			trace!("primary table {tag}: {} entries", table.entry_count());
			tables_by_tag.insert(tag, table);
		} else {
			// Skip one unknown field, then the GFFI reference and the
			// resource numbering segments.
			position += 4;

			let secondary_table_index = read_u32_le(bytes, position)? as usize;
			position += 4;

			let segment_count = read_u32_le(bytes, position)? as usize;
			position += 4;

			let mut segments = Vec::with_capacity(segment_count);
			let mut segment_start_index = 0;
			for _ in 0..segment_count {
				let start_number = read_u32_le(bytes, position)?;
				let segment_length = read_u32_le(bytes, position + 4)?;
				position += 8;

				segments.push(NumberingSegment {
					start_index: segment_start_index,
					start_number,
				});
				segment_start_index += segment_length as usize;
			}

			trace!("deferring secondary table {tag} (GFFI entry {secondary_table_index})");
			secondary_descriptors.push(SecondaryTableDescriptor {
				tag,
				secondary_table_index,
				segments,
			});
		}
	}

	if !secondary_descriptors.is_empty() {
		let gffi = tables_by_tag.get(&constants::GFFI).ok_or_else(|| {
			DsFileError::malformed_header(
				FileType::Gff,
				"archive has secondary tables but no GFFI table".to_string(),
			)
		})?;

		let mut resolved = Vec::with_capacity(secondary_descriptors.len());
		for descriptor in secondary_descriptors {
			if descriptor.secondary_table_index >= gffi.entry_count() {
				return Err(DsFileError::out_of_range(
					FileType::Gff,
					format!(
						"tag {} references GFFI entry {} of {}",
						descriptor.tag,
						descriptor.secondary_table_index,
						gffi.entry_count()
					),
				));
			}

			let table_offset = gffi.offset(bytes, descriptor.secondary_table_index) as usize;
			let table = GffiTable::read_secondary(bytes, table_offset, descriptor.segments)?;
			resolved.push((descriptor.tag, table));
		}

		tables_by_tag.extend(resolved);
	}

	Ok(tables_by_tag)
}

fn read_tag(bytes: &[u8], position: usize) -> Result<Tag, DsFileError> {
	bytes
		.get(position..position + 4)
		.and_then(Tag::from_slice)
		.ok_or_else(|| truncated(position))
}

fn read_u16_le(bytes: &[u8], position: usize) -> Result<u16, DsFileError> {
	if bytes.len() < position + 2 {
		return Err(truncated(position));
	}
	Ok(u16::from_le_bytes([bytes[position], bytes[position + 1]]))
}

fn read_u32_le(bytes: &[u8], position: usize) -> Result<u32, DsFileError> {
	if bytes.len() < position + 4 {
		return Err(truncated(position));
	}
	Ok(u32::from_le_bytes([
		bytes[position],
		bytes[position + 1],
		bytes[position + 2],
		bytes[position + 3],
	]))
}

fn truncated(position: usize) -> DsFileError {
	DsFileError::malformed_header(
		FileType::Gff,
		format!("archive index truncated at offset {position}"),
	)
}
