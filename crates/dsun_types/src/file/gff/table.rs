//! On-disk index tables of a GFF archive.
//!
//! Tables come in two layouts differing in entry size and in how each entry's
//! resource number is derived: primary entries carry the number inline, while
//! secondary tables map entry indexes through numbering segments recorded in
//! the archive header.

use super::super::error::{DsFileError, FileType};

/// The two on-disk table layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TableKind {
	Primary,
	Secondary,
}

impl TableKind {
	fn entry_size(self) -> usize {
		match self {
			TableKind::Primary => 12,
			TableKind::Secondary => 8,
		}
	}

	fn offset_field(self) -> usize {
		match self {
			TableKind::Primary => 4,
			TableKind::Secondary => 0,
		}
	}

	fn size_field(self) -> usize {
		match self {
			TableKind::Primary => 8,
			TableKind::Secondary => 4,
		}
	}
}

/// One segment of a secondary table's resource numbering.
///
/// Entries `start_index..` up to the next segment take consecutive resource
/// numbers beginning at `start_number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NumberingSegment {
	pub(crate) start_index: usize,
	pub(crate) start_number: u32,
}

/// Per-entry resource numbering of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Numbering {
	/// Primary tables store a resource number in each entry
	Explicit(Vec<u32>),
	/// Secondary tables derive numbers from numbering segments
	Segmented(Vec<NumberingSegment>),
}

/// A parsed index table.
///
/// The table is a flat value: it remembers where it sits in the archive and
/// reads or writes entry fields through accessors that take the archive
/// buffer as an argument. It holds no reference to the buffer itself, so the
/// archive can hand out grown replacement buffers without re-parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GffiTable {
	start_position: usize,
	entry_count: usize,
	kind: TableKind,
	numbering: Numbering,
}

impl GffiTable {
	/// Parses a primary table at `start_position` in the archive buffer.
	pub(crate) fn read_primary(bytes: &[u8], start_position: usize) -> Result<Self, DsFileError> {
		let entry_count = read_entry_count(bytes, start_position)?;
		check_table_extent(bytes, start_position, entry_count, TableKind::Primary)?;

		let mut resource_numbers = Vec::with_capacity(entry_count);
		for index in 0..entry_count {
			let entry_position = start_position + 4 + index * TableKind::Primary.entry_size();
			resource_numbers.push(read_u32_le(bytes, entry_position));
		}

		Ok(Self {
			start_position,
			entry_count,
			kind: TableKind::Primary,
			numbering: Numbering::Explicit(resource_numbers),
		})
	}

	/// Parses a secondary table at `start_position`, numbering its entries
	/// through the given segments.
	pub(crate) fn read_secondary(
		bytes: &[u8],
		start_position: usize,
		segments: Vec<NumberingSegment>,
	) -> Result<Self, DsFileError> {
		let entry_count = read_entry_count(bytes, start_position)?;
		check_table_extent(bytes, start_position, entry_count, TableKind::Secondary)?;

		Ok(Self {
			start_position,
			entry_count,
			kind: TableKind::Secondary,
			numbering: Numbering::Segmented(segments),
		})
	}

	/// Returns the number of entries in the table.
	#[inline]
	pub(crate) fn entry_count(&self) -> usize {
		self.entry_count
	}

	/// Returns the table's total on-disk size including the count field.
	pub(crate) fn total_size(&self) -> usize {
		4 + self.entry_count * self.kind.entry_size()
	}

	/// Returns the resource number of the entry at `index`.
	pub(crate) fn resource_number(&self, index: usize) -> u32 {
		debug_assert!(index < self.entry_count);

		match &self.numbering {
			Numbering::Explicit(resource_numbers) => resource_numbers[index],
			Numbering::Segmented(segments) => {
				// The governing segment is the last one starting at or below
				// this index; a later duplicate start index supersedes an
				// earlier one.
				match segments.iter().rev().find(|segment| segment.start_index <= index) {
					Some(segment) => {
						segment.start_number + (index - segment.start_index) as u32
					}
					None => index as u32,
				}
			}
		}
	}

	/// Finds the entry index holding the given resource number.
	pub(crate) fn index_for_resource_number(&self, resource_number: u32) -> Option<usize> {
		(0..self.entry_count).find(|&index| self.resource_number(index) == resource_number)
	}

	/// Reads the entry's data offset from the archive buffer.
	pub(crate) fn offset(&self, bytes: &[u8], index: usize) -> u32 {
		debug_assert!(index < self.entry_count);
		read_u32_le(bytes, self.entry_position(index) + self.kind.offset_field())
	}

	/// Writes the entry's data offset into the archive buffer.
	pub(crate) fn set_offset(&self, bytes: &mut [u8], index: usize, offset: u32) {
		debug_assert!(index < self.entry_count);
		let position = self.entry_position(index) + self.kind.offset_field();
		bytes[position..position + 4].copy_from_slice(&offset.to_le_bytes());
	}

	/// Reads the entry's data size from the archive buffer.
	pub(crate) fn size(&self, bytes: &[u8], index: usize) -> u32 {
		debug_assert!(index < self.entry_count);
		read_u32_le(bytes, self.entry_position(index) + self.kind.size_field())
	}

	/// Writes the entry's data size into the archive buffer.
	pub(crate) fn set_size(&self, bytes: &mut [u8], index: usize, size: u32) {
		debug_assert!(index < self.entry_count);
		let position = self.entry_position(index) + self.kind.size_field();
		bytes[position..position + 4].copy_from_slice(&size.to_le_bytes());
	}

	fn entry_position(&self, index: usize) -> usize {
		self.start_position + 4 + index * self.kind.entry_size()
	}
}

fn read_entry_count(bytes: &[u8], start_position: usize) -> Result<usize, DsFileError> {
	if bytes.len() < start_position + 4 {
		return Err(DsFileError::malformed_header(
			FileType::Gff,
			format!("table at offset {start_position} has no entry count"),
		));
	}

	Ok(read_u32_le(bytes, start_position) as usize)
}

fn check_table_extent(
	bytes: &[u8],
	start_position: usize,
	entry_count: usize,
	kind: TableKind,
) -> Result<(), DsFileError> {
	let end = start_position + 4 + entry_count * kind.entry_size();
	if end > bytes.len() {
		return Err(DsFileError::out_of_range(
			FileType::Gff,
			format!(
				"table of {entry_count} entries at offset {start_position} extends to {end}, \
				 beyond buffer of {} bytes",
				bytes.len()
			),
		));
	}

	Ok(())
}

fn read_u32_le(bytes: &[u8], position: usize) -> u32 {
	u32::from_le_bytes([
		bytes[position],
		bytes[position + 1],
		bytes[position + 2],
		bytes[position + 3],
	])
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_primary_table_fields() {
		let mut bytes = vec![0u8; 8];
		bytes.extend_from_slice(&2u32.to_le_bytes());
		for (number, offset, size) in [(7u32, 0x100u32, 16u32), (9, 0x200, 32)] {
			bytes.extend_from_slice(&number.to_le_bytes());
			bytes.extend_from_slice(&offset.to_le_bytes());
			bytes.extend_from_slice(&size.to_le_bytes());
		}

		let table = GffiTable::read_primary(&bytes, 8).unwrap();

		assert_eq!(table.entry_count(), 2);
		assert_eq!(table.total_size(), 4 + 2 * 12);
		assert_eq!(table.resource_number(0), 7);
		assert_eq!(table.resource_number(1), 9);
		assert_eq!(table.index_for_resource_number(9), Some(1));
		assert_eq!(table.index_for_resource_number(8), None);
		assert_eq!(table.offset(&bytes, 0), 0x100);
		assert_eq!(table.size(&bytes, 1), 32);
	}

	#[test]
	fn test_setters_rewrite_in_place() {
		let mut bytes = Vec::new();
		bytes.extend_from_slice(&1u32.to_le_bytes());
		bytes.extend_from_slice(&5u32.to_le_bytes());
		bytes.extend_from_slice(&0x40u32.to_le_bytes());
		bytes.extend_from_slice(&8u32.to_le_bytes());

		let table = GffiTable::read_primary(&bytes, 0).unwrap();
		table.set_offset(&mut bytes, 0, 0x80);
		table.set_size(&mut bytes, 0, 24);

		assert_eq!(table.offset(&bytes, 0), 0x80);
		assert_eq!(table.size(&bytes, 0), 24);
		// The resource number field is untouched.
		assert_eq!(table.resource_number(0), 5);
	}

	#[test]
	fn test_segmented_numbering() {
		let mut bytes = Vec::new();
		bytes.extend_from_slice(&5u32.to_le_bytes());
		for _ in 0..5 {
			bytes.extend_from_slice(&[0u8; 8]);
		}

		let segments = vec![
			NumberingSegment {
				start_index: 0,
				start_number: 100,
			},
			NumberingSegment {
				start_index: 3,
				start_number: 500,
			},
		];
		let table = GffiTable::read_secondary(&bytes, 0, segments).unwrap();

		assert_eq!(table.resource_number(0), 100);
		assert_eq!(table.resource_number(2), 102);
		assert_eq!(table.resource_number(3), 500);
		assert_eq!(table.resource_number(4), 501);
		assert_eq!(table.index_for_resource_number(102), Some(2));
		assert_eq!(table.index_for_resource_number(501), Some(4));
		assert_eq!(table.index_for_resource_number(103), None);
	}

	#[test]
	fn test_truncated_table() {
		let mut bytes = Vec::new();
		bytes.extend_from_slice(&4u32.to_le_bytes());
		bytes.extend_from_slice(&[0u8; 12]); // room for only one entry

		assert!(GffiTable::read_primary(&bytes, 0).unwrap_err().is_out_of_range());
	}
}
