//! Multi-frame image resource support.
//!
//! Image resources extracted from GFF archives hold one or more frames of
//! indexed-palette pixels with per-pixel transparency.
//!
//! # File Structure
//!
//! - **Header:** file size (4 bytes, little-endian, unused), frame count
//!   (2 bytes, little-endian)
//! - **Frame offsets:** one 32-bit absolute offset per frame
//! - **Frames:** each frame in one of three encodings
//!
//! # Frame Encodings
//!
//! Every frame starts with little-endian 16-bit width and height. Three
//! encodings follow:
//!
//! - **Row-based**: per-row lists of run-length-compressed pixel runs; the
//!   only compression used by Dark Sun: Shattered Lands
//! - **`PLAN`**: a dictionary of pixel values indexed by fixed-width symbols
//!   pulled from a big-endian bit stream
//! - **`PLNR`**: the same dictionary lookup driven by a run-length symbol
//!   stream
//!
//! Planar frames are identified by a `0xFF` marker at offset 4 followed by
//! the ASCII tag at offset 5.
//!
//! # Usage Examples
//!
//! ```no_run
//! use dsun_types::file::image::extract_frames;
//!
//! # fn main() -> Result<(), dsun_types::file::DsFileError> {
//! # let image_bytes: Vec<u8> = Vec::new();
//! for frame in extract_frames(&image_bytes)? {
//! 	println!("{}x{}", frame.width(), frame.height());
//! 	let pixels = frame.pixels();
//! 	let mask = frame.alpha_mask();
//! 	assert_eq!(pixels.len(), mask.len());
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use log::trace;

use super::bits::{BitOrder, BitReader};
use super::error::{DsFileError, FileType};
use super::Tag;

pub mod frame;
pub mod palette;
pub mod rle;

pub use frame::{AlphaMask, Frame};
pub use palette::{Color, Palette};

use frame::PixelRun;

/// Image file constants.
mod constants {
	use super::Tag;

	/// Row number marking the end of a row-based frame's row list
	pub const NO_MORE_ROWS: u8 = 0xFF;

	/// Run flag adding 256 to the run's starting column
	pub const COLUMN_256_FLAG: u8 = 0x01;

	/// Run flag marking the last run of a row
	pub const LAST_RUN_FLAG: u8 = 0x80;

	/// Marker byte at frame offset 4 announcing a planar encoding tag
	pub const PLANAR_MARKER: u8 = 0xFF;

	/// Tag of the fixed-width-symbol planar encoding
	pub const PLAN: Tag = Tag::new(*b"PLAN");

	/// Tag of the run-length-symbol planar encoding
	pub const PLNR: Tag = Tag::new(*b"PLNR");
}

/// A parsed multi-frame image resource.
#[derive(Debug, Clone)]
pub struct File {
	frames: Vec<Frame>,
}

impl File {
	/// Parses an image resource from a byte slice.
	///
	/// # Errors
	///
	/// Returns an error if the header or any frame is malformed or reaches
	/// outside the buffer.
	pub fn from_bytes(data: &[u8]) -> Result<Self, DsFileError> {
		Ok(Self {
			frames: extract_frames(data)?,
		})
	}

	/// Returns the number of frames in the file.
	#[inline]
	pub fn frame_count(&self) -> usize {
		self.frames.len()
	}

	/// Returns a specific frame by index.
	pub fn get_frame(&self, index: usize) -> Option<&Frame> {
		self.frames.get(index)
	}

	/// Returns the parsed frames.
	#[inline]
	pub fn frames(&self) -> &[Frame] {
		&self.frames
	}

	/// Returns an iterator over all frames in the file.
	pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
		self.frames.iter()
	}
}

impl<'a> IntoIterator for &'a File {
	type Item = &'a Frame;
	type IntoIter = std::slice::Iter<'a, Frame>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

impl std::fmt::Display for File {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "Image file: {} frames", self.frames.len())
	}
}

/// Extracts every frame of a multi-frame image resource.
///
/// # Errors
///
/// Returns an error if the header or any frame is malformed or reaches
/// outside the buffer.
pub fn extract_frames(image_bytes: &[u8]) -> Result<Vec<Frame>, DsFileError> {
	// Skip over the file size field.
	let frame_count = read_u16_le(image_bytes, 4)?;
	trace!("image resource holds {frame_count} frames");

	let mut frames = Vec::with_capacity(usize::from(frame_count));
	for i_frame in 0..usize::from(frame_count) {
		let frame_offset = read_u32_le(image_bytes, 6 + i_frame * 4)? as usize;
		frames.push(read_frame(image_bytes, frame_offset)?);
	}

	Ok(frames)
}

fn read_frame(image_bytes: &[u8], frame_start: usize) -> Result<Frame, DsFileError> {
	if image_bytes.len() >= frame_start + 9
		&& image_bytes[frame_start + 4] == constants::PLANAR_MARKER
	{
		if let Some(tag) = Tag::from_slice(&image_bytes[frame_start + 5..frame_start + 9]) {
			if tag == constants::PLAN {
				return read_planar_frame(image_bytes, frame_start, SymbolEncoding::Plan);
			} else if tag == constants::PLNR {
				return read_planar_frame(image_bytes, frame_start, SymbolEncoding::Plnr);
			}
		}
	}

	read_row_based_frame(image_bytes, frame_start)
}

fn read_row_based_frame(image_bytes: &[u8], frame_start: usize) -> Result<Frame, DsFileError> {
	let width = read_u16_le(image_bytes, frame_start)?;
	let height = read_u16_le(image_bytes, frame_start + 2)?;
	let mut position = frame_start + 4;

	let mut runs_by_row: BTreeMap<usize, Vec<PixelRun>> = BTreeMap::new();
	while runs_by_row.len() < usize::from(height) {
		let row_number = read_u8(image_bytes, position)?;
		position += 1;

		if row_number == constants::NO_MORE_ROWS {
			break;
		}
		if u16::from(row_number) >= height {
			return Err(DsFileError::out_of_range(
				FileType::Image,
				format!("row number {row_number:#X} >= frame height {height:#X}"),
			));
		}

		let mut runs = Vec::new();
		loop {
			let mut start_x = usize::from(read_u8(image_bytes, position)?);
			let flags = read_u8(image_bytes, position + 1)?;
			let uncompressed_length = usize::from(read_u8(image_bytes, position + 2)?);
			let compressed_length = usize::from(read_u8(image_bytes, position + 3)?);
			position += 4;

			if flags & constants::COLUMN_256_FLAG != 0 {
				start_x += 256;
			}

			let compressed = image_bytes
				.get(position..position + compressed_length)
				.ok_or_else(|| {
					DsFileError::out_of_range(
						FileType::Image,
						format!("compressed pixel run at offset {position} exceeds buffer"),
					)
				})?;
			position += compressed_length;

			if start_x + uncompressed_length > usize::from(width) {
				return Err(DsFileError::out_of_range(
					FileType::Image,
					format!(
						"pixel run spanning columns {}..{} exceeds frame width {}",
						start_x,
						start_x + uncompressed_length,
						width
					),
				));
			}

			let pixels = rle::decode(compressed, uncompressed_length)?;
			runs.push(PixelRun::new(start_x, pixels));

			if flags & constants::LAST_RUN_FLAG != 0 {
				break;
			}
		}

		runs_by_row.insert(usize::from(row_number), runs);
	}

	Ok(Frame::from_runs(width, height, runs_by_row))
}

/// Symbol stream variants of the planar frame encodings.
enum SymbolEncoding {
	Plan,
	Plnr,
}

/// Source of dictionary symbols for a planar frame.
///
/// `Plnr` is a two-field state machine expanding a run-length code stream:
/// a non-zero code is a single symbol; `(0, 0)` is a single explicit zero;
/// `(0, n)` repeats the previous symbol `n + 2` times.
enum SymbolSource<'a> {
	Plan {
		reader: BitReader<'a>,
		bits_per_symbol: u32,
	},
	Plnr {
		reader: BitReader<'a>,
		bits_per_symbol: u32,
		last_value: u16,
		remaining: u32,
	},
}

impl<'a> SymbolSource<'a> {
	fn new(encoding: SymbolEncoding, reader: BitReader<'a>, bits_per_symbol: u32) -> Self {
		match encoding {
			SymbolEncoding::Plan => Self::Plan {
				reader,
				bits_per_symbol,
			},
			SymbolEncoding::Plnr => Self::Plnr {
				reader,
				bits_per_symbol,
				last_value: 0,
				remaining: 0,
			},
		}
	}

	fn next_symbol(&mut self) -> Result<u16, DsFileError> {
		match self {
			Self::Plan {
				reader,
				bits_per_symbol,
			} => reader.chomp(*bits_per_symbol),
			Self::Plnr {
				reader,
				bits_per_symbol,
				last_value,
				remaining,
			} => {
				if *remaining == 0 {
					let first_code = reader.chomp(*bits_per_symbol)?;
					if first_code == 0 {
						let second_code = reader.chomp(*bits_per_symbol)?;
						if second_code == 0 {
							*last_value = 0;
							*remaining = 1;
						} else {
							// keep last value
							*remaining = u32::from(second_code) + 2;
						}
					} else {
						*last_value = first_code;
						*remaining = 1;
					}
				}

				*remaining -= 1;

				Ok(*last_value)
			}
		}
	}
}

/// Accumulates decoded planar pixels into contiguous runs.
struct PixelRunsBuilder {
	runs: Vec<PixelRun>,
	accumulated: Vec<u8>,
	start_x: Option<usize>,
}

impl PixelRunsBuilder {
	fn new() -> Self {
		Self {
			runs: Vec::new(),
			accumulated: Vec::new(),
			start_x: None,
		}
	}

	fn record(&mut self, x: usize, pixel: u8) {
		let continues = self
			.start_x
			.is_some_and(|start_x| x == start_x + self.accumulated.len());
		if !continues {
			self.finish_run();
			self.start_x = Some(x);
		}

		self.accumulated.push(pixel);
	}

	fn finish_run(&mut self) {
		if let Some(start_x) = self.start_x.take() {
			self.runs.push(PixelRun::new(start_x, std::mem::take(&mut self.accumulated)));
		}
	}

	fn into_runs(mut self) -> Vec<PixelRun> {
		self.finish_run();
		self.runs
	}
}

fn read_planar_frame(
	image_bytes: &[u8],
	frame_start: usize,
	encoding: SymbolEncoding,
) -> Result<Frame, DsFileError> {
	// Algorithms for PLAN and PLNR reverse-engineered from DSUN.EXE of
	// Dark Sun 2.

	let width = read_u16_le(image_bytes, frame_start)?;
	let height = read_u16_le(image_bytes, frame_start + 2)?;

	let bits_per_symbol = u32::from(read_u8(image_bytes, frame_start + 9)?);
	if bits_per_symbol == 0 {
		// empty image frame
		return Ok(Frame::from_runs(width, height, BTreeMap::new()));
	}
	if bits_per_symbol > 16 {
		return Err(DsFileError::malformed_header(
			FileType::Image,
			format!("planar frame declares {bits_per_symbol} bits per symbol, expected at most 16"),
		));
	}

	let dictionary_size = 1usize << bits_per_symbol;
	let dictionary_start = frame_start + 10;
	let dictionary = image_bytes
		.get(dictionary_start..dictionary_start + dictionary_size)
		.ok_or_else(|| {
			DsFileError::out_of_range(
				FileType::Image,
				format!("planar dictionary of {dictionary_size} bytes exceeds buffer"),
			)
		})?;

	let code_start = dictionary_start + dictionary_size;
	let reader = BitReader::new(image_bytes, code_start, 0, BitOrder::BigEndian)?;
	let mut symbol_source = SymbolSource::new(encoding, reader, bits_per_symbol);

	let mut runs_by_row: BTreeMap<usize, Vec<PixelRun>> = BTreeMap::new();
	for y in 0..usize::from(height) {
		let mut runs_builder = PixelRunsBuilder::new();
		for x in 0..usize::from(width) {
			let symbol = symbol_source.next_symbol()?;
			let pixel = dictionary[usize::from(symbol)];

			// A zero dictionary value marks a transparent pixel.
			if pixel != 0 {
				runs_builder.record(x, pixel);
			}
		}

		runs_by_row.insert(y, runs_builder.into_runs());
	}

	Ok(Frame::from_runs(width, height, runs_by_row))
}

fn read_u8(bytes: &[u8], offset: usize) -> Result<u8, DsFileError> {
	bytes.get(offset).copied().ok_or_else(|| truncated(offset))
}

fn read_u16_le(bytes: &[u8], offset: usize) -> Result<u16, DsFileError> {
	if bytes.len() < offset + 2 {
		return Err(truncated(offset));
	}
	Ok(u16::from_le_bytes([bytes[offset], bytes[offset + 1]]))
}

fn read_u32_le(bytes: &[u8], offset: usize) -> Result<u32, DsFileError> {
	if bytes.len() < offset + 4 {
		return Err(truncated(offset));
	}
	Ok(u32::from_le_bytes([
		bytes[offset],
		bytes[offset + 1],
		bytes[offset + 2],
		bytes[offset + 3],
	]))
}

fn truncated(offset: usize) -> DsFileError {
	DsFileError::malformed_header(
		FileType::Image,
		format!("image data truncated at offset {offset}"),
	)
}
