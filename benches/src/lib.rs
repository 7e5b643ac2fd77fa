//! Synthetic resource builders shared by the dsun-rs benchmarks.
//!
//! The benchmarks run against generated buffers so they need no game data
//! checked out next to the workspace.

/// Builds a single-frame image file around the given frame bytes.
pub fn image_with_frame(frame_bytes: &[u8]) -> Vec<u8> {
	let frame_offset = 10u32;
	let mut bytes = Vec::new();
	bytes.extend_from_slice(&0u32.to_le_bytes());
	bytes.extend_from_slice(&1u16.to_le_bytes());
	bytes.extend_from_slice(&frame_offset.to_le_bytes());
	bytes.extend_from_slice(frame_bytes);
	bytes
}

/// Builds a row-based frame of the given size where every row alternates
/// plain and repeated runs.
pub fn row_based_frame(width: u16, height: u16) -> Vec<u8> {
	assert!((2..=128).contains(&width), "width must fit a single run");

	let mut frame = Vec::new();
	frame.extend_from_slice(&width.to_le_bytes());
	frame.extend_from_slice(&height.to_le_bytes());

	for row in 0..height {
		frame.push(row as u8);

		let length = width as u8 - 1;
		if row % 2 == 0 {
			// One repeated run covering most of the row.
			frame.extend_from_slice(&[0, 0x80, length, 2, length * 2 - 1, row as u8]);
		} else {
			// One plain run covering most of the row.
			frame.extend_from_slice(&[0, 0x80, length, length + 1, (length - 1) * 2]);
			frame.extend(std::iter::repeat(row as u8).take(length as usize));
		}
	}
	frame.push(0xFF);

	frame
}

/// Builds a `PLNR` frame of the given size whose symbol stream alternates
/// literals and maximum-length runs.
pub fn plnr_frame(width: u16, height: u16) -> Vec<u8> {
	let bits_per_symbol = 4u8;

	let mut frame = Vec::new();
	frame.extend_from_slice(&width.to_le_bytes());
	frame.extend_from_slice(&height.to_le_bytes());
	frame.push(0xFF);
	frame.extend_from_slice(b"PLNR");
	frame.push(bits_per_symbol);

	// Dictionary: symbol 0 is transparent, the rest map to arbitrary pixels.
	for value in 0u8..16 {
		frame.push(value.wrapping_mul(17));
	}

	// Nibble stream: literal 5, then (0, 15) repeating it 16 more times.
	let pixel_count = usize::from(width) * usize::from(height);
	let mut nibbles = Vec::new();
	let mut emitted = 0;
	while emitted < pixel_count {
		nibbles.push(5u8);
		emitted += 1;

		if emitted + 17 <= pixel_count {
			nibbles.extend_from_slice(&[0, 15]);
			emitted += 17;
		}
	}

	for pair in nibbles.chunks(2) {
		let low = pair.get(1).copied().unwrap_or(0);
		frame.push((pair[0] << 4) | low);
	}

	frame
}
