//! XMIDI event stream scanning.
//!
//! Only the bytes the mutations need are interpreted: the scan walks the
//! event stream far enough to size every event and records where the
//! recognized XMIDI controller messages sit.

use std::collections::{BTreeMap, BTreeSet};

use super::super::error::{DsFileError, FileType};

/// XMIDI controller numbers the tools recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ControllerKind {
	/// Controller 0x73, indirect control of channel state by the game
	IndirectControl,
	/// Controller 0x74, loop start; a value of 0 or 127 loops forever
	For,
	/// Controller 0x75, loop end (or break, for values below 64)
	Next,
	/// Controller 0x77, callback into the game's sound driver
	Callback,
	/// Controller 0x78, sequence branch index
	SequenceBranchIndex,
}

impl ControllerKind {
	/// Every recognized controller kind.
	pub const ALL: [ControllerKind; 5] = [
		ControllerKind::IndirectControl,
		ControllerKind::For,
		ControllerKind::Next,
		ControllerKind::Callback,
		ControllerKind::SequenceBranchIndex,
	];

	/// Recognizes a controller number.
	pub fn from_number(number: u8) -> Option<Self> {
		match number {
			0x73 => Some(ControllerKind::IndirectControl),
			0x74 => Some(ControllerKind::For),
			0x75 => Some(ControllerKind::Next),
			0x77 => Some(ControllerKind::Callback),
			0x78 => Some(ControllerKind::SequenceBranchIndex),
			_ => None,
		}
	}

	/// Returns the controller number.
	pub fn number(self) -> u8 {
		match self {
			ControllerKind::IndirectControl => 0x73,
			ControllerKind::For => 0x74,
			ControllerKind::Next => 0x75,
			ControllerKind::Callback => 0x77,
			ControllerKind::SequenceBranchIndex => 0x78,
		}
	}
}

impl std::fmt::Display for ControllerKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			ControllerKind::IndirectControl => "INDIRECT_CONTROL",
			ControllerKind::For => "FOR",
			ControllerKind::Next => "NEXT",
			ControllerKind::Callback => "CALLBACK",
			ControllerKind::SequenceBranchIndex => "SEQUENCE_BRANCH_INDEX",
		};
		write!(f, "{name}")
	}
}

/// Byte offsets of recognized controller messages, per kind, relative to the
/// start of the event data.
pub(crate) type ControllerLocations = BTreeMap<ControllerKind, BTreeSet<usize>>;

/// Walks the event stream and indexes the recognized controller messages.
///
/// Delay bytes have the high bit clear. Event bytes have it set; the status
/// class dictates how many data bytes follow. Note-on events carry a
/// variable-length duration terminated by the first byte not above `0x80`.
pub(crate) fn scan_events(event_data: &[u8]) -> Result<ControllerLocations, DsFileError> {
	let mut locations: ControllerLocations =
		ControllerKind::ALL.iter().map(|kind| (*kind, BTreeSet::new())).collect();

	let mut position = 0;
	while position < event_data.len() {
		let current_byte = event_data[position];
		if current_byte & 0x80 == 0 {
			// A delay of `current_byte` ticks.
			position += 1;
			continue;
		}

		let data_byte_count = match current_byte & 0xF0 {
			0x90 => {
				// Note-on: note and velocity, then the note duration.
				let mut duration_length = 1;
				while byte_at(event_data, position + 2 + duration_length)? > 0x80 {
					duration_length += 1;
				}
				2 + duration_length
			}

			0xB0 => {
				let controller = byte_at(event_data, position + 1)?;
				// The value byte must be present for the message to be
				// editable later.
				byte_at(event_data, position + 2)?;

				if let Some(kind) = ControllerKind::from_number(controller) {
					locations.entry(kind).or_default().insert(position);
				}

				2
			}

			// Program change
			0xC0 => 1,

			// Channel pressure
			0xD0 => 1,

			0xF0 => {
				if current_byte == 0xFF {
					// MIDI-file meta event with an extended length byte.
					let extended_length = byte_at(event_data, position + 2)?;
					2 + usize::from(extended_length)
				} else {
					return Err(DsFileError::UnhandledStatus {
						status: current_byte,
					});
				}
			}

			_ => 2,
		};

		position += 1 + data_byte_count;
	}

	Ok(locations)
}

fn byte_at(event_data: &[u8], position: usize) -> Result<u8, DsFileError> {
	event_data.get(position).copied().ok_or_else(|| {
		DsFileError::out_of_range(
			FileType::Xmi,
			format!("event stream truncated at offset {position}"),
		)
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_recognizer_round_trips() {
		for kind in ControllerKind::ALL {
			assert_eq!(ControllerKind::from_number(kind.number()), Some(kind));
		}
		assert_eq!(ControllerKind::from_number(0x76), None);
		assert_eq!(ControllerKind::from_number(0x00), None);
	}

	#[test]
	fn test_scan_indexes_controllers() {
		let events = [
			0x10, // delay
			0xB0, 0x74, 0x00, // FOR, infinite
			0x91, 0x40, 0x64, 0x85, 0x90, 0x10, // note-on, 3 duration bytes
			0xB1, 0x75, 0x40, // NEXT
			0xB0, 0x07, 0x7F, // unrecognized controller (volume)
		];

		let locations = scan_events(&events).unwrap();
		assert_eq!(locations[&ControllerKind::For], BTreeSet::from([1]));
		assert_eq!(locations[&ControllerKind::Next], BTreeSet::from([10]));
		assert!(locations[&ControllerKind::Callback].is_empty());
	}

	#[test]
	fn test_scan_skips_channel_messages() {
		let events = [
			0xC5, 0x09, // program change, 1 data byte
			0xD2, 0x33, // channel pressure, 1 data byte
			0x8A, 0x40, 0x00, // note-off, default 2 data bytes
			0xB3, 0x77, 0x01, // CALLBACK
		];

		let locations = scan_events(&events).unwrap();
		assert_eq!(locations[&ControllerKind::Callback], BTreeSet::from([7]));
	}

	#[test]
	fn test_scan_meta_event() {
		let events = [
			0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // tempo meta, 3 extended bytes
			0xB0, 0x78, 0x02, // SEQUENCE_BRANCH_INDEX
		];

		let locations = scan_events(&events).unwrap();
		assert_eq!(locations[&ControllerKind::SequenceBranchIndex], BTreeSet::from([6]));
	}

	#[test]
	fn test_unhandled_system_message() {
		let err = scan_events(&[0xF0, 0x00]).unwrap_err();
		assert!(err.is_unhandled_status());
		assert_eq!(err.to_string(), "unhandled system message: 0xF0");
	}

	#[test]
	fn test_truncated_stream() {
		// Controller status without its value byte.
		assert!(scan_events(&[0xB0, 0x74]).unwrap_err().is_out_of_range());
		// Note-on whose duration never terminates.
		assert!(scan_events(&[0x90, 0x40, 0x64, 0x90]).unwrap_err().is_out_of_range());
	}
}
