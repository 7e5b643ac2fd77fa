//! Byte-precise mutations of the XMIDI event stream.
//!
//! Every mutation rewrites bytes in place; the stream never changes length.
//! Unwanted 3-byte controller messages are obliterated by turning them into
//! a no-op controller change, `BF 00 00`.

use std::collections::BTreeMap;

use log::debug;

use super::event::ControllerKind;
use super::{EvntChunk, File};

/// A no-op controller change overwriting an obliterated message.
const OBLITERATED_MESSAGE: [u8; 3] = [0xBF, 0x00, 0x00];

/// Loop counts the game's driver treats as "loop forever".
const INFINITE_LOOP_COUNTS: [u8; 2] = [0, 127];

impl EvntChunk {
	/// Turns the 3-byte message at `offset` into a no-op controller change
	/// and drops it from the controller index.
	fn obliterate_message(&mut self, offset: usize) {
		self.data[offset..offset + 3].copy_from_slice(&OBLITERATED_MESSAGE);

		for offsets in self.controller_locations.values_mut() {
			offsets.remove(&offset);
		}
	}
}

impl File {
	/// Obliterates every CALLBACK and INDIRECT_CONTROL message, removing the
	/// game's hooks into playback. Returns the number of messages
	/// obliterated.
	pub fn remove_api_control(&mut self) -> usize {
		let Some(evnt) = &mut self.evnt else {
			return 0;
		};

		let mut obliterated = 0;
		for kind in [ControllerKind::Callback, ControllerKind::IndirectControl] {
			for offset in evnt.locations(kind).clone() {
				debug!("obliterating {kind} at {offset:#06X}");
				evnt.obliterate_message(offset);
				obliterated += 1;
			}
		}

		obliterated
	}

	/// Pairs each NEXT with the closest preceding FOR and yields the pairs
	/// whose FOR loops forever, keyed by FOR offset.
	///
	/// A FOR paired with a finite count is discarded from further pairing;
	/// a NEXT with no preceding FOR is ignored.
	pub fn identify_infinite_loops(&self) -> BTreeMap<usize, usize> {
		let Some(evnt) = &self.evnt else {
			return BTreeMap::new();
		};

		let mut infinite_loops = BTreeMap::new();

		let mut for_locations = evnt.locations(ControllerKind::For).clone();
		for &next_location in evnt.locations(ControllerKind::Next) {
			let Some(&for_location) = for_locations.range(..next_location).next_back() else {
				continue;
			};

			let loop_count = evnt.data[for_location + 2];
			if INFINITE_LOOP_COUNTS.contains(&loop_count) {
				infinite_loops.insert(for_location, next_location);
			} else {
				for_locations.remove(&for_location);
			}
		}

		infinite_loops
	}

	/// Collapses all infinite loops into a single outer loop.
	///
	/// Every FOR except the first and every NEXT except the last is
	/// obliterated. Returns the surviving `(FOR, NEXT)` pair, or None if
	/// there was no infinite loop.
	pub fn unify_loops(&mut self) -> Option<(usize, usize)> {
		let pairs: Vec<(usize, usize)> = self.identify_infinite_loops().into_iter().collect();

		let &(first_for, _) = pairs.first()?;
		let &(_, last_next) = pairs.last()?;

		let evnt = self.evnt.as_mut()?;
		debug!("unifying {} infinite loops", pairs.len());

		for &(for_location, next_location) in &pairs {
			if for_location != first_for {
				debug!("obliterating FOR at {for_location:#06X}");
				evnt.obliterate_message(for_location);
			}

			if next_location != last_next {
				debug!("obliterating NEXT at {next_location:#06X}");
				evnt.obliterate_message(next_location);
			}
		}

		Some((first_for, last_next))
	}

	/// Sets the iteration count of every currently infinite loop. Returns
	/// the number of loops rewritten.
	pub fn set_all_loops(&mut self, iterations: u8) -> usize {
		let pairs = self.identify_infinite_loops();

		let Some(evnt) = &mut self.evnt else {
			return 0;
		};

		for &for_location in pairs.keys() {
			debug!("setting loop at {for_location:#06X} to {iterations} iterations");
			evnt.data[for_location + 2] = iterations;
		}

		pairs.len()
	}

	/// Zeroes the sequence-branch count of the `RBRN` chunk, if one exists.
	/// Returns true if a count was zeroed.
	pub fn zero_rbrn_count(&mut self) -> bool {
		let Some(rbrn) = &mut self.rbrn else {
			return false;
		};

		debug!("zeroing RBRN sequence branch count");
		self.raw[rbrn.data_start..rbrn.data_start + 2].copy_from_slice(&0u16.to_le_bytes());
		rbrn.branch_count = 0;

		true
	}
}
