//! End-to-end tests over the public facade: build a synthetic archive, pull
//! an image resource out of it, decode the frames, and write a replacement
//! back.

use dsun_rs::prelude::*;
use log::info;

const BMP: Tag = Tag::new(*b"BMP ");
const PAL: Tag = Tag::new(*b"PAL ");

fn init_logging() {
	let _ = env_logger::builder().is_test(true).try_init();
}

/// A single-frame row-based image resource: 2x2, all four pixels covered.
fn image_resource() -> Vec<u8> {
	let mut frame = Vec::new();
	frame.extend_from_slice(&2u16.to_le_bytes());
	frame.extend_from_slice(&2u16.to_le_bytes());
	frame.push(0);
	frame.extend_from_slice(&[0, 0x80, 2, 3, 0x02, 0x01, 0x02]);
	frame.push(1);
	frame.extend_from_slice(&[0, 0x80, 2, 3, 0x02, 0x03, 0x04]);
	frame.push(0xFF);

	let mut bytes = Vec::new();
	bytes.extend_from_slice(&0u32.to_le_bytes());
	bytes.extend_from_slice(&1u16.to_le_bytes());
	bytes.extend_from_slice(&10u32.to_le_bytes());
	bytes.extend_from_slice(&frame);
	bytes
}

/// An archive holding the image resource and a two-color palette resource.
fn archive_bytes() -> Vec<u8> {
	let image = image_resource();
	let palette: &[u8] = &[0x3F, 0x00, 0x00, 0x00, 0x3F, 0x00];

	let mut bytes = vec![0u8; 16];

	let image_offset = bytes.len() as u32;
	bytes.extend_from_slice(&image);
	let palette_offset = bytes.len() as u32;
	bytes.extend_from_slice(palette);

	let index_start = bytes.len() as u32;
	bytes[12..16].copy_from_slice(&index_start.to_le_bytes());

	bytes.extend_from_slice(&[0u8; 8]);
	bytes.extend_from_slice(&2u16.to_le_bytes());

	for (tag, number, offset, size) in [
		(BMP, 1u32, image_offset, image.len() as u32),
		(PAL, 1, palette_offset, palette.len() as u32),
	] {
		bytes.extend_from_slice(tag.as_bytes());
		bytes.extend_from_slice(&1u32.to_le_bytes());
		bytes.extend_from_slice(&number.to_le_bytes());
		bytes.extend_from_slice(&offset.to_le_bytes());
		bytes.extend_from_slice(&size.to_le_bytes());
	}

	bytes
}

#[test]
fn decode_image_resource_from_archive() {
	init_logging();

	let gff = GffFile::from_bytes(&archive_bytes()).unwrap();
	info!("loaded {gff}");

	assert_eq!(gff.tags().collect::<Vec<_>>(), vec![BMP, PAL]);

	let frames = extract_frames(&gff.get_resource(BMP, 1).unwrap()).unwrap();
	assert_eq!(frames.len(), 1);

	let frame = &frames[0];
	assert_eq!(frame.pixels(), &[0x01, 0x02, 0x03, 0x04]);
	assert_eq!(frame.alpha_mask().count_opaque(), 4);

	let palette = Palette::from_palette_bytes(&gff.get_resource(PAL, 1).unwrap());
	assert_eq!(palette.color(0), Some(Color::new(252, 0, 0)));
	assert_eq!(palette.color(1), Some(Color::new(0, 252, 0)));
}

#[test]
fn replace_resource_and_redecode() {
	init_logging();

	let gff = GffFile::from_bytes(&archive_bytes()).unwrap();

	// A wider palette resource forces the append path.
	let new_palette: &[u8] = &[0x00, 0x00, 0x3F, 0x10, 0x10, 0x10, 0x20, 0x20, 0x20];
	let rewritten = gff.replace_resource(PAL, 1, new_palette).unwrap();

	let reparsed = GffFile::from_bytes(&rewritten).unwrap();
	let palette = Palette::from_palette_bytes(&reparsed.get_resource(PAL, 1).unwrap());
	assert_eq!(palette.len(), 3);
	assert_eq!(palette.color(0), Some(Color::new(0, 0, 252)));

	// The image resource is untouched by the replacement.
	let frames = extract_frames(&reparsed.get_resource(BMP, 1).unwrap()).unwrap();
	assert_eq!(frames[0].pixels(), &[0x01, 0x02, 0x03, 0x04]);
}

#[test]
fn missing_resources_are_reported_and_skippable() {
	init_logging();

	let gff = GffFile::from_bytes(&archive_bytes()).unwrap();

	// Compose-style callers probe for optional resources and skip misses.
	let err = gff.get_resource(BMP, 99).unwrap_err();
	assert!(err.is_no_such_resource());
	assert!(!gff.has_resource(BMP, 99));
}
