//! Benchmark suite for image frame decoding
//!
//! This benchmark measures the row-based and planar decoders plus the bit
//! reader underneath them, over synthetic frames.
//!
//! Run with: cargo bench --manifest-path benches/Cargo.toml

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use dsun_benches::{image_with_frame, plnr_frame, row_based_frame};
use dsun_types::file::bits::{BitOrder, BitReader};
use dsun_types::file::image::{extract_frames, rle};
use std::hint::black_box;

/// Benchmark full-frame decoding for both encodings
fn bench_frame_decoding(c: &mut Criterion) {
	let mut group = c.benchmark_group("frame_decode");

	for size in [32u16, 128] {
		let pixels = u64::from(size) * u64::from(size);
		group.throughput(Throughput::Elements(pixels));

		let row_based = image_with_frame(&row_based_frame(size, size));
		group.bench_with_input(BenchmarkId::new("row_based", size), &row_based, |b, data| {
			b.iter(|| {
				let frames = extract_frames(black_box(data)).unwrap();
				black_box(frames[0].pixels().len())
			});
		});

		let plnr = image_with_frame(&plnr_frame(size, size));
		group.bench_with_input(BenchmarkId::new("plnr", size), &plnr, |b, data| {
			b.iter(|| {
				let frames = extract_frames(black_box(data)).unwrap();
				black_box(frames[0].pixels().len())
			});
		});
	}

	group.finish();
}

/// Benchmark the pixel-run codec on its own
fn bench_rle(c: &mut Criterion) {
	let mut group = c.benchmark_group("rle");

	// Alternate a 128-byte repeat run and 4 plain bytes.
	let mut compressed = Vec::new();
	let mut uncompressed_length = 0;
	for i in 0..64u8 {
		compressed.extend_from_slice(&[0xFF, i]);
		compressed.extend_from_slice(&[0x06, i, i, i, i]);
		uncompressed_length += 128 + 4;
	}

	group.throughput(Throughput::Bytes(uncompressed_length as u64));
	group.bench_function("decode", |b| {
		b.iter(|| {
			let decoded = rle::decode(black_box(&compressed), uncompressed_length).unwrap();
			black_box(decoded.len())
		});
	});

	group.finish();
}

/// Benchmark bit-field extraction at typical symbol widths
fn bench_bit_reader(c: &mut Criterion) {
	let mut group = c.benchmark_group("bit_reader");

	let data: Vec<u8> = (0..4096).map(|i| (i % 251) as u8).collect();

	for bits in [1u32, 4, 11] {
		let chomps = (data.len() * 8) as u64 / u64::from(bits);
		group.throughput(Throughput::Elements(chomps));
		group.bench_with_input(BenchmarkId::new("chomp", bits), &bits, |b, &bits| {
			b.iter(|| {
				let mut reader = BitReader::new(&data, 0, 0, BitOrder::BigEndian).unwrap();
				let mut total = 0u32;
				while reader.has_remaining(bits as usize) {
					total = total.wrapping_add(u32::from(reader.chomp(bits).unwrap()));
				}
				black_box(total)
			});
		});
	}

	group.finish();
}

criterion_group!(benches, bench_frame_decoding, bench_rle, bench_bit_reader);

criterion_main!(benches);
