//! Benchmarks for RFID frame decoding and temperature decode.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench frame_bench
//! ```

use boardkit_hardware::TransportRegistry;
use boardkit_hardware::mock::MockPlatform;
use boardkit_rfid::{RfidFrame, RfidFrameReader, RfidReaderConfig, RfidTag};
use boardkit_sensors::TemperatureReading;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

/// Benchmark parsing single lines with and without a checksum.
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_parse");
    group.throughput(Throughput::Elements(1));

    let tag = RfidTag::new("6F008B2A3E").unwrap();
    for (name, with_checksum) in [("plain", false), ("checksum", true)] {
        let wire = RfidFrame::encode(&tag, with_checksum);
        let line = &wire[..wire.len() - 1];
        group.bench_with_input(BenchmarkId::new("parse", name), line, |b, line| {
            b.iter(|| {
                let frame = RfidFrame::parse(black_box(line)).unwrap();
                black_box(frame.verify_checksum().unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark reading a burst of frames through the reader on the mock UART.
fn bench_reader_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_reader");

    for count in [1usize, 16, 128] {
        let wire: Vec<u8> = (0..count)
            .flat_map(|i| {
                let tag = RfidTag::new(format!("{:010X}", i)).unwrap();
                RfidFrame::encode(&tag, true).to_vec()
            })
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("burst", count), &wire, |b, wire| {
            let (platform, handle) = MockPlatform::new();
            let registry = TransportRegistry::new(platform);
            let mut reader = RfidFrameReader::new(&registry, RfidReaderConfig::default()).unwrap();

            b.iter(|| {
                handle.push_serial(wire);
                while let Some(tag) = reader.get_last_scan().unwrap() {
                    black_box(tag);
                }
            });
        });
    }

    group.finish();
}

/// Benchmark the temperature decode over the full word range.
fn bench_temperature_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("temperature_decode");
    group.throughput(Throughput::Elements(u64::from(u16::MAX) + 1));

    group.bench_function("all_words", |b| {
        b.iter(|| {
            let mut total = 0.0;
            for word in 0..=u16::MAX {
                let reading = TemperatureReading::from_raw(black_box(word));
                total += reading.celsius() + reading.fahrenheit();
            }
            black_box(total);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_reader_burst,
    bench_temperature_decode
);
criterion_main!(benches);
