use std::sync::atomic::AtomicBool;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use metop_avhrr::format::writer::ProductWriter;
use metop_avhrr::{BandReader, Channel, DecoderConfig, Orientation, Product, Window};
use tempfile::NamedTempFile;

fn write_product(file: &NamedTempFile) {
    let writer = ProductWriter::new(20);
    let scan_lines: Vec<_> = (0..201i16)
        .map(|line| {
            let mut scan_line = writer.blank_scan_line();
            for values in &mut scan_line.radiances {
                for (column, value) in values.iter_mut().enumerate() {
                    *value = line + (column % 1000) as i16;
                }
            }
            scan_line
        })
        .collect();
    writer.scan_lines(scan_lines).write_to_path(file.path()).unwrap();
}

fn bench_open(c: &mut Criterion) {
    let file = NamedTempFile::new().unwrap();
    write_product(&file);

    c.bench_function("open_product", |b| {
        b.iter(|| {
            let product = Product::open_path(black_box(file.path()), &DecoderConfig::default()).unwrap();
            black_box(product.geometry().raster_height);
        });
    });
}

fn bench_band_read(c: &mut Criterion) {
    let file = NamedTempFile::new().unwrap();
    write_product(&file);
    let cancel = AtomicBool::new(false);

    for orientation in [Orientation::Keep, Orientation::Flip] {
        let config = DecoderConfig {
            orientation,
            ..DecoderConfig::default()
        };
        let product = Product::open_path(file.path(), &config).unwrap();
        let window = Window::new(0, 0, product.geometry().raster_width, 201);

        let radiance = product.radiance_reader(Channel::Ch2);
        let mut counts = vec![0i16; window.output_len()];
        c.bench_function(&format!("radiance_full_raster_{orientation:?}"), |b| {
            b.iter(|| radiance.read_window(black_box(&window), &mut counts, &cancel).unwrap());
        });

        let temperature = product.temperature_reader(Channel::Ch4).unwrap();
        let mut temperatures = vec![0f32; window.output_len()];
        c.bench_function(&format!("temperature_full_raster_{orientation:?}"), |b| {
            b.iter(|| {
                temperature
                    .read_window(black_box(&window), &mut temperatures, &cancel)
                    .unwrap()
            });
        });
    }

    let product = Product::open_path(file.path(), &DecoderConfig::default()).unwrap();
    c.bench_function("tie_point_grids", |b| {
        b.iter(|| black_box(product.tie_point_grids().unwrap()));
    });
}

criterion_group!(benches, bench_open, bench_band_read);
criterion_main!(benches);
