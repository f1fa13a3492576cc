//! Concurrent band reads over one slow shared stream

use std::io::{Cursor, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use metop_avhrr::format::writer::ProductWriter;
use metop_avhrr::{BandReader, Channel, DecoderConfig, Orientation, Product, ReadStatus, Window};

/// Stream that yields the thread on every read, so unsynchronised seek and
/// read pairs from different threads would interleave
struct SlowStream {
    inner: Cursor<Vec<u8>>,
    reads: Arc<AtomicUsize>,
}

impl Read for SlowStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        thread::sleep(Duration::from_micros(50));
        self.inner.read(buf)
    }
}

impl Seek for SlowStream {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        thread::yield_now();
        self.inner.seek(pos)
    }
}

fn product_bytes() -> Vec<u8> {
    let writer = ProductWriter::new(20);
    let scan_lines: Vec<_> = (0..41i16)
        .map(|line| {
            let mut scan_line = writer.blank_scan_line();
            for (row, values) in scan_line.radiances.iter_mut().enumerate() {
                values.fill(line * 10 + row as i16);
            }
            scan_line.cloud.fill(line as u16);
            scan_line
        })
        .collect();
    writer.scan_lines(scan_lines).to_bytes().unwrap()
}

#[test]
fn test_parallel_band_reads() {
    let reads = Arc::new(AtomicUsize::new(0));
    let stream = SlowStream {
        inner: Cursor::new(product_bytes()),
        reads: Arc::clone(&reads),
    };
    let config = DecoderConfig {
        orientation: Orientation::Keep,
        ..DecoderConfig::default()
    };
    let product = Product::open(stream, &config).unwrap();
    let width = product.geometry().raster_width;
    let window = Window::new(0, 0, width, 41).with_step(7, 1);

    let radiance = product.radiance_reader(Channel::Ch4);
    let cloud = product.cloud_reader();

    thread::scope(|scope| {
        let radiance_worker = scope.spawn(|| {
            let mut out = vec![0i16; window.output_len()];
            let status = radiance
                .read_window(&window, &mut out, &AtomicBool::new(false))
                .unwrap();
            (status, out)
        });
        let cloud_worker = scope.spawn(|| {
            let mut out = vec![0u16; window.output_len()];
            let status = cloud
                .read_window(&window, &mut out, &AtomicBool::new(false))
                .unwrap();
            (status, out)
        });

        let (status, out) = radiance_worker.join().unwrap();
        assert_eq!(status, ReadStatus::Complete);
        for (row, values) in out.chunks(window.output_width()).enumerate() {
            assert!(values.iter().all(|value| *value == row as i16 * 10 + 3));
        }

        let (status, out) = cloud_worker.join().unwrap();
        assert_eq!(status, ReadStatus::Complete);
        for (row, values) in out.chunks(window.output_width()).enumerate() {
            assert!(values.iter().all(|value| *value == row as u16));
        }
    });

    assert!(reads.load(Ordering::Relaxed) >= 82);
}

/// Stream that raises a cancel flag once a set number of reads went through
struct CancellingStream {
    inner: Cursor<Vec<u8>>,
    reads_left: Arc<AtomicUsize>,
    cancel: Arc<AtomicBool>,
}

impl Read for CancellingStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let read = self.inner.read(buf)?;
        if self.reads_left.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.cancel.store(true, Ordering::SeqCst);
        }
        Ok(read)
    }
}

impl Seek for CancellingStream {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}

#[test]
fn test_cancel_mid_window() {
    const SENTINEL: i16 = i16::MIN;

    let reads_left = Arc::new(AtomicUsize::new(usize::MAX));
    let cancel = Arc::new(AtomicBool::new(false));
    let stream = CancellingStream {
        inner: Cursor::new(product_bytes()),
        reads_left: Arc::clone(&reads_left),
        cancel: Arc::clone(&cancel),
    };
    let config = DecoderConfig {
        orientation: Orientation::Keep,
        ..DecoderConfig::default()
    };
    let product = Product::open(stream, &config).unwrap();
    let reader = product.radiance_reader(Channel::Ch1);
    let window = Window::new(0, 0, 8, 41);

    // one read per scan line; the flag goes up while the third row is read
    reads_left.store(3, Ordering::SeqCst);
    let mut out = vec![SENTINEL; window.output_len()];
    let status = reader.read_window(&window, &mut out, &cancel).unwrap();
    assert_eq!(status, ReadStatus::Cancelled);

    let rows: Vec<_> = out.chunks(window.output_width()).collect();
    for (line, values) in rows[..3].iter().enumerate() {
        assert!(values.iter().all(|value| *value == line as i16 * 10));
    }
    for values in &rows[3..] {
        assert!(values.iter().all(|value| *value == SENTINEL));
    }
}
