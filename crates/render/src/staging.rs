use std::marker::PhantomData;

use crate::device::DeviceContext;
use crate::records::GpuRecord;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StagingError {
    #[error("{label}: record {index} exceeds capacity {capacity}")]
    BufferCapacityExceeded {
        label: &'static str,
        index: usize,
        capacity: usize,
    },
}

/// Host-side mirror of one GPU storage buffer.
///
/// The host array is allocated once at `capacity * R::STRIDE` floats and never
/// grows. Records past capacity are dropped and counted rather than written.
#[derive(Debug)]
pub struct StagingBuffer<R: GpuRecord> {
    label: &'static str,
    binding: u32,
    capacity: usize,
    host: Vec<f32>,
    written: usize,
    dropped: u64,
    _record: PhantomData<fn(&R)>,
}

impl<R: GpuRecord> StagingBuffer<R> {
    pub fn new(label: &'static str, binding: u32, capacity: usize) -> Self {
        Self {
            label,
            binding,
            capacity,
            host: vec![0.0; capacity * R::STRIDE],
            written: 0,
            dropped: 0,
            _record: PhantomData,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn binding(&self) -> u32 {
        self.binding
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stride(&self) -> usize {
        R::STRIDE
    }

    /// Records written since the last flush.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Records dropped for lack of capacity over the buffer's lifetime.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Write `record` at slot `index`. Callers write slots 0, 1, 2, ... in
    /// order each frame; the write count advances by one per accepted record.
    pub fn record(&mut self, index: usize, record: &R) -> Result<(), StagingError> {
        if index >= self.capacity {
            self.dropped += 1;
            return Err(StagingError::BufferCapacityExceeded {
                label: self.label,
                index,
                capacity: self.capacity,
            });
        }
        let start = index * R::STRIDE;
        record.write_record(&mut self.host[start..start + R::STRIDE]);
        self.written += 1;
        Ok(())
    }

    /// Write `record` at the next free slot.
    pub fn push(&mut self, record: &R) -> Result<(), StagingError> {
        self.record(self.written, record)
    }

    /// The floats the next flush will upload.
    pub fn pending(&self) -> &[f32] {
        let end = (self.written * R::STRIDE).min(self.host.len());
        &self.host[..end]
    }

    /// Upload the written prefix to the buffer's binding slot and reset the
    /// write count. Returns the number of floats uploaded.
    pub fn flush<D: DeviceContext + ?Sized>(&mut self, device: &mut D) -> usize {
        let elements = self.written.min(self.capacity);
        let floats = elements * R::STRIDE;
        device.write_storage(self.binding, &self.host[..floats], elements);
        tracing::trace!(buffer = self.label, elements, floats, "staging flushed");
        self.written = 0;
        floats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCommand, RecordingDevice};
    use glam::Vec3;
    use roomtrace_kernel::{Orbit, Sphere};

    fn sphere(i: usize) -> Sphere {
        Sphere::new(Vec3::new(i as f32, 0.0, 0.5), 0.25, Vec3::ONE, 0.0, Orbit::STATIC)
    }

    #[test]
    fn host_array_is_sized_once() {
        let buf: StagingBuffer<Sphere> = StagingBuffer::new("spheres", 1, 16);
        assert_eq!(buf.stride(), 8);
        assert_eq!(buf.host.len(), 128);
        assert!(buf.pending().is_empty());
    }

    #[test]
    fn records_keep_their_order() {
        let mut buf = StagingBuffer::new("spheres", 1, 8);
        for i in 0..5 {
            buf.record(i, &sphere(i)).unwrap();
        }
        let xs: Vec<f32> = buf.pending().chunks(8).map(|r| r[0]).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0, 4.0]);

        let mut device = RecordingDevice::new();
        assert_eq!(buf.flush(&mut device), 40);
        assert_eq!(buf.written(), 0);
        match &device.commands()[0] {
            DeviceCommand::WriteStorage {
                binding,
                floats,
                elements,
            } => {
                assert_eq!(*binding, 1);
                assert_eq!(*elements, 5);
                assert_eq!(floats.len(), 40);
                assert_eq!(floats[32], 4.0);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn overflow_is_dropped_and_reported() {
        let mut buf = StagingBuffer::new("spheres", 1, 1024);
        for i in 0..1024 {
            buf.push(&sphere(i)).unwrap();
        }
        let err = buf.push(&sphere(1024)).unwrap_err();
        assert_eq!(
            err,
            StagingError::BufferCapacityExceeded {
                label: "spheres",
                index: 1024,
                capacity: 1024
            }
        );
        assert_eq!(buf.written(), 1024);
        assert_eq!(buf.dropped(), 1);
        assert_eq!(buf.host.len(), 1024 * 8);

        let mut device = RecordingDevice::new();
        assert_eq!(buf.flush(&mut device), 8192);
        assert_eq!(device.storage_floats(1), 8192);
    }

    #[test]
    fn flush_with_nothing_written_uploads_nothing() {
        let mut buf: StagingBuffer<Sphere> = StagingBuffer::new("spheres", 1, 4);
        let mut device = RecordingDevice::new();
        assert_eq!(buf.flush(&mut device), 0);
        assert_eq!(device.storage_floats(1), 0);
    }

    #[test]
    fn zero_capacity_rejects_everything() {
        let mut buf = StagingBuffer::new("spheres", 1, 0);
        assert!(buf.record(0, &sphere(0)).is_err());
        assert_eq!(buf.dropped(), 1);
    }
}
