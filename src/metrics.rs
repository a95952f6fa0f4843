//! Lightweight global metrics for vkrestore.
//!
//! Thread-safe atomic counters for:
//! - Reference registry (control blocks created / released)
//! - State tracker (objects created / destroyed, operations recorded)
//! - Restore-point creator (records, command streams, bytes)
//! - Restore-point applier (objects restored, operations replayed)

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Registry -----
static REFERENCES_CREATED: AtomicU64 = AtomicU64::new(0);
static REFERENCES_RELEASED: AtomicU64 = AtomicU64::new(0);

// ----- State tracker -----
static OBJECTS_CREATED: AtomicU64 = AtomicU64::new(0);
static OBJECTS_DESTROYED: AtomicU64 = AtomicU64::new(0);
static OPERATIONS_RECORDED: AtomicU64 = AtomicU64::new(0);

// ----- Creator -----
static RECORDS_WRITTEN: AtomicU64 = AtomicU64::new(0);
static COMMAND_STREAMS_WRITTEN: AtomicU64 = AtomicU64::new(0);
static BYTES_WRITTEN: AtomicU64 = AtomicU64::new(0);

// ----- Applier -----
static OBJECTS_RESTORED: AtomicU64 = AtomicU64::new(0);
static OPERATIONS_REPLAYED: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub references_created: u64,
    pub references_released: u64,

    pub objects_created: u64,
    pub objects_destroyed: u64,
    pub operations_recorded: u64,

    pub records_written: u64,
    pub command_streams_written: u64,
    pub bytes_written: u64,

    pub objects_restored: u64,
    pub operations_replayed: u64,
}

impl MetricsSnapshot {
    /// Control blocks still alive across every registry in the process.
    pub fn references_live(&self) -> u64 {
        self.references_created
            .saturating_sub(self.references_released)
    }
}

// ----- Recorders -----
pub fn record_reference_created() {
    REFERENCES_CREATED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_reference_released() {
    REFERENCES_RELEASED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_object_created() {
    OBJECTS_CREATED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_object_destroyed() {
    OBJECTS_DESTROYED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_operation_recorded() {
    OPERATIONS_RECORDED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_record_written(bytes: usize) {
    RECORDS_WRITTEN.fetch_add(1, Ordering::Relaxed);
    BYTES_WRITTEN.fetch_add(bytes as u64, Ordering::Relaxed);
}

pub fn record_command_stream_written(bytes: usize) {
    COMMAND_STREAMS_WRITTEN.fetch_add(1, Ordering::Relaxed);
    BYTES_WRITTEN.fetch_add(bytes as u64, Ordering::Relaxed);
}

pub fn record_object_restored() {
    OBJECTS_RESTORED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_operation_replayed() {
    OPERATIONS_REPLAYED.fetch_add(1, Ordering::Relaxed);
}

// ----- Snapshot / Reset -----
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        references_created: REFERENCES_CREATED.load(Ordering::Relaxed),
        references_released: REFERENCES_RELEASED.load(Ordering::Relaxed),

        objects_created: OBJECTS_CREATED.load(Ordering::Relaxed),
        objects_destroyed: OBJECTS_DESTROYED.load(Ordering::Relaxed),
        operations_recorded: OPERATIONS_RECORDED.load(Ordering::Relaxed),

        records_written: RECORDS_WRITTEN.load(Ordering::Relaxed),
        command_streams_written: COMMAND_STREAMS_WRITTEN.load(Ordering::Relaxed),
        bytes_written: BYTES_WRITTEN.load(Ordering::Relaxed),

        objects_restored: OBJECTS_RESTORED.load(Ordering::Relaxed),
        operations_replayed: OPERATIONS_REPLAYED.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    REFERENCES_CREATED.store(0, Ordering::Relaxed);
    REFERENCES_RELEASED.store(0, Ordering::Relaxed);

    OBJECTS_CREATED.store(0, Ordering::Relaxed);
    OBJECTS_DESTROYED.store(0, Ordering::Relaxed);
    OPERATIONS_RECORDED.store(0, Ordering::Relaxed);

    RECORDS_WRITTEN.store(0, Ordering::Relaxed);
    COMMAND_STREAMS_WRITTEN.store(0, Ordering::Relaxed);
    BYTES_WRITTEN.store(0, Ordering::Relaxed);

    OBJECTS_RESTORED.store(0, Ordering::Relaxed);
    OPERATIONS_REPLAYED.store(0, Ordering::Relaxed);
}
