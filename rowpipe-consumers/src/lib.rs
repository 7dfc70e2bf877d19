//! Consumer front-ends over lazy pipeline execution trees
//!
//! Four ways to drain a pipeline, all sharing one lifecycle core: pull
//! rows in process ([`IteratorConsumer`]), stream them at a device
//! endpoint ([`DeviceStreamConsumer`]), persist them as a sharded
//! record dataset ([`BulkWriterConsumer`]), or answer shape and size
//! questions without a training pass ([`IntrospectionConsumer`]).

pub mod consumer;
pub mod device;
pub mod introspect;
pub mod iterator;
pub mod writer;

// Re-export key types for convenience
pub use consumer::{Consumer, ConsumerCore, LifecycleState};
pub use device::{
    host_queue_channel, DeviceChannel, DevicePacket, DeviceStreamConsumer, DeviceStreamOptions,
    HostQueueChannel, HostQueueReceiver, TransferPhase,
};
pub use introspect::IntrospectionConsumer;
pub use iterator::IteratorConsumer;
pub use writer::{BulkWriterConsumer, BulkWriterOptions, DEFAULT_DATASET_TYPE};

// Re-export core types
pub use rowpipe_core::{
    DatasetDescription, Epochs, Error, ExecutionTree, Pull, Result, Row, RowSchema,
};
