pub mod classifier;
pub mod domain;
pub mod gate;
pub mod ports;
pub mod resolver;

pub use classifier::{is_isbn, normalize};
pub use domain::{Book, BookBox, BookMetadata, NewBook, RawDecodeEvent};
pub use gate::{GateConfig, GateDecision, RejectReason, ScanGate};
pub use ports::{BookRepository, BookStream, MetadataSource, PortError, PortResult};
pub use resolver::MetadataResolver;
