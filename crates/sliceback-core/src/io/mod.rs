//! I/O utilities shared by the compressor, tar writer, and slice manager.

pub mod cancellable;
pub mod counting;

pub use cancellable::CancellableReader;
pub use cancellable::is_cancellation;
pub use counting::CountingWriter;
