mod adapter;
mod simulate;
mod stream;
mod types;


pub use adapter::{ChunkSink, DialectAdapter, DiscardChunks, SinkClosed};
pub use simulate::{simulate_event_stream, simulate_stream};
pub use stream::{ProcessError, StreamProcessor};
pub use types::{Dialect, StreamFormat, stream_format};
