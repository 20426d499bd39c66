pub mod frame;

pub use frame::{encode_plain, encode_sse, PlainTextDecoder, SseDecoder};
