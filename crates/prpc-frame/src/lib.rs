//! PRPC frame grammar and codec.
//!
//! A PRPC frame is one line of text:
//!
//! ```text
//! <seq>:<identifier>[ <arg> <arg> ...]\n
//! ```
//!
//! - `seq` is a decimal sequence id, or `*` for a notification
//! - `identifier` is a `/`-separated command path (`gpio/led/set`)
//! - arguments are `yes`/`no`, integers, floats with an explicit
//!   fractional part, or double-quoted strings with `\"` escapes
//!
//! This crate parses and serializes frames, and turns a raw byte stream
//! into complete lines. It knows nothing about request correlation.

pub mod arg;
pub mod codec;
pub mod error;
pub mod lines;
pub mod parser;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod line_codec;

pub use arg::Arg;
pub use codec::{
    decode_frame, encode_frame, is_valid_identifier, Frame, FrameConfig, ResponseKind, SeqId,
    DEFAULT_MAX_LINE_LENGTH,
};
pub use error::{FrameError, ParseError, Result};
pub use lines::{LineBuffer, TextEncoding};
pub use parser::parse_arg;
pub use reader::{FrameReader, Incoming};
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use line_codec::LineCodec;
