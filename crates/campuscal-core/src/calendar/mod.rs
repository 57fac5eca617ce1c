//! Calendar data: month keys, the fetch window, decoding and merging.

pub mod decode;
pub mod merge;
pub mod month;

pub use decode::{decode_utf16le, DecodeError};
pub use merge::{count_events, merge_all, MergedCalendar};
pub use month::{FetchWindow, MonthCalendar, MonthKey};
