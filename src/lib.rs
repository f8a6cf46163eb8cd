//! Simple attendance tracking for the terminal. Tap in once per day, tap out
//! when you are done, pin free-text notes to any recorded day, and browse the
//! history by year and month. A watch mode closes any record still open at
//! the end of its calendar day.
//!

pub mod cli;
pub mod ledger;
pub mod storage;
pub mod utils;
pub mod watch;
