//! Request and response bodies

pub mod gop;
pub mod ws;
