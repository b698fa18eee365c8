//! Request handlers

pub mod gop;
pub mod health;
pub mod listing;
pub mod notification;
pub mod ws;
