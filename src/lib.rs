//! MuSync - shared listening for streamers.
//!
//! The server keeps one playback record per channel and answers "where is the
//! track right now" from a recorded start instant, so any number of listeners
//! can follow along with nothing but periodic polling. The client half polls
//! that answer and nudges a local audio player back into tolerance.

pub mod client;
pub mod config;
pub mod constants;
pub mod models;
pub mod player;
pub mod position;
pub mod server;
pub mod store;
pub mod utils;
