// Wire and persistence data model shared by server and listener

pub mod playback;
pub mod status;
pub mod track;

pub use playback::PlaybackRecord;
pub use status::StatusResponse;
pub use track::Track;
