pub mod init;
pub mod lock;
pub mod misc;
pub mod status;
pub mod unlock;
