//! Вспомогательные модули: FFmpeg, временные файлы, логирование

pub mod ffmpeg;
pub mod logger;
pub mod temp;

pub use ffmpeg::FfmpegToolkit;
pub use temp::WorkDir;
