//! Модуль синхронизации озвучки с оригинальной дорожкой
//!
//! Подгонка длительности отдельных клипов и сборка из них непрерывного
//! таймлайна.

pub mod reconciler;
pub mod timeline;

pub use reconciler::{effective_ratio, tempo_chain, DurationReconciler};
pub use timeline::TimelineAssembler;
