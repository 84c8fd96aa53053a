//! Модуль для отслеживания прогресса сборки таймлайна
//!
//! Прогресс передается одной дробью в диапазоне [0, 1] не чаще одного раза
//! на обработанный сегмент и строго в порядке сегментов.

use tokio::sync::broadcast;

/// Трейт для наблюдателя, получающего уведомления о прогрессе
pub trait ProgressObserver: Send + Sync {
    /// Метод, вызываемый после обработки очередного сегмента
    fn on_progress_update(&self, fraction: f32);
}

impl<F> ProgressObserver for F
where
    F: Fn(f32) + Send + Sync,
{
    fn on_progress_update(&self, fraction: f32) {
        (self)(fraction)
    }
}

/// Наблюдатель, пересылающий прогресс в канал Tokio
///
/// Удобен, когда прогресс читает другая задача (например, UI),
/// а сборка идет в текущей.
pub struct BroadcastProgress {
    tx: broadcast::Sender<f32>,
}

impl BroadcastProgress {
    /// Создать наблюдателя и первый приемник
    pub fn new() -> (Self, broadcast::Receiver<f32>) {
        let (tx, rx) = broadcast::channel(100);
        (Self { tx }, rx)
    }

    /// Подписать еще один приемник
    pub fn subscribe(&self) -> broadcast::Receiver<f32> {
        self.tx.subscribe()
    }
}

impl ProgressObserver for BroadcastProgress {
    fn on_progress_update(&self, fraction: f32) {
        // Нет подписчиков - не ошибка
        if self.tx.send(fraction.clamp(0.0, 1.0)).is_err() {
            log::debug!("Progress update {:.3} dropped: no receivers", fraction);
        }
    }
}

/// Уведомить наблюдателя, если он задан
pub(crate) fn report(observer: Option<&dyn ProgressObserver>, done: usize, total: usize) {
    if let Some(observer) = observer {
        let fraction = if total == 0 { 1.0 } else { done as f32 / total as f32 };
        observer.on_progress_update(fraction.clamp(0.0, 1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_closure_observer() {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();
        let observer = move |fraction: f32| sink.lock().unwrap().push(fraction);

        report(Some(&observer), 1, 4);
        report(Some(&observer), 4, 4);

        assert_eq!(*updates.lock().unwrap(), vec![0.25, 1.0]);
    }

    #[tokio::test]
    async fn test_broadcast_observer() {
        let (observer, mut rx) = BroadcastProgress::new();
        observer.on_progress_update(0.5);
        observer.on_progress_update(1.5);

        assert_eq!(rx.recv().await.unwrap(), 0.5);
        assert_eq!(rx.recv().await.unwrap(), 1.0);
    }
}
