//! Модуль для работы с временными файлами
//!
//! Рабочая область одного прогона: уникальные имена для всех промежуточных
//! клипов и их удаление по завершении.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::TempDir;

use crate::error::Result;

/// Рабочая директория прогона
pub struct WorkDir {
    /// Временная директория (если директория не задана явно)
    _temp_dir: Option<TempDir>,
    /// Путь к директории
    root: PathBuf,
    /// Список выданных файлов
    files: Mutex<Vec<PathBuf>>,
    /// Нужно ли удалять файлы при завершении
    cleanup: bool,
}

impl WorkDir {
    /// Создать рабочую область.
    ///
    /// Если `base` не задан и очистка включена, используется `TempDir`,
    /// который исчезает вместе со всем содержимым. Если очистка выключена,
    /// директория создается в системном temp и остается после прогона.
    pub fn new(base: Option<&Path>, cleanup: bool) -> Result<Self> {
        let (temp_dir, root) = match base {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                (None, dir.to_path_buf())
            }
            None if cleanup => {
                let temp_dir = tempfile::Builder::new().prefix("tts-dub-").tempdir()?;
                let root = temp_dir.path().to_path_buf();
                (Some(temp_dir), root)
            }
            None => {
                let root = std::env::temp_dir().join(format!("tts-dub-{}", uuid::Uuid::new_v4()));
                fs::create_dir_all(&root)?;
                (None, root)
            }
        };

        Ok(Self {
            _temp_dir: temp_dir,
            root,
            files: Mutex::new(Vec::new()),
            cleanup,
        })
    }

    /// Выдать уникальный путь для нового файла. Сам файл не создается.
    pub fn file(&self, prefix: &str, extension: &str) -> PathBuf {
        let file_name = format!("{}_{}.{}", prefix, uuid::Uuid::new_v4(), extension);
        let path = self.root.join(file_name);
        self.files.lock().push(path.clone());
        path
    }

    /// Путь к рабочей директории
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Удалить выданные файлы
    pub fn cleanup(&self) -> Result<()> {
        if self.cleanup {
            let mut files = self.files.lock();
            for file in files.iter() {
                if file.exists() {
                    fs::remove_file(file)?;
                }
            }
            files.clear();
        }

        Ok(())
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        // Пытаемся очистить файлы при уничтожении объекта
        let _ = self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_names() {
        let work = WorkDir::new(None, true).unwrap();
        let a = work.file("clip", "wav");
        let b = work.file("clip", "wav");
        assert_ne!(a, b);
        assert!(a.starts_with(work.path()));
        assert_eq!(a.extension().unwrap(), "wav");
    }

    #[test]
    fn test_cleanup_removes_issued_files_only() {
        let base = tempfile::tempdir().unwrap();
        let foreign = base.path().join("timeline.wav");
        fs::write(&foreign, b"y").unwrap();

        let work = WorkDir::new(Some(base.path()), true).unwrap();
        let scratch = work.file("scratch", "wav");
        fs::write(&scratch, b"x").unwrap();
        drop(work);

        assert!(!scratch.exists());
        assert!(foreign.exists());
    }
}
