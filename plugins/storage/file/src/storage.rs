use std::collections::HashSet;
use std::future::Future;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::sync::Mutex;

use sms_api::{Message, MessageStore, StoreError};

use super::config::FileStoreConfig;

// ════════════════════════════════════════════════════════════════
//  FileStore
// ════════════════════════════════════════════════════════════════

/// Durable store в JSON lines: один append-only файл на partition key
/// (`{data_dir}/{phoneNumber}.jsonl`), по строке на сообщение.
pub struct FileStore {
    data_dir: PathBuf,
    unique_correlation_id: bool,
    /// Индекс correlation id. Mutex также сериализует запись в файлы.
    index: Mutex<HashSet<String>>,
}

impl FileStore {
    pub fn new(config: &FileStoreConfig) -> Self {
        Self {
            data_dir: PathBuf::from(&config.data_dir),
            unique_correlation_id: config.unique_correlation_id,
            index: Mutex::new(HashSet::new()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Путь к файлу ключа. Ключ становится именем файла, поэтому
    /// допускаются только `[0-9A-Za-z+_-]`.
    fn key_path(&self, key: &str) -> Option<PathBuf> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_'));
        valid.then(|| self.data_dir.join(format!("{key}.jsonl")))
    }

    fn key_files(&self) -> Vec<PathBuf> {
        let dir = match std::fs::read_dir(&self.data_dir) {
            Ok(d) => d,
            Err(_) => return Vec::new(),
        };

        let mut files: Vec<PathBuf> = dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "jsonl"))
            .collect();
        files.sort();
        files
    }

    fn do_insert(&self, index: &mut HashSet<String>, records: &[Message]) -> Result<usize, StoreError> {
        let attempted = records.len();
        let mut written = 0;
        let mut first_error: Option<String> = None;
        let mut io_failed = false;
        let mut duplicates = 0;

        for (i, record) in records.iter().enumerate() {
            let Some(path) = self.key_path(&record.phone_number) else {
                first_error.get_or_insert_with(|| {
                    format!("index {i}: invalid phoneNumber '{}'", record.phone_number)
                });
                continue;
            };
            let unique = self.unique_correlation_id && !record.correlation_id.is_empty();
            if unique && index.contains(&record.correlation_id) {
                duplicates += 1;
                first_error.get_or_insert_with(|| {
                    format!("index {i}: duplicate correlationId '{}'", record.correlation_id)
                });
                continue;
            }

            let line = serde_json::to_string(record)?;
            if let Err(e) = append_line(&path, &line) {
                tracing::error!(path = %path.display(), error = %e, "append failed");
                io_failed = true;
                first_error.get_or_insert_with(|| format!("index {i}: {e}"));
                continue;
            }
            if unique {
                index.insert(record.correlation_id.clone());
            }
            written += 1;
        }

        match first_error {
            None => Ok(written),
            Some(reason) if written == 0 && io_failed => Err(StoreError::Io(reason)),
            Some(reason) => Err(StoreError::Partial { written, attempted, duplicates, reason }),
        }
    }

    fn rebuild_index(&self) -> Result<HashSet<String>, StoreError> {
        let mut index = HashSet::new();
        for path in self.key_files() {
            for message in read_file(&path)? {
                if !message.correlation_id.is_empty() {
                    index.insert(message.correlation_id);
                }
            }
        }
        Ok(index)
    }
}

// ════════════════════════════════════════════════════════════════
//  MessageStore impl
// ════════════════════════════════════════════════════════════════

impl MessageStore for FileStore {
    fn init(&self) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async move {
            std::fs::create_dir_all(&self.data_dir)
                .map_err(|e| StoreError::Io(format!("mkdir {}: {e}", self.data_dir.display())))?;
            let rebuilt = self.rebuild_index()?;
            tracing::info!(
                data_dir = %self.data_dir.display(),
                indexed = rebuilt.len(),
                "file store ready"
            );
            *self.index.lock().await = rebuilt;
            Ok(())
        })
    }

    fn insert_batch(
        &self,
        records: &[Message],
    ) -> Pin<Box<dyn Future<Output = Result<usize, StoreError>> + Send + '_>> {
        let records = records.to_vec();
        Box::pin(async move {
            let mut index = self.index.lock().await;
            self.do_insert(&mut index, &records)
        })
    }

    fn find_by_phone(
        &self,
        phone_number: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Message>, StoreError>> + Send + '_>> {
        let path = self.key_path(phone_number);
        Box::pin(async move {
            match path {
                Some(path) if path.exists() => read_file(&path),
                _ => Ok(Vec::new()),
            }
        })
    }

    fn list(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Message>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut result = Vec::new();
            for path in self.key_files() {
                result.extend(read_file(&path)?);
            }
            result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(result)
        })
    }

    fn delete_all(&self) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut index = self.index.lock().await;
            let mut deleted = 0u64;
            for path in self.key_files() {
                deleted += read_file(&path)?.len() as u64;
                std::fs::remove_file(&path)
                    .map_err(|e| StoreError::Io(format!("remove {}: {e}", path.display())))?;
            }
            index.clear();
            Ok(deleted)
        })
    }

    fn flush(&self) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        // Строки пишутся без буферизации, fsync не нужен для текущих гарантий
        Box::pin(async { Ok(()) })
    }
}

// ════════════════════════════════════════════════════════════════
//  Helpers
// ════════════════════════════════════════════════════════════════

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(f, "{line}")
}

fn read_file(path: &Path) -> Result<Vec<Message>, StoreError> {
    let f = std::fs::File::open(path)
        .map_err(|e| StoreError::Io(format!("open {}: {e}", path.display())))?;
    let reader = std::io::BufReader::new(f);

    let mut result = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| StoreError::Io(format!("read line: {e}")))?;
        if line.trim().is_empty() {
            continue;
        }
        let message: Message = serde_json::from_str(&line)
            .map_err(|e| StoreError::Format(format!("{}: {e}", path.display())))?;
        result.push(message);
    }
    Ok(result)
}
