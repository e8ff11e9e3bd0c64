// ════════════════════════════════════════════════════════════════
//  Configuration
// ════════════════════════════════════════════════════════════════

fn default_data_dir() -> String {
    "./data/messages".to_string()
}

fn default_unique_correlation_id() -> bool {
    true
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct FileStoreConfig {
    /// Каталог с файлами `{phoneNumber}.jsonl`.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_unique_correlation_id")]
    pub unique_correlation_id: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            unique_correlation_id: default_unique_correlation_id(),
        }
    }
}
