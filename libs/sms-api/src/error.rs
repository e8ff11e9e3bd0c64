/// Category of a collaborator error. Allows the caller to make intelligent
/// decisions about error handling (skip, retry, fail fast).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid configuration: permanent, fail at startup.
    Config,
    /// I/O or transport error: transient, may retry/reconnect.
    Io,
    /// Data format/parse error: bad input, skip record.
    Format,
    /// Logical error (not found, invalid state, generic).
    Logic,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Config => f.write_str("config"),
            ErrorKind::Io => f.write_str("io"),
            ErrorKind::Format => f.write_str("format"),
            ErrorKind::Logic => f.write_str("logic"),
        }
    }
}

/// Единая ошибка для трейтов внешних коллабораторов (log transport,
/// block list).
///
/// Несёт `ErrorKind` для классификации и человекочитаемое сообщение.
/// `From` impls проставляют kind автоматически.
#[derive(Clone)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
}

impl ApiError {
    /// Generic logic error (default kind).
    pub fn new(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Logic, message: msg.into() }
    }

    /// Configuration error: permanent, fail at startup.
    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Config, message: msg.into() }
    }

    /// I/O error: transient, may retry/reconnect.
    pub fn io(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Io, message: msg.into() }
    }

    /// Format/parse error: bad input, skip record.
    pub fn format_err(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Format, message: msg.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Добавить контекст в начало сообщения, kind сохраняется.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        Self { kind: self.kind, message: format!("{ctx}: {}", self.message) }
    }
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<String> for ApiError {
    fn from(s: String) -> Self { Self { kind: ErrorKind::Logic, message: s } }
}

impl From<&str> for ApiError {
    fn from(s: &str) -> Self { Self { kind: ErrorKind::Logic, message: s.to_string() } }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self { Self { kind: ErrorKind::Io, message: e.to_string() } }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self { Self { kind: ErrorKind::Format, message: e.to_string() } }
}

// ════════════════════════════════════════════════════════════════
//  StoreError
// ════════════════════════════════════════════════════════════════

/// Ошибка bulk-записи в durable store.
///
/// `Partial`: store принял часть батча, `written` авторитетен,
/// остальные записи отвергнуты. Из них `duplicates` отвергнуты по
/// duplicate key: такие записи уже сохранены (повторная доставка).
/// Прочие варианты означают, что не записано ничего.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("partial batch insert: {written}/{attempted} written, {duplicates} duplicates: {reason}")]
    Partial { written: usize, attempted: usize, duplicates: usize, reason: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store io: {0}")]
    Io(String),

    #[error("store format: {0}")]
    Format(String),
}

impl StoreError {
    /// Сколько записей store реально принял вместе с этой ошибкой.
    pub fn written(&self) -> usize {
        match self {
            StoreError::Partial { written, .. } => *written,
            _ => 0,
        }
    }

    /// Сколько отвергнутых записей уже лежат в store (duplicate key).
    pub fn duplicates(&self) -> usize {
        match self {
            StoreError::Partial { duplicates, .. } => *duplicates,
            _ => 0,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, StoreError::Partial { .. })
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self { StoreError::Io(e.to_string()) }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self { StoreError::Format(e.to_string()) }
}
