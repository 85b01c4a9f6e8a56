/// Column headers shared by both sources after renaming
pub const COL_DATE: &str = "Дата";
pub const COL_NUMBER: &str = "Номер";
pub const COL_BRANCH: &str = "Филиал";
pub const COL_CLIENT: &str = "Клиент";
pub const COL_MANAGER: &str = "Менеджер";
pub const COL_RESULT: &str = "Результат";

/// Status values written by the scoring system
pub const RESULT_APPROVED: &str = "Одобрено";
pub const RESULT_REJECTED: &str = "Отказано";

/// Back-office export headers and the canonical names they are renamed to
pub const BACK_OFFICE_COLUMN_RENAMES: &[(&str, &str)] = &[
    ("Дата", COL_DATE),
    ("Номер", COL_NUMBER),
    ("Организация", COL_BRANCH),
    ("Партнер", COL_CLIENT),
];

/// Raw branch-name fragments and their canonical names.
///
/// Matching is a case-insensitive substring test evaluated top to bottom;
/// the first fragment contained in the input wins.
pub const BRANCH_ALIASES: &[(&str, &str)] = &[
    ("нохияи Спитамен", "Спитамен"),
    ("нохиаи Спитамен", "Спитамен"),
    ("нохияи Ч. Расулов", "Ч. Расулов"),
    ("нохиаи Ч. Расулов", "Ч. Расулов"),
    ("шахри Панчакент", "Панчакент"),
    ("шаҳри Панчакент", "Панчакент"),
];

/// File extensions accepted when the configured export name is unavailable
pub const TABULAR_FILE_PATTERNS: &[&str] = &["*.xlsx"];

pub const SNAPSHOT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
// `%.f` prints nothing for whole seconds
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub const DEFAULT_CACHE_FILE: &str = "cache/yesterday_data.json";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_WORKSHEET: &str = "Scoring";
pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
pub const DEFAULT_FTP_PORT: u16 = 21;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Approval-rate band thresholds (percent)
pub const RATE_HIGH_THRESHOLD: f64 = 70.0;
pub const RATE_MEDIUM_THRESHOLD: f64 = 50.0;
