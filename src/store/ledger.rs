//! Wide CSV result ledger keyed by question id.
//!
//! Every mutation reloads the table from disk, applies the change and rewrites
//! the whole file through a temp file + rename, all while holding one lock. Rows
//! are sparse: a cell that was never written serializes as an empty string.

use crate::domain::Question;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const ID_COLUMN: &str = "Question ID";

pub const BASE_COLUMNS: [&str; 8] = [
    ID_COLUMN,
    "Question Title",
    "Question Body",
    "Question Tags",
    "Question Creation Date",
    "Answer ID",
    "Answer Body",
    "Answer Creation Date",
];

pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub const LINT_COLUMN: &str = "lint";
pub const LINT_LOGS_COLUMN: &str = "lint_logs";

// Dynamic columns. `tok` is always a model token.

pub fn answer_column(tok: &str) -> String {
    format!("{tok}_Answer")
}

pub fn answer_translated_column(tok: &str) -> String {
    format!("{tok}_Answer_Translated")
}

pub fn code_blocks_column(tok: &str) -> String {
    format!("{tok}_Answer_CodeBlocks")
}

pub fn evaluation_column(eval_tok: &str, answer_tok: &str) -> String {
    format!("{eval_tok}_Evaluate_{answer_tok}_Answer")
}

pub fn coverage_column(tok: &str) -> String {
    format!("{tok}_Coverage")
}

pub fn compare_column(tok: &str, no_reference: bool) -> String {
    if no_reference {
        format!("{tok}_Compare_No_Reference")
    } else {
        format!("{tok}_Compare")
    }
}

/// One ledger row as column name -> cell value.
pub type Record = BTreeMap<String, String>;

#[derive(Debug, Clone)]
struct Table {
    columns: Vec<String>,
    rows: Vec<(u64, Record)>,
    index: HashMap<u64, usize>,
}

impl Table {
    fn empty() -> Self {
        Self {
            columns: BASE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn add_column(&mut self, name: &str) {
        if !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_string());
        }
    }

    fn row_mut(&mut self, id: u64) -> &mut Record {
        let pos = match self.index.get(&id) {
            Some(&pos) => pos,
            None => {
                let mut record = Record::new();
                record.insert(ID_COLUMN.to_string(), id.to_string());
                self.rows.push((id, record));
                self.index.insert(id, self.rows.len() - 1);
                self.rows.len() - 1
            }
        };
        &mut self.rows[pos].1
    }

    fn set(&mut self, id: u64, fields: Vec<(String, String)>) {
        for (name, _) in &fields {
            self.add_column(name);
        }
        let row = self.row_mut(id);
        for (name, value) in fields {
            if name == ID_COLUMN {
                continue;
            }
            row.insert(name, value);
        }
    }

    /// Write only the fields whose current cell is empty.
    fn fill_empty(&mut self, id: u64, fields: Vec<(String, String)>) {
        let missing: Vec<_> = {
            let existing = self.index.get(&id).map(|&pos| &self.rows[pos].1);
            fields
                .into_iter()
                .filter(|(name, _)| {
                    existing.and_then(|r| r.get(name)).map(|v| v.is_empty()).unwrap_or(true)
                })
                .collect()
        };
        self.set(id, missing);
    }
}

/// The result store shared by every worker of a batch.
pub struct Ledger {
    path: PathBuf,
    table: Mutex<Table>,
}

impl Ledger {
    /// Open the ledger at `path`, creating it with the base columns if absent.
    ///
    /// An existing file that cannot be read at all is moved aside to
    /// `<path>.corrupt` and a fresh ledger is started in its place. If it cannot
    /// be moved, the ledger opens empty and every write fails until the file is
    /// fixed, so the unreadable file is never overwritten.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let table = if path.exists() {
            match read_table(&path) {
                Ok(table) => table,
                Err(e) => {
                    tracing::warn!("Could not read ledger {}: {:#}", path.display(), e);
                    set_aside(&path);
                    Table::empty()
                }
            }
        } else {
            Table::empty()
        };
        if !path.exists() {
            write_table(&path, &table)
                .with_context(|| format!("Failed to create ledger {}", path.display()))?;
        }

        tracing::debug!("Opened ledger {} ({} rows)", path.display(), table.rows.len());
        Ok(Self { path, table: Mutex::new(table) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create or update the row for `id`, touching only the named fields.
    /// Unknown field names become new columns.
    pub fn upsert<I, K, V>(&self, id: u64, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields: Vec<(String, String)> =
            fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.mutate(|table| table.set(id, fields))
    }

    /// Make sure the base question columns are populated for `question`.
    /// Non-empty cells are kept as they are.
    pub fn ensure_question(&self, question: &Question) -> Result<()> {
        let mut fields = vec![
            ("Question Title".to_string(), question.title.clone()),
            ("Question Body".to_string(), question.body.clone()),
            ("Question Tags".to_string(), question.tags.join(",")),
            (
                "Question Creation Date".to_string(),
                question.created_at.format(DATE_FORMAT).to_string(),
            ),
        ];
        if let Some(reference) = question.reference() {
            fields.push(("Answer ID".to_string(), reference.id.to_string()));
            fields.push(("Answer Body".to_string(), reference.body.clone()));
            fields.push((
                "Answer Creation Date".to_string(),
                reference.created_at.format(DATE_FORMAT).to_string(),
            ));
        }
        let id = question.id;
        self.mutate(|table| table.fill_empty(id, fields))
    }

    /// Replace the in-memory table with what is on disk.
    pub fn reload(&self) -> Result<()> {
        let fresh = read_table(&self.path)?;
        *self.lock() = fresh;
        Ok(())
    }

    pub fn get(&self, id: u64) -> Option<Record> {
        let table = self.lock();
        table.index.get(&id).map(|&pos| table.rows[pos].1.clone())
    }

    pub fn columns(&self) -> Vec<String> {
        self.lock().columns.clone()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.lock().columns.iter().any(|c| c == name)
    }

    /// Every row's value for `name`, in row order. Absent cells come back empty.
    pub fn column_values(&self, name: &str) -> Vec<(u64, String)> {
        self.lock()
            .rows
            .iter()
            .map(|(id, row)| (*id, row.get(name).cloned().unwrap_or_default()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reload, apply `f`, persist. The lock is held for the whole cycle.
    /// A file that exists but cannot be read is never written over.
    fn mutate(&self, f: impl FnOnce(&mut Table)) -> Result<()> {
        let mut table = self.lock();
        if self.path.exists() {
            *table = read_table(&self.path).with_context(|| {
                format!("Refusing to overwrite unreadable ledger {}", self.path.display())
            })?;
        }
        f(&mut table);
        write_table(&self.path, &table)
            .with_context(|| format!("Failed to write ledger {}", self.path.display()))
    }
}

fn read_table(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let headers: Vec<String> =
        reader.byte_headers()?.iter().map(|h| lossy(h).trim().to_string()).collect();

    let mut table = Table::empty();
    table.columns.clear();
    for header in &headers {
        if !header.is_empty() {
            table.add_column(header);
        }
    }
    // Legacy files may predate some base columns.
    for base in BASE_COLUMNS {
        table.add_column(base);
    }

    for (line, result) in reader.byte_records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Skipping malformed ledger row {}: {}", line + 2, e);
                continue;
            }
        };

        let mut row = Record::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            if !header.is_empty() && !row.contains_key(header) {
                row.insert(header.clone(), lossy(value));
            }
        }

        let Some(id) = row.get(ID_COLUMN).map(String::as_str).and_then(parse_id) else {
            tracing::warn!("Dropping ledger row {} without a usable {}", line + 2, ID_COLUMN);
            continue;
        };
        if table.index.contains_key(&id) {
            tracing::debug!("Duplicate ledger row for question {}, keeping the first", id);
            continue;
        }
        row.insert(ID_COLUMN.to_string(), id.to_string());
        table.rows.push((id, row));
        table.index.insert(id, table.rows.len() - 1);
    }

    Ok(table)
}

/// Cells that are not valid UTF-8 keep their row; bad bytes become U+FFFD.
fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Move an unreadable ledger to `<path>.corrupt` so a fresh one can be written.
fn set_aside(path: &Path) {
    let mut backup = path.as_os_str().to_owned();
    backup.push(".corrupt");
    let backup = PathBuf::from(backup);
    match std::fs::rename(path, &backup) {
        Ok(()) => tracing::warn!("Moved unreadable ledger to {}", backup.display()),
        Err(e) => tracing::error!(
            "Could not move {} aside, writes will fail until it is fixed: {}",
            path.display(),
            e
        ),
    }
}

fn write_table(path: &Path, table: &Table) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    {
        let mut writer = csv::Writer::from_writer(&mut tmp);
        writer.write_record(&table.columns)?;
        for (_, row) in &table.rows {
            writer.write_record(
                table.columns.iter().map(|c| row.get(c).map(String::as_str).unwrap_or("")),
            )?;
        }
        writer.flush()?;
    }
    tmp.persist(path)?;
    Ok(())
}

/// Ids written by spreadsheet tools sometimes come back as `123.0`.
pub fn parse_id(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<u64>() {
        return Some(id);
    }
    let float = raw.parse::<f64>().ok()?;
    (float >= 0.0 && float.fract() == 0.0).then_some(float as u64)
}
