use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use geosync_core::{FacilityStatus, Record, RecordId, Snapshot, SyncError};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::{columns::ColumnMap, traits::SnapshotStore};

/// Snapshot store backed by two delimited files with a header row.
#[derive(Clone, Debug)]
pub struct CsvSnapshotStore {
    pub current_path: PathBuf,
    pub previous_path: PathBuf,
    pub columns: ColumnMap,
}

impl CsvSnapshotStore {
    pub fn new(current_path: PathBuf, previous_path: PathBuf, columns: ColumnMap) -> Self {
        Self {
            current_path,
            previous_path,
            columns,
        }
    }
}

impl SnapshotStore for CsvSnapshotStore {
    fn load_current(&self) -> Result<Snapshot> {
        if !self.current_path.exists() {
            return Err(SyncError::FatalInput(format!(
                "current snapshot not found at {}",
                self.current_path.display()
            ))
            .into());
        }
        read_snapshot(&self.current_path, &self.columns).map_err(|e| {
            SyncError::FatalInput(format!("{}: {e:#}", self.current_path.display())).into()
        })
    }

    fn load_previous(&self) -> Result<Snapshot> {
        if !self.previous_path.exists() {
            info!(path = %self.previous_path.display(), "no previous snapshot; treating every record as new");
            return Ok(Snapshot::empty());
        }
        read_snapshot(&self.previous_path, &self.columns)
    }

    fn has_current(&self) -> bool {
        self.current_path.exists()
    }

    fn rotate(&self) -> Result<()> {
        if !self.current_path.exists() {
            return Err(SyncError::FatalInput(format!(
                "cannot rotate: {} does not exist",
                self.current_path.display()
            ))
            .into());
        }
        let dir = parent_dir(&self.previous_path);
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("create temp file in {}", dir.display()))?;
        let mut src = fs::File::open(&self.current_path)
            .with_context(|| format!("open {}", self.current_path.display()))?;
        std::io::copy(&mut src, tmp.as_file_mut()).context("copy current snapshot")?;
        tmp.as_file().sync_all().context("sync rotated snapshot")?;
        tmp.persist(&self.previous_path)
            .map_err(|e| e.error)
            .with_context(|| format!("replace {}", self.previous_path.display()))?;

        info!(
            from = %self.current_path.display(),
            to = %self.previous_path.display(),
            "rotated snapshot"
        );
        Ok(())
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

pub fn read_snapshot(path: &Path, columns: &ColumnMap) -> Result<Snapshot> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let mut snapshot = parse_snapshot(&bytes, columns).with_context(|| format!("parse {}", path.display()))?;
    snapshot.captured_at = fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from);
    debug!(path = %path.display(), records = snapshot.len(), "loaded snapshot");
    Ok(snapshot)
}

/// Parse delimited bytes into a snapshot. Rows without an identifier are dropped;
/// a repeated identifier keeps its last row.
pub fn parse_snapshot(bytes: &[u8], columns: &ColumnMap) -> Result<Snapshot> {
    let digest = hex::encode(Sha256::digest(bytes));
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(body);
    let headers = reader.headers().context("read header row")?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let id_col = position(&columns.id).ok_or_else(|| anyhow!("identifier column {:?} not in header", columns.id))?;
    let name_col = position(&columns.name);
    let street_col = position(&columns.street);
    let city_col = position(&columns.city);
    let region_col = position(&columns.region);
    let postal_col = position(&columns.postal);
    let status_col = position(&columns.status);
    let capacity_col = position(&columns.capacity);
    let license_col = position(&columns.license_date);
    let citations_col = position(&columns.citations);

    let mut snapshot = Snapshot {
        captured_at: None,
        digest: Some(digest),
        records: Default::default(),
    };
    let mut blank_ids = 0usize;
    let mut duplicates = 0usize;

    for (n, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("row {}", n + 2))?;
        let field = |col: Option<usize>| col.and_then(|i| row.get(i)).unwrap_or("").to_string();

        let id = field(Some(id_col));
        if id.trim().is_empty() {
            blank_ids += 1;
            continue;
        }
        let record = Record {
            id: RecordId::from_str(id),
            name: field(name_col),
            street: field(street_col),
            city: field(city_col),
            region: field(region_col),
            postal: field(postal_col),
            status: FacilityStatus::parse(&field(status_col)),
            capacity: field(capacity_col),
            license_date: field(license_col),
            citations: field(citations_col),
        };
        if snapshot.records.insert(record.id.clone(), record).is_some() {
            duplicates += 1;
        }
    }

    if blank_ids > 0 {
        warn!(rows = blank_ids, "dropped rows without an identifier");
    }
    if duplicates > 0 {
        warn!(rows = duplicates, "identifier repeated; later rows replaced earlier ones");
    }
    Ok(snapshot)
}
