use std::collections::HashSet;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info, trace};

use crate::domain::TVError;
use crate::record::Person;

/// Columns every dataset file must provide, in record field order.
pub const REQUIRED_COLUMNS: [&str; 6] = ["id", "firstName", "lastName", "email", "gender", "dob"];

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileType {
    CSV,
    JSON,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    file_type: FileType,
}

/// Reads a dataset file into person records.
pub fn load_people(path: &Path) -> Result<Vec<Person>, TVError> {
    let file_info = get_file_info(path.to_path_buf())?;
    let start_time = Instant::now();

    let frame = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::JSON => load_json(&file_info.path)?,
        FileType::PARQUET => load_parquet(&file_info.path)?,
        FileType::ARROW => load_arrow(&file_info.path)?,
    };
    let df = frame.collect()?;
    let people = people_from_frame(&df)?;

    info!(
        "Loaded {} records ({} bytes) from {:?} in {}ms",
        people.len(),
        file_info.file_size,
        file_info.path,
        start_time.elapsed().as_millis()
    );
    Ok(people)
}

/// Converts a frame into records. Each required column is decoded in its own
/// rayon task; the rows are assembled afterwards.
pub fn people_from_frame(df: &DataFrame) -> Result<Vec<Person>, TVError> {
    let columns: Vec<Vec<Option<String>>> = REQUIRED_COLUMNS
        .par_iter()
        .map(|name| load_column(df, name))
        .collect::<Result<_, _>>()?;

    let [ids, first_names, last_names, emails, genders, dobs] = &columns[..] else {
        return Err(TVError::LoadingFailed("Unexpected column count".into()));
    };

    let mut seen = HashSet::with_capacity(df.height());
    let mut people = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let id_text = required(ids, row, "id")?;
        let id = id_text
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(row, "id", id_text))?;
        if !seen.insert(id) {
            return Err(TVError::DuplicateId(id));
        }
        let dob_text = required(dobs, row, "dob")?;
        let dob = parse_date(dob_text).ok_or_else(|| invalid(row, "dob", dob_text))?;

        people.push(Person {
            id,
            first_name: required(first_names, row, "firstName")?.to_string(),
            last_name: required(last_names, row, "lastName")?.to_string(),
            email: required(emails, row, "email")?.to_string(),
            gender: required(genders, row, "gender")?.to_string(),
            dob,
        });
    }
    debug!("Built {} person records", people.len());
    Ok(people)
}

fn load_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, TVError> {
    let column = df
        .column(name)
        .map_err(|_| TVError::MissingColumn(name.to_string()))?;
    trace!("Decoding column {} of type {:?}", name, column.dtype());

    // Temporal columns go through Date so they print as YYYY-MM-DD
    let col = match column.dtype() {
        DataType::Date | DataType::Datetime(_, _) => {
            column.cast(&DataType::Date)?.cast(&DataType::String)?
        }
        _ => column.cast(&DataType::String)?,
    };
    let series = col.str()?;
    Ok(series
        .into_iter()
        .map(|value| value.map(|s| s.to_string()))
        .collect())
}

fn required<'a>(column: &'a [Option<String>], row: usize, field: &str) -> Result<&'a str, TVError> {
    column
        .get(row)
        .and_then(|v| v.as_deref())
        .ok_or_else(|| invalid(row, field, "∅"))
}

fn invalid(row: usize, field: &str, value: &str) -> TVError {
    TVError::InvalidRecord {
        row,
        field: field.to_string(),
        value: value.to_string(),
    }
}

/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps, naive `YYYY-MM-DD HH:MM:SS[.f]`
/// timestamps and `M/D/YYYY`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(s, "%m/%d/%Y").ok())
}

fn detect_file_type(path: &Path) -> Result<FileType, TVError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("JSON") => Ok(FileType::JSON),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(TVError::UnknownFileType(path.to_path_buf())),
    }
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, TVError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TVError::FileNotFound(path.clone()),
        ErrorKind::PermissionDenied => TVError::PermissionDenied(path.clone()),
        _ => TVError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(TVError::LoadingFailed(format!("{:?} is not a file!", path)));
    }

    let file_size = metadata.len();
    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size,
        file_type,
    })
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_json(path: &Path) -> Result<LazyFrame, TVError> {
    let file = File::open(path)?;
    Ok(JsonReader::new(file).finish()?.lazy())
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}
