//! Reading raw behavior tables and writing cleaned ones.
//!
//! Tables are CSV files with a header row. The whole file is scanned for
//! schema inference so a column holding a single stray word stays text
//! instead of failing the read; the field coercer turns such values into
//! missing ones later.
//!
//! Files default to UTF-8. Legacy encodings such as GB18030 are decoded with
//! `encoding_rs` before parsing and re-encoded on write.

use crate::coercer::FieldCoercer;
use crate::error::{CleaningError, Result, ResultExt};
use encoding_rs::{Encoding, UTF_8};
use polars::io::csv::read::{CsvEncoding, CsvParseOptions, CsvReadOptions, NullValues};
use polars::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Datetime format used for `behavior_time` in written files.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn parse_options() -> CsvParseOptions {
    let markers = FieldCoercer::missing_markers()
        .iter()
        .map(|m| (*m).into())
        .collect();
    CsvParseOptions::default()
        .with_null_values(Some(NullValues::AllColumns(markers)))
        .with_encoding(CsvEncoding::LossyUtf8)
}

fn read_options() -> CsvReadOptions {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(parse_options())
}

/// Look up a text encoding by its WHATWG label (`utf-8`, `gb18030`, `gbk`, ...).
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
        CleaningError::InvalidConfig(format!("unknown text encoding '{}'", label))
    })
}

/// Load a raw UTF-8 table from a CSV file.
///
/// Blank fields and the usual missing-value markers (`NA`, `NULL`, `nan`,
/// ...) are read as nulls. Invalid UTF-8 is decoded lossily.
pub fn load_table(path: impl AsRef<Path>) -> Result<DataFrame> {
    load_table_with_encoding(path, UTF_8)
}

/// Load a raw table from a CSV file written in `encoding`.
///
/// Non-UTF-8 files are decoded in memory before parsing; malformed byte
/// sequences become U+FFFD.
pub fn load_table_with_encoding(
    path: impl AsRef<Path>,
    encoding: &'static Encoding,
) -> Result<DataFrame> {
    let path = path.as_ref();
    info!(
        "Loading table from: {} ({})",
        path.display(),
        encoding.name()
    );

    let direct = if encoding == UTF_8 {
        match read_options()
            .try_into_reader_with_file_path(Some(PathBuf::from(path)))
            .and_then(|reader| reader.finish())
        {
            Ok(df) => Some(df),
            Err(e) => {
                // Retry from memory after a lossy decode of the raw bytes.
                debug!("Direct CSV read failed: {}", e);
                None
            }
        }
    } else {
        None
    };

    let df = match direct {
        Some(df) => df,
        None => {
            let bytes = fs::read(path).context(format!("Failed to read {}", path.display()))?;
            let (content, _, had_errors) = encoding.decode(&bytes);
            if had_errors {
                warn!(
                    "{} contains byte sequences that are not valid {}",
                    path.display(),
                    encoding.name()
                );
            }
            read_options()
                .into_reader_with_file_handle(Cursor::new(content.into_owned().into_bytes()))
                .finish()
                .context(format!("Failed to parse {} as CSV", path.display()))?
        }
    };

    info!("Table loaded: {} rows x {} columns", df.height(), df.width());
    Ok(df)
}

/// Write a table to a UTF-8 CSV file with a header, creating parent directories.
pub fn write_table(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<PathBuf> {
    write_table_with_encoding(df, path, UTF_8)
}

/// Write a table to a CSV file in `encoding`.
///
/// Characters the encoding cannot represent are written as HTML numeric
/// character references, the WHATWG encoder behavior.
pub fn write_table_with_encoding(
    df: &mut DataFrame,
    path: impl AsRef<Path>,
    encoding: &'static Encoding,
) -> Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .with_separator(b',')
        .with_datetime_format(Some(DATETIME_FORMAT.to_string()))
        .finish(df)
        .context(format!("Failed to write {}", path.display()))?;

    if encoding == UTF_8 {
        fs::write(path, &buffer)?;
    } else {
        let text = String::from_utf8_lossy(&buffer);
        let (encoded, _, unmappable) = encoding.encode(&text);
        if unmappable {
            warn!(
                "Some characters cannot be represented in {}; written as numeric references",
                encoding.name()
            );
        }
        fs::write(path, &encoded)?;
    }

    info!("Table saved: {} ({})", path.display(), encoding.name());
    Ok(path.to_path_buf())
}
