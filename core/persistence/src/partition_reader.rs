//! FILENAME: core/persistence/src/partition_reader.rs
// PURPOSE: Decodes one partition file into a `Slice`.
// CONTEXT: Format-independent entry point `load_partition`; the decoders are
//          pure so they can be tested without a source.

use flate2::read::GzDecoder;
use std::io::Read;

use engine::{log_debug, CellValue, Row, Slice};

use crate::error::DataError;
use crate::manifest::DataFormat;
use crate::source::PartitionSource;

/// Fetches `location` from `source` and decodes it as `format`.
pub async fn load_partition<S: PartitionSource>(
    source: &S,
    location: &str,
    format: DataFormat,
) -> Result<Slice, DataError> {
    let bytes = source.fetch(location).await?;
    let slice = decode_partition(&bytes, format, location)?;
    log_debug!(
        "FETCH",
        "decoded {} ({:?}): {} columns, {} rows",
        location,
        format,
        slice.columns.len(),
        slice.len()
    );
    Ok(slice)
}

/// Decodes partition bytes. `path` is only used for error messages.
pub fn decode_partition(bytes: &[u8], format: DataFormat, path: &str) -> Result<Slice, DataError> {
    match format {
        DataFormat::Json => decode_json(bytes, path),
        DataFormat::Csv => {
            let text = std::str::from_utf8(bytes).map_err(|e| DataError::decode(path, e))?;
            Ok(decode_csv(text))
        }
        DataFormat::CsvGz => {
            let mut text = String::new();
            GzDecoder::new(bytes)
                .read_to_string(&mut text)
                .map_err(|e| DataError::decode(path, e))?;
            Ok(decode_csv(&text))
        }
    }
}

pub fn decode_json(bytes: &[u8], path: &str) -> Result<Slice, DataError> {
    serde_json::from_slice(bytes).map_err(|e| DataError::decode(path, e))
}

/// Header line then one row per line, split on every comma.
///
/// There is no quoting or escaping: a field containing a comma splits in two.
/// Blank lines are skipped, `\r\n` endings are accepted, an empty field is
/// `Empty` and everything else is `Text`.
pub fn decode_csv(text: &str) -> Slice {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text
        .lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty());

    let Some(header) = lines.next() else {
        return Slice::default();
    };
    let columns: Vec<String> = header.split(',').map(str::to_string).collect();

    let data: Vec<Row> = lines
        .map(|line| {
            line.split(',')
                .map(|field| {
                    if field.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::text(field)
                    }
                })
                .collect()
        })
        .collect();

    Slice::new(columns, data)
}
