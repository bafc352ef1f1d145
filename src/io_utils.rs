//! Delimited-text and JSON adapters between files and [`Dataset`]s.
//!
//! - **Delimiters**: `.tsv` paths default to tab, everything else to comma,
//!   with a manual override.
//! - **Encoding**: inputs are decoded through `encoding_rs` (UTF-8 default);
//!   outputs are always UTF-8.
//! - **Nulls**: empty cells and [`NA_TOKENS`](crate::data::NA_TOKENS) read as
//!   null; nulls are written as empty cells.
//! - **Quoting**: output uses `QuoteStyle::Always` for round-trip safety.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::debug;
use serde::Serialize;

use crate::data::{Column, ColumnType, Dataset, Value, is_na_token};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

/// How raw delimited text is read.
#[derive(Debug, Clone, Copy)]
pub struct CsvOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader(path: &Path, delimiter: u8) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = Box::new(BufReader::new(
        File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
    ));
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false);
    Ok(builder.from_reader(reader))
}

pub fn open_csv_writer(path: &Path, delimiter: u8) -> Result<csv::Writer<Box<dyn Write>>> {
    ensure_parent_dir(path)?;
    let base: Box<dyn Write> = Box::new(BufWriter::new(
        File::create(path).with_context(|| format!("Creating output file {path:?}"))?,
    ));
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true);
    Ok(builder.from_writer(base))
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("Creating directory {parent:?}"))?;
    }
    Ok(())
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Reads a whole file into text columns; NA cells become nulls.
pub fn read_dataset(path: &Path, options: &CsvOptions) -> Result<Dataset> {
    let delimiter = resolve_delimiter(path, options.delimiter);
    let mut reader = open_csv_reader(path, delimiter)?;
    let headers = {
        let raw = reader
            .byte_headers()
            .with_context(|| format!("Reading headers from {path:?}"))?
            .clone();
        decode_record(&raw, options.encoding)?
    };
    let mut cells: Vec<Vec<Option<Value>>> = vec![Vec::new(); headers.len()];
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record =
            record.with_context(|| format!("Reading row {} in {:?}", row_idx + 2, path))?;
        let decoded = decode_record(&record, options.encoding)
            .with_context(|| format!("Decoding row {} in {:?}", row_idx + 2, path))?;
        for (column, raw) in cells.iter_mut().zip(decoded) {
            column.push((!is_na_token(&raw)).then_some(Value::String(raw)));
        }
    }
    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, values)| Column::new(name, ColumnType::String, values))
        .collect();
    let dataset =
        Dataset::new(columns).with_context(|| format!("Assembling dataset from {path:?}"))?;
    debug!(
        "Read {} row(s) x {} column(s) from {:?}",
        dataset.row_count(),
        dataset.column_count(),
        path
    );
    Ok(dataset)
}

pub fn write_dataset(dataset: &Dataset, path: &Path) -> Result<()> {
    let delimiter = resolve_delimiter(path, None);
    let mut writer = open_csv_writer(path, delimiter)?;
    writer
        .write_record(dataset.column_names())
        .with_context(|| format!("Writing headers to {path:?}"))?;
    for row_idx in 0..dataset.row_count() {
        writer
            .write_record(dataset.display_row(row_idx))
            .with_context(|| format!("Writing row {} to {:?}", row_idx + 2, path))?;
    }
    writer
        .flush()
        .with_context(|| format!("Flushing output {path:?}"))?;
    debug!("Wrote {} row(s) to {:?}", dataset.row_count(), path);
    Ok(())
}

pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path).with_context(|| format!("Creating JSON file {path:?}"))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).context("Writing JSON")?;
    writer.flush().context("Flushing JSON")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn tsv_extension_selects_tab() {
        assert_eq!(resolve_delimiter(Path::new("a.TSV"), None), b'\t');
        assert_eq!(resolve_delimiter(Path::new("a.csv"), None), b',');
        assert_eq!(resolve_delimiter(Path::new("a.csv"), Some(b';')), b';');
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        assert!(resolve_encoding(Some("not-an-encoding")).is_err());
        assert_eq!(resolve_encoding(Some("latin1")).unwrap().name(), "windows-1252");
    }

    #[test]
    fn read_dataset_maps_na_tokens_to_null() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.csv");
        fs::write(&path, "id,amount\n1,NA\n2,\n3, 4 \n").unwrap();
        let dataset = read_dataset(&path, &CsvOptions::default()).unwrap();
        assert_eq!(dataset.row_count(), 3);
        assert_eq!(dataset.column("amount").unwrap().null_count(), 2);
        assert_eq!(
            dataset.column("amount").unwrap().get(2),
            Some(&Value::String(" 4 ".into()))
        );
    }

    #[test]
    fn read_dataset_decodes_latin1() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.csv");
        fs::write(&path, b"country\nM\xe9xico\n").unwrap();
        let options = CsvOptions {
            delimiter: None,
            encoding: resolve_encoding(Some("latin1")).unwrap(),
        };
        let dataset = read_dataset(&path, &options).unwrap();
        assert_eq!(
            dataset.column("country").unwrap().get(0),
            Some(&Value::String("México".into()))
        );
    }

    #[test]
    fn write_dataset_creates_parent_and_quotes_cells() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        let dataset = Dataset::new(vec![Column::from_strings("a", [Some("x"), None])]).unwrap();
        write_dataset(&dataset, &path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "\"a\"\n\"x\"\n\"\"\n");
    }
}
