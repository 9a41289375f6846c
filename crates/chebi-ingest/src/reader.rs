//! Chunked reader for the tab-separated flat files.
//!
//! Files ending in `.gz` are decompressed on the fly. Fields are decoded per
//! record according to the table's [`SourceEncoding`], so a Latin-1 file never
//! has to be transcoded as a whole.

use std::{
  fs::File,
  io::{BufReader, Read},
  path::Path,
};

use chebi_core::table::SourceEncoding;
use csv::ByteRecord;
use flate2::read::MultiGzDecoder;

use crate::{Error, Result};

/// One data record and its line number. The header is line 1 and blank
/// lines are not counted, so the first data row is line 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
  pub line:   u64,
  pub fields: Vec<String>,
}

pub struct ChunkedReader {
  file:       String,
  reader:     csv::Reader<Box<dyn Read + Send>>,
  encoding:   SourceEncoding,
  header:     Vec<String>,
  chunk_size: usize,
  buf:        ByteRecord,
  /// Non-blank lines consumed so far, header included.
  lines:      u64,
}

impl ChunkedReader {
  pub fn open(path: &Path, encoding: SourceEncoding, chunk_size: usize) -> Result<Self> {
    let file = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| path.display().to_string());

    let handle = File::open(path).map_err(|e| Error::io(path, e))?;
    let input: Box<dyn Read + Send> = if file.ends_with(".gz") {
      Box::new(MultiGzDecoder::new(BufReader::new(handle)))
    } else {
      Box::new(BufReader::new(handle))
    };

    let mut reader = csv::ReaderBuilder::new()
      .delimiter(b'\t')
      .quoting(false)
      .flexible(true)
      .has_headers(true)
      .from_reader(input);

    let raw = reader
      .byte_headers()
      .map_err(|e| Error::Parse { file: file.clone(), line: 1, message: e.to_string() })?;
    let header: Vec<String> = raw.iter().map(|f| decode(f, encoding)).collect();
    if header.iter().all(|h| h.trim().is_empty()) {
      return Err(Error::Parse { file, line: 1, message: "missing header row".into() });
    }

    Ok(Self {
      file,
      reader,
      encoding,
      header,
      chunk_size: chunk_size.max(1),
      buf: ByteRecord::new(),
      lines: 1,
    })
  }

  /// The file name used in errors and logs.
  pub fn file(&self) -> &str { &self.file }

  /// Header fields as they appear in the file.
  pub fn header(&self) -> &[String] { &self.header }

  /// Up to `chunk_size` records, or `None` at end of file.
  pub fn next_chunk(&mut self) -> Result<Option<Vec<Record>>> {
    let mut chunk = Vec::with_capacity(self.chunk_size.min(8_192));
    while chunk.len() < self.chunk_size {
      let more = self.reader.read_byte_record(&mut self.buf).map_err(|e| Error::Parse {
        file:    self.file.clone(),
        line:    self.lines + 1,
        message: e.to_string(),
      })?;
      if !more {
        break;
      }
      // Blank lines show up as a single empty field.
      if self.buf.len() == 1 && self.buf[0].is_empty() {
        continue;
      }
      self.lines += 1;
      chunk.push(Record {
        line:   self.lines,
        fields: self.buf.iter().map(|f| decode(f, self.encoding)).collect(),
      });
    }

    Ok(if chunk.is_empty() { None } else { Some(chunk) })
  }
}

fn decode(bytes: &[u8], encoding: SourceEncoding) -> String {
  match encoding {
    SourceEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
    SourceEncoding::Latin1 => encoding_rs::WINDOWS_1252
      .decode_without_bom_handling(bytes)
      .0
      .into_owned(),
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use flate2::{Compression, write::GzEncoder};

  use super::*;

  fn drain(reader: &mut ChunkedReader) -> Vec<Vec<Record>> {
    let mut chunks = Vec::new();
    while let Some(chunk) = reader.next_chunk().unwrap() {
      chunks.push(chunk);
    }
    chunks
  }

  #[test]
  fn splits_into_chunks_with_line_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("status.tsv");
    std::fs::write(&path, "CODE\tDESCRIPTION\nC\tchecked\nE\tunchecked\n\nS\tsecondary\n").unwrap();

    let mut reader = ChunkedReader::open(&path, SourceEncoding::Utf8, 2).unwrap();
    assert_eq!(reader.header(), ["CODE", "DESCRIPTION"]);

    let chunks = drain(&mut reader);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0][0], Record { line: 2, fields: vec!["C".into(), "checked".into()] });
    assert_eq!(chunks[0][1].line, 3);
    assert_eq!(chunks[1][0], Record { line: 4, fields: vec!["S".into(), "secondary".into()] });
  }

  #[test]
  fn line_numbers_run_across_chunks_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("source.tsv");
    std::fs::write(&path, "ID\tNAME\n\n1\ta\n\n\n2\tb\n3\tc\n\n").unwrap();

    let mut reader = ChunkedReader::open(&path, SourceEncoding::Utf8, 1).unwrap();
    let lines: Vec<u64> = drain(&mut reader).concat().iter().map(|r| r.line).collect();
    assert_eq!(lines, [2, 3, 4]);
  }

  #[test]
  fn quotes_are_plain_characters() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("names.tsv");
    std::fs::write(&path, "ID\tNAME\n1\t\"quoted\" name\n").unwrap();

    let mut reader = ChunkedReader::open(&path, SourceEncoding::Utf8, 10).unwrap();
    let chunks = drain(&mut reader);
    assert_eq!(chunks[0][0].fields[1], "\"quoted\" name");
  }

  #[test]
  fn gzip_is_transparent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("source.tsv.gz");
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(b"ID\tNAME\n7\tChEMBL\n").unwrap();
    std::fs::write(&path, enc.finish().unwrap()).unwrap();

    let mut reader = ChunkedReader::open(&path, SourceEncoding::Utf8, 10).unwrap();
    let chunks = drain(&mut reader);
    assert_eq!(chunks[0][0].fields, ["7", "ChEMBL"]);
  }

  #[test]
  fn latin1_is_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reference.tsv");
    std::fs::write(&path, b"ID\tREFERENCE_NAME\n1\tM\xfcller et al.\n").unwrap();

    let mut reader = ChunkedReader::open(&path, SourceEncoding::Latin1, 10).unwrap();
    let chunks = drain(&mut reader);
    assert_eq!(chunks[0][0].fields[1], "Müller et al.");
  }

  #[test]
  fn empty_file_has_no_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.tsv");
    std::fs::write(&path, "").unwrap();

    let err = ChunkedReader::open(&path, SourceEncoding::Utf8, 10).err().unwrap();
    assert!(matches!(err, Error::Parse { line: 1, .. }));
  }
}
