//! Zip bundling of the exported documents.

use std::{
  fs::File,
  io::{self, BufReader, BufWriter},
  path::Path,
};

use zip::{CompressionMethod, ZipArchive, ZipWriter, write::SimpleFileOptions};

use crate::{Error, Result};

/// Zip every regular file directly under `dir` into `archive`, in name order,
/// then remove `dir`. Returns the entry names.
pub fn bundle(dir: &Path, archive: &Path) -> Result<Vec<String>> {
  let mut files = Vec::new();
  for entry in std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
    let entry = entry.map_err(|e| Error::io(dir, e))?;
    if entry.file_type().map_err(|e| Error::io(entry.path(), e))?.is_file() {
      files.push(entry.file_name().to_string_lossy().into_owned());
    }
  }
  files.sort();

  let out = File::create(archive).map_err(|e| Error::io(archive, e))?;
  let mut zip = ZipWriter::new(BufWriter::new(out));
  let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
  for name in &files {
    let path = dir.join(name);
    zip.start_file(name.as_str(), options)?;
    let mut input = BufReader::new(File::open(&path).map_err(|e| Error::io(&path, e))?);
    io::copy(&mut input, &mut zip).map_err(|e| Error::io(&path, e))?;
  }
  zip.finish()?;

  std::fs::remove_dir_all(dir).map_err(|e| Error::io(dir, e))?;
  Ok(files)
}

/// Entry names of an existing archive, sorted.
pub fn entries(archive: &Path) -> Result<Vec<String>> {
  let file = File::open(archive).map_err(|e| Error::io(archive, e))?;
  let zip = ZipArchive::new(BufReader::new(file))?;
  let mut names: Vec<String> = zip.file_names().map(str::to_owned).collect();
  names.sort();
  Ok(names)
}
