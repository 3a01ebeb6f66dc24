//! Reads and writes one text resource per entity inside the data directory.
//!
//! Writes always go to a sibling `.tmp` file first and are renamed into place,
//! so a resource on disk is either the old version or the complete new one.
//! `Catalog::save_all` relies on the split between staging and committing to
//! make a whole-catalog save all-or-nothing.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::mem;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::db::codec::{quotes_open, DecodeError, Record};
use crate::error::CatalogError;
use crate::models::Entity;

/// Records read from one resource plus the number of lines that had to be
/// skipped.
#[derive(Debug)]
pub struct Loaded<R> {
    pub records: Vec<R>,
    pub skipped: usize,
}

/// Handle on the directory holding the five resources.
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Absolute location of the resource backing `entity`.
    pub fn path_for(&self, entity: Entity) -> PathBuf {
        self.dir.join(entity.file_name())
    }

    /// Read every record of type `R`. A missing file is an empty collection.
    /// A quoted field may span physical lines, so lines are joined until the
    /// quotes balance. Records that fail to decode, including lines that are
    /// not UTF-8, are logged and skipped.
    pub fn load<R: Record>(&self) -> Result<Loaded<R>, CatalogError> {
        let path = self.path_for(R::ENTITY);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "resource missing, starting empty");
                return Ok(Loaded {
                    records: Vec::new(),
                    skipped: 0,
                });
            }
            Err(err) => return Err(CatalogError::io(path, err)),
        };

        let mut reader = BufReader::new(file);
        let mut loaded = Loaded {
            records: Vec::new(),
            skipped: 0,
        };
        let mut raw = Vec::new();
        let mut pending = String::new();
        let mut line_no = 0;
        let mut record_start = 0;

        loop {
            raw.clear();
            let read = reader
                .read_until(b'\n', &mut raw)
                .map_err(|err| CatalogError::io(&path, err))?;
            if read == 0 {
                break;
            }
            line_no += 1;
            if raw.last() == Some(&b'\n') {
                raw.pop();
            }

            let Ok(line) = std::str::from_utf8(&raw) else {
                let start = if pending.is_empty() { line_no } else { record_start };
                pending.clear();
                skip(&mut loaded, &path, start, DecodeError::InvalidUtf8, R::ENTITY);
                continue;
            };

            if pending.is_empty() {
                if line.trim().is_empty() {
                    continue;
                }
                record_start = line_no;
            } else {
                pending.push('\n');
            }
            pending.push_str(line);

            if quotes_open(&pending) {
                continue;
            }
            let text = mem::take(&mut pending);
            decode_into(&mut loaded, &path, record_start, text.trim_end_matches('\r'));
        }

        // An unterminated quote runs to the end of the file.
        if !pending.is_empty() {
            decode_into(&mut loaded, &path, record_start, pending.trim_end_matches('\r'));
        }

        Ok(loaded)
    }

    /// Rewrite the whole resource for `R` from `records`.
    pub fn save<'a, R, I>(&self, records: I) -> Result<(), CatalogError>
    where
        R: Record + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        self.stage(records)?.commit()
    }

    /// Write `records` to the temporary sibling of the resource without
    /// touching the resource itself.
    pub(crate) fn stage<'a, R, I>(&self, records: I) -> Result<StagedWrite, CatalogError>
    where
        R: Record + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        fs::create_dir_all(&self.dir).map_err(|err| CatalogError::io(&self.dir, err))?;

        let target = self.path_for(R::ENTITY);
        let temp = target.with_extension("tmp");
        let staged = StagedWrite { temp, target };

        let lines = records.into_iter().map(|record| record.encode());
        if let Err(err) = write_lines(&staged.temp, lines) {
            staged.discard_ref();
            return Err(CatalogError::io(&staged.target, err));
        }

        Ok(staged)
    }
}

fn decode_into<R: Record>(loaded: &mut Loaded<R>, path: &Path, line: usize, text: &str) {
    match R::decode(text) {
        Ok(record) => loaded.records.push(record),
        Err(reason) => {
            debug!(entity = %R::ENTITY, content = text, "undecodable record");
            skip(loaded, path, line, reason, R::ENTITY);
        }
    }
}

fn skip<R>(
    loaded: &mut Loaded<R>,
    path: &Path,
    line: usize,
    reason: DecodeError,
    entity: Entity,
) {
    loaded.skipped += 1;
    let err = CatalogError::Parse {
        path: path.to_path_buf(),
        line,
        reason,
    };
    warn!(%entity, "skipping record: {err}");
}

fn write_lines(path: &Path, lines: impl Iterator<Item = String>) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for line in lines {
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    writer.get_ref().sync_all()
}

/// A fully written temporary file waiting to replace its resource.
#[derive(Debug)]
pub(crate) struct StagedWrite {
    temp: PathBuf,
    target: PathBuf,
}

impl StagedWrite {
    pub(crate) fn commit(self) -> Result<(), CatalogError> {
        fs::rename(&self.temp, &self.target).map_err(|err| {
            self.discard_ref();
            CatalogError::io(&self.target, err)
        })
    }

    pub(crate) fn discard(self) {
        self.discard_ref();
    }

    fn discard_ref(&self) {
        if let Err(err) = fs::remove_file(&self.temp) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.temp.display(), "failed to remove staged file: {err}");
            }
        }
    }
}
