use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::*;
use serde_json::Value;

use super::{stamp, Storage};
use crate::documents::Version;

type Records = BTreeMap<String, Value>;

/// All records in one JSON object on disk, keyed by record key. Writes go to
/// a sibling temporary file which is then renamed over the original.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Records> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No store file at {:?} yet", self.path);
                return Ok(Records::new());
            }
            Err(e) => return Err(e).with_context(|| format!("open {:?}", self.path)),
        };
        let records = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parse {:?}", self.path))?;
        Ok(records)
    }

    fn write(&self, records: &Records) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        {
            let file = File::create(&tmp).with_context(|| format!("create {:?}", tmp))?;
            let mut out = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut out, records)
                .with_context(|| format!("write {:?}", tmp))?;
            out.flush().with_context(|| format!("flush {:?}", tmp))?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename {:?} to {:?}", tmp, self.path))?;
        Ok(())
    }
}

impl Storage for FileStore {
    fn setup(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
            }
        }
        if !self.path.exists() {
            info!("Initialising store file at {:?}", self.path);
            self.write(&Records::new())?;
        }
        Ok(())
    }

    fn fetch(&self, key: &str) -> Result<Option<Value>> {
        let mut records = self.read()?;
        Ok(records.remove(key))
    }

    fn store(&self, key: &str, body: &Value, expected: &Version) -> Result<Version> {
        let mut records = self.read()?;
        let (body, version) = stamp(key, records.get(key), body, expected)?;
        records.insert(key.to_string(), body);
        self.write(&records)?;
        debug!("Wrote {} at {} to {:?}", key, version, self.path);
        Ok(version)
    }
}
