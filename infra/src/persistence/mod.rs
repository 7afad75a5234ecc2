use anyhow::{bail, Context, Result};
use err_derive::Error;
use log::*;
use serde_json::Value;

use crate::documents::{Document, RecordKey, Version};

mod file;
mod memory;
mod pg;

pub use self::file::FileStore;
pub use self::memory::MemoryStore;
pub use self::pg::PgStore;

const VERSION_FIELD: &str = "_version";

#[derive(Debug, Error, PartialEq, Eq)]
#[error(display = "stale version")]
pub struct ConcurrencyError;

/// Raw key-value access. Every write names the version it expects to replace;
/// an unsaved version means the key must not exist yet.
pub trait Storage {
    fn setup(&self) -> Result<()>;
    fn fetch(&self, key: &str) -> Result<Option<Value>>;
    fn store(&self, key: &str, body: &Value, expected: &Version) -> Result<Version>;
}

pub struct Documents<'a> {
    storage: &'a dyn Storage,
}

impl<'a> Documents<'a> {
    pub fn wrap(storage: &'a dyn Storage) -> Self {
        Documents { storage }
    }

    pub fn setup(&self) -> Result<()> {
        self.storage.setup()
    }

    pub fn load<D: Document>(&self, key: &RecordKey<D>) -> Result<Option<D>> {
        let key = key.to_string();
        let body = match self.storage.fetch(&key)? {
            Some(body) => body,
            None => {
                debug!("No document at {}", key);
                return Ok(None);
            }
        };
        let doc = serde_json::from_value(body).with_context(|| format!("decode {}", key))?;
        Ok(Some(doc))
    }

    pub fn save<D: Document>(&self, key: &RecordKey<D>, document: &mut D) -> Result<()> {
        let key = key.to_string();
        let json = serde_json::to_value(&*document).with_context(|| format!("encode {}", key))?;
        let expected = document.meta().version.clone();
        let version = self.storage.store(&key, &json, &expected)?;
        debug!("Saved {} at version {} (was {})", key, version, expected);
        document.meta_mut().version = version;
        Ok(())
    }
}

fn version_of(body: &Value) -> Version {
    body.get(VERSION_FIELD)
        .and_then(Value::as_str)
        .map(Version::from_raw)
        .unwrap_or_default()
}

/// Checks `expected` against whatever is currently stored and returns the
/// body to write, stamped with its new version. Shared by the backends that
/// keep their own version counters.
fn stamp(
    key: &str,
    current: Option<&Value>,
    body: &Value,
    expected: &Version,
) -> Result<(Value, Version)> {
    let current_version = current.map(version_of);
    let fresh = match (&current_version, expected.is_unsaved()) {
        (None, true) => true,
        (Some(current), false) => current == expected,
        _ => false,
    };
    if !fresh {
        warn!(
            "Version conflict on {}: expected {}, found {:?}",
            key, expected, current_version
        );
        return Err(ConcurrencyError.into());
    }

    let next = current_version.unwrap_or_default().successor();
    let mut body = body.clone();
    match body.as_object_mut() {
        Some(fields) => {
            fields.insert(VERSION_FIELD.to_string(), Value::String(next.as_str().to_string()));
        }
        None => bail!("document at {} is not a JSON object", key),
    }
    Ok((body, next))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::documents::test::Shelf;
    use crate::documents::HasMeta;

    pub(super) fn should_save_and_load(storage: &dyn Storage) {
        let docs = Documents::wrap(storage);
        docs.setup().expect("setup");
        let key = RecordKey::<Shelf>::new("save-load");

        let mut shelf = Shelf {
            jars: vec!["flour".to_string(), "sugar".to_string()],
            ..Default::default()
        };
        docs.save(&key, &mut shelf).expect("save");
        assert!(!shelf.meta().version.is_unsaved());

        let loaded = docs.load(&key).expect("load");
        assert_eq!(Some(shelf), loaded);
    }

    pub(super) fn should_return_none_for_missing(storage: &dyn Storage) {
        let docs = Documents::wrap(storage);
        docs.setup().expect("setup");
        let key = RecordKey::<Shelf>::new("missing");

        let loaded = docs.load(&key).expect("load");
        assert_eq!(None, loaded);
    }

    pub(super) fn should_update_on_overwrite(storage: &dyn Storage) {
        let docs = Documents::wrap(storage);
        docs.setup().expect("setup");
        let key = RecordKey::<Shelf>::new("overwrite");

        let mut shelf = Shelf::default();
        docs.save(&key, &mut shelf).expect("save original");
        let first = shelf.meta().version.clone();

        shelf.jars.push("salt".to_string());
        docs.save(&key, &mut shelf).expect("save modified");
        assert_ne!(first, shelf.meta().version);

        let loaded = docs.load(&key).expect("load").expect("present");
        assert_eq!(loaded.jars, vec!["salt".to_string()]);
    }

    pub(super) fn should_fail_on_overwrite_with_new(storage: &dyn Storage) {
        let docs = Documents::wrap(storage);
        docs.setup().expect("setup");
        let key = RecordKey::<Shelf>::new("overwrite-with-new");

        docs.save(&key, &mut Shelf::default()).expect("save original");

        let err = docs
            .save(&key, &mut Shelf::default())
            .expect_err("save should fail");
        assert_eq!(
            err.root_cause().downcast_ref::<ConcurrencyError>(),
            Some(&ConcurrencyError),
            "Error: {:?}",
            err
        );
    }

    pub(super) fn should_fail_on_stale_version(storage: &dyn Storage) {
        let docs = Documents::wrap(storage);
        docs.setup().expect("setup");
        let key = RecordKey::<Shelf>::new("stale");

        let mut original = Shelf::default();
        docs.save(&key, &mut original).expect("save original");
        let mut stale = original.clone();

        original.jars.push("yeast".to_string());
        docs.save(&key, &mut original).expect("save update");

        stale.jars.push("rice".to_string());
        let err = docs.save(&key, &mut stale).expect_err("save should fail");
        assert_eq!(
            err.root_cause().downcast_ref::<ConcurrencyError>(),
            Some(&ConcurrencyError),
            "Error: {:?}",
            err
        );
    }

    #[test]
    fn stamp_should_reject_non_objects() {
        let err = stamp("k", None, &serde_json::json!([1, 2]), &Version::default())
            .expect_err("stamp should fail");
        assert!(err.to_string().contains("not a JSON object"), "{}", err);
    }

    #[test]
    fn stamp_should_reject_saved_version_for_missing_key() {
        let err = stamp(
            "k",
            None,
            &serde_json::json!({}),
            &Version::from_raw("1"),
        )
        .expect_err("stamp should fail");
        assert!(err.downcast_ref::<ConcurrencyError>().is_some(), "{:?}", err);
    }
}
