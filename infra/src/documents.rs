use std::fmt;
use std::marker::PhantomData;

use anyhow::bail;
use err_derive::Error;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

const KEY_SEPARATOR: char = ':';
const VERSION_MARKER: char = 'v';

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default, Hash)]
pub struct Version(String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default, Hash)]
pub struct DocMeta {
    #[serde(rename = "_version", default)]
    pub version: Version,
}

pub trait HasMeta {
    fn meta(&self) -> &DocMeta;
    fn meta_mut(&mut self) -> &mut DocMeta;
}

/// A named record in the key-value store. Bumping `SCHEMA_VERSION` moves the
/// record to a fresh key, leaving older data in place.
pub trait Document: Serialize + DeserializeOwned + HasMeta {
    const NAME: &'static str;
    const SCHEMA_VERSION: u32;
}

pub struct RecordKey<D> {
    namespace: String,
    phantom: PhantomData<D>,
}

#[derive(Debug, Clone, Error)]
pub enum KeyParseError {
    #[error(display = "record key {:?} has no namespace", _0)]
    MissingNamespace(String),
    #[error(display = "record key {:?} does not name {}", _0, _1)]
    WrongRecord(String, &'static str),
    #[error(display = "record key {:?} is not schema version {}", _0, _1)]
    WrongSchema(String, u32),
}

impl Version {
    pub(crate) fn from_raw(version: impl Into<String>) -> Self {
        Version(version.into())
    }

    pub fn is_unsaved(&self) -> bool {
        self.0.is_empty()
    }

    /// Successor for the counter-based backends, where versions are
    /// hexadecimal sequence numbers.
    pub(crate) fn successor(&self) -> Self {
        let current = u64::from_str_radix(&self.0, 16).unwrap_or(0);
        Version(format!("{:x}", current + 1))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        if self.is_unsaved() {
            write!(fmt, "<unsaved>")
        } else {
            write!(fmt, "{}", self.0)
        }
    }
}

impl<D: Document> RecordKey<D> {
    pub fn new(namespace: impl Into<String>) -> Self {
        RecordKey {
            namespace: namespace.into(),
            phantom: PhantomData,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl<D: Document> fmt::Display for RecordKey<D> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "{}{}{}{}{}{}",
            self.namespace,
            KEY_SEPARATOR,
            D::NAME,
            KEY_SEPARATOR,
            VERSION_MARKER,
            D::SCHEMA_VERSION
        )
    }
}

impl<D> fmt::Debug for RecordKey<D> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("RecordKey")
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl<D> Clone for RecordKey<D> {
    fn clone(&self) -> Self {
        RecordKey {
            namespace: self.namespace.clone(),
            phantom: PhantomData,
        }
    }
}

impl<D: Document> std::str::FromStr for RecordKey<D> {
    type Err = anyhow::Error;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let mut parts = src.rsplitn(3, KEY_SEPARATOR);
        let schema = parts.next().unwrap_or_default();
        let name = parts.next().unwrap_or_default();
        let namespace = match parts.next() {
            Some(ns) if !ns.is_empty() => ns,
            _ => bail!(KeyParseError::MissingNamespace(src.to_string())),
        };

        if name != D::NAME {
            bail!(KeyParseError::WrongRecord(src.to_string(), D::NAME));
        }
        let expected = format!("{}{}", VERSION_MARKER, D::SCHEMA_VERSION);
        if schema != expected {
            bail!(KeyParseError::WrongSchema(src.to_string(), D::SCHEMA_VERSION));
        }

        Ok(RecordKey::new(namespace))
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
    pub(crate) struct Shelf {
        #[serde(flatten)]
        pub(crate) meta: DocMeta,
        pub(crate) jars: Vec<String>,
    }

    impl HasMeta for Shelf {
        fn meta(&self) -> &DocMeta {
            &self.meta
        }
        fn meta_mut(&mut self) -> &mut DocMeta {
            &mut self.meta
        }
    }

    impl Document for Shelf {
        const NAME: &'static str = "shelf";
        const SCHEMA_VERSION: u32 = 3;
    }

    #[test]
    fn key_should_carry_namespace_name_and_schema() {
        let key = RecordKey::<Shelf>::new("pantry");
        assert_eq!(key.to_string(), "pantry:shelf:v3");
    }

    #[test]
    fn key_should_parse_namespaces_with_separators() {
        let key = "my:pantry:shelf:v3"
            .parse::<RecordKey<Shelf>>()
            .expect("parse key");
        assert_eq!(key.namespace(), "my:pantry");
    }

    #[test]
    fn key_should_reject_other_schema_versions() {
        let err = "pantry:shelf:v2"
            .parse::<RecordKey<Shelf>>()
            .expect_err("parse should fail");
        assert!(
            matches!(err.downcast_ref::<KeyParseError>(), Some(KeyParseError::WrongSchema(_, 3))),
            "{:?}",
            err
        );
    }

    #[test]
    fn key_should_reject_other_records() {
        let err = "pantry:cupboard:v3"
            .parse::<RecordKey<Shelf>>()
            .expect_err("parse should fail");
        assert!(
            matches!(err.downcast_ref::<KeyParseError>(), Some(KeyParseError::WrongRecord(_, "shelf"))),
            "{:?}",
            err
        );
    }

    #[test]
    fn key_should_require_namespace() {
        let err = "shelf:v3"
            .parse::<RecordKey<Shelf>>()
            .expect_err("parse should fail");
        assert!(
            matches!(err.downcast_ref::<KeyParseError>(), Some(KeyParseError::MissingNamespace(_))),
            "{:?}",
            err
        );
    }

    #[test]
    fn version_successor_counts_in_hex() {
        let v = Version::default().successor();
        assert_eq!(v.as_str(), "1");
        let v = Version::from_raw("f").successor();
        assert_eq!(v.as_str(), "10");
    }

    #[test]
    fn meta_should_flatten_into_version_field() {
        let mut shelf = Shelf::default();
        shelf.meta.version = Version::from_raw("2a");
        let json = serde_json::to_value(&shelf).expect("to json");
        assert_eq!(json["_version"], serde_json::json!("2a"));
    }
}
