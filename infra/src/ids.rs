use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::bail;
use data_encoding::BASE64URL_NOPAD;
use err_derive::Error;
use hex_slice::AsHex;
use rand::distributions::{Distribution, Standard};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

const ID_LEN: usize = 16;
const DIVIDER: &str = "-";

pub struct Id<T> {
    val: [u8; ID_LEN],
    phantom: PhantomData<T>,
}

#[derive(Debug, Clone, Error)]
pub enum IdParseError {
    #[error(display = "identifier does not start with expected prefix")]
    InvalidPrefix,
    #[error(display = "unparseable identifier")]
    Unparseable,
}

pub trait Entity {
    const PREFIX: &'static str;
}

#[derive(Debug, Default, Clone)]
pub struct IdGen {
    _private: (),
}

impl IdGen {
    pub fn new() -> Self {
        IdGen { _private: () }
    }

    /// Timestamp-ordered identifier: milliseconds since the epoch followed by
    /// eight random bytes.
    pub fn generate<T>(&self) -> Id<T> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let random = rand::random::<u64>();

        let mut val = [0u8; ID_LEN];
        val[..8].copy_from_slice(&millis.to_be_bytes());
        val[8..].copy_from_slice(&random.to_be_bytes());
        Id {
            val,
            phantom: PhantomData,
        }
    }
}

impl<T> Id<T> {
    pub fn hashed<H: Hash + ?Sized>(entity: &H) -> Self {
        let mut val = [0u8; ID_LEN];
        for (i, chunk) in val.chunks_mut(8).enumerate() {
            let mut h = siphasher::sip::SipHasher24::new_with_keys(0, i as u64);
            entity.hash(&mut h);
            chunk.copy_from_slice(&h.finish().to_be_bytes());
        }
        Id {
            val,
            phantom: PhantomData,
        }
    }

    pub fn timestamp(&self) -> SystemTime {
        let mut millis = [0u8; 8];
        millis.copy_from_slice(&self.val[..8]);
        UNIX_EPOCH + Duration::from_millis(u64::from_be_bytes(millis))
    }

    pub fn random(&self) -> u64 {
        let mut random = [0u8; 8];
        random.copy_from_slice(&self.val[8..]);
        u64::from_be_bytes(random)
    }
}

impl<T> Distribution<Id<T>> for Standard {
    fn sample<R: ?Sized + rand::Rng>(&self, rng: &mut R) -> Id<T> {
        let val = rng.gen();
        Id {
            val,
            phantom: PhantomData,
        }
    }
}

impl<T: Entity> fmt::Display for Id<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "{}{}{}",
            T::PREFIX,
            DIVIDER,
            BASE64URL_NOPAD.encode(&self.val)
        )
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Id")
            .field("val", &format_args!("{:x}", self.val.as_hex()))
            .finish()
    }
}

impl<T: Entity> std::str::FromStr for Id<T> {
    type Err = anyhow::Error;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        if !src.starts_with(T::PREFIX) {
            bail!(IdParseError::InvalidPrefix);
        };
        let remainder = &src[T::PREFIX.len()..];
        if !remainder.starts_with(DIVIDER) {
            bail!(IdParseError::Unparseable);
        }
        let b64 = &remainder[DIVIDER.len()..];

        let decoded = match BASE64URL_NOPAD.decode(b64.as_bytes()) {
            Ok(decoded) => decoded,
            Err(_) => bail!(IdParseError::Unparseable),
        };
        if decoded.len() != ID_LEN {
            bail!(IdParseError::Unparseable);
        }

        let mut id = Id::default();
        id.val.copy_from_slice(&decoded);
        Ok(id)
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        let val = Default::default();
        let phantom = PhantomData;
        Id { val, phantom }
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.val == other.val
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.val.cmp(&other.val)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.val.hash(state)
    }
}

impl<T: Entity> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T: Entity> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
