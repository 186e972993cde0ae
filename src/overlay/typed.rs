//! Typed Accessors
//!
//! Fixed-width scalar and string values, plus serde object wrappers in a
//! compact binary form (bincode) or as JSON, over the raw byte API.

use serde::{de::DeserializeOwned, Serialize};

use crate::engine::Engine;
use crate::error::{CacheError, Result};
use crate::overlay::Overlay;

// == Cache Value ==
/// A type with a fixed byte representation in the cache.
///
/// Integers and floats are little-endian (floats as IEEE-754 bit patterns),
/// booleans are one byte, strings are UTF-8.
pub trait CacheValue: Sized {
    fn to_bytes(&self) -> Vec<u8>;

    /// Fails with [`CacheError::InvalidType`] when `bytes` is not a valid
    /// representation, for example when the width does not match.
    fn from_bytes(bytes: &[u8]) -> Result<Self>;
}

fn fixed<const N: usize>(bytes: &[u8], expected: &'static str) -> Result<[u8; N]> {
    <[u8; N]>::try_from(bytes).map_err(|_| CacheError::InvalidType {
        expected,
        actual_len: bytes.len(),
    })
}

impl CacheValue for i32 {
    fn to_bytes(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        fixed(bytes, "i32 (4 bytes)").map(i32::from_le_bytes)
    }
}

impl CacheValue for i64 {
    fn to_bytes(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        fixed(bytes, "i64 (8 bytes)").map(i64::from_le_bytes)
    }
}

impl CacheValue for f32 {
    fn to_bytes(&self) -> Vec<u8> {
        self.to_bits().to_le_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        fixed(bytes, "f32 (4 bytes)").map(|b| f32::from_bits(u32::from_le_bytes(b)))
    }
}

impl CacheValue for f64 {
    fn to_bytes(&self) -> Vec<u8> {
        self.to_bits().to_le_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        fixed(bytes, "f64 (8 bytes)").map(|b| f64::from_bits(u64::from_le_bytes(b)))
    }
}

impl CacheValue for bool {
    fn to_bytes(&self) -> Vec<u8> {
        vec![u8::from(*self)]
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        fixed::<1>(bytes, "bool (1 byte)").map(|[b]| b == 1)
    }
}

impl CacheValue for String {
    fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        String::from_utf8(bytes.to_vec()).map_err(|_| CacheError::InvalidType {
            expected: "UTF-8 string",
            actual_len: bytes.len(),
        })
    }
}

impl CacheValue for Vec<u8> {
    fn to_bytes(&self) -> Vec<u8> {
        self.clone()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bytes.to_vec())
    }
}

impl<E: Engine> Overlay<E> {
    /// Stores a typed value; see [`Overlay::put`] for TTL semantics.
    pub async fn put_value<T: CacheValue>(
        &self,
        key: &str,
        value: &T,
        expire_seconds: i64,
    ) -> Result<()> {
        self.put(key, &value.to_bytes(), expire_seconds).await
    }

    /// Reads a typed value. A miss is [`CacheError::NotFound`]; a stored value
    /// of the wrong shape is [`CacheError::InvalidType`].
    pub async fn fetch_value<T: CacheValue>(&self, key: &str) -> Result<T> {
        let bytes = self.fetch(key).await?;
        T::from_bytes(&bytes)
    }

    // == Binary Objects ==
    /// Stores any serializable value in bincode's standard encoding. This is
    /// the compact default for structured values.
    pub async fn put_object<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        expire_seconds: i64,
    ) -> Result<()> {
        let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard())?;
        self.put(key, &bytes, expire_seconds).await
    }

    /// Reads a value stored with [`Overlay::put_object`]. Bytes left over
    /// after decoding mean the value was written as something else.
    pub async fn fetch_object<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let bytes = self.fetch(key).await?;
        let (value, read) =
            bincode::serde::decode_from_slice::<T, _>(&bytes, bincode::config::standard())?;
        if read != bytes.len() {
            return Err(CacheError::InvalidType {
                expected: std::any::type_name::<T>(),
                actual_len: bytes.len(),
            });
        }
        Ok(value)
    }

    // == JSON Objects ==
    /// Stores any serializable value as JSON.
    pub async fn put_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        expire_seconds: i64,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.put(key, &bytes, expire_seconds).await
    }

    /// Reads a value stored with [`Overlay::put_json`].
    pub async fn fetch_json<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let bytes = self.fetch(key).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersistConfig;
    use crate::engine::MemoryEngine;
    use serde::Deserialize;
    use std::sync::Arc;

    async fn overlay() -> Overlay<MemoryEngine> {
        Overlay::open(Arc::new(MemoryEngine::new(100, 1 << 20)), PersistConfig::disabled())
            .await
            .unwrap()
    }

    #[test]
    fn test_scalar_encodings() {
        assert_eq!(1i32.to_bytes(), vec![1, 0, 0, 0]);
        assert_eq!((-2i64).to_bytes(), vec![0xfe, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(1.0f32.to_bytes(), vec![0x00, 0x00, 0x80, 0x3f]);
        assert_eq!(true.to_bytes(), vec![1]);
        assert_eq!(false.to_bytes(), vec![0]);
        assert_eq!("张三".to_string().to_bytes(), "张三".as_bytes());
    }

    #[test]
    fn test_width_mismatch_is_invalid_type() {
        assert!(matches!(
            i32::from_bytes(&[1, 2, 3]),
            Err(CacheError::InvalidType { actual_len: 3, .. })
        ));
        assert!(matches!(i64::from_bytes(&[0; 4]), Err(CacheError::InvalidType { .. })));
        assert!(matches!(f64::from_bytes(&[]), Err(CacheError::InvalidType { .. })));
        assert!(matches!(bool::from_bytes(&[1, 0]), Err(CacheError::InvalidType { .. })));
        assert!(matches!(
            String::from_bytes(&[0xff, 0xfe]),
            Err(CacheError::InvalidType { .. })
        ));
    }

    #[test]
    fn test_bool_decodes_only_one_as_true() {
        assert!(bool::from_bytes(&[1]).unwrap());
        assert!(!bool::from_bytes(&[0]).unwrap());
        assert!(!bool::from_bytes(&[2]).unwrap());
    }

    #[tokio::test]
    async fn test_typed_roundtrips() {
        let overlay = overlay().await;

        overlay.put_value("i32", &-42i32, 0).await.unwrap();
        overlay.put_value("i64", &i64::MAX, 0).await.unwrap();
        overlay.put_value("f32", &0.99f32, 0).await.unwrap();
        overlay.put_value("f64", &99.99f64, 0).await.unwrap();
        overlay.put_value("bool", &true, 0).await.unwrap();
        overlay.put_value("str", &"张三".to_string(), 0).await.unwrap();
        overlay.put_value("raw", &vec![0u8, 1, 2], 30).await.unwrap();

        assert_eq!(overlay.fetch_value::<i32>("i32").await.unwrap(), -42);
        assert_eq!(overlay.fetch_value::<i64>("i64").await.unwrap(), i64::MAX);
        assert_eq!(overlay.fetch_value::<f32>("f32").await.unwrap(), 0.99f32);
        assert_eq!(overlay.fetch_value::<f64>("f64").await.unwrap(), 99.99f64);
        assert!(overlay.fetch_value::<bool>("bool").await.unwrap());
        assert_eq!(overlay.fetch_value::<String>("str").await.unwrap(), "张三");
        assert_eq!(overlay.fetch_value::<Vec<u8>>("raw").await.unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_typed_fetch_of_wrong_width() {
        let overlay = overlay().await;
        overlay.put_value("n", &7i32, 0).await.unwrap();

        assert!(matches!(
            overlay.fetch_value::<i64>("n").await,
            Err(CacheError::InvalidType { actual_len: 4, .. })
        ));
    }

    #[tokio::test]
    async fn test_typed_fetch_missing_is_not_found() {
        let overlay = overlay().await;
        assert!(matches!(
            overlay.fetch_value::<i32>("missing").await,
            Err(CacheError::NotFound(_))
        ));
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        id: u32,
        name: String,
        age: u8,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Session {
        user: User,
        tags: Vec<String>,
        score: Option<f64>,
    }

    #[tokio::test]
    async fn test_object_roundtrip() {
        let overlay = overlay().await;
        let session = Session {
            user: User {
                id: 7,
                name: "王五".to_string(),
                age: 41,
            },
            tags: vec!["admin".to_string(), "🔑".to_string()],
            score: Some(0.5),
        };

        overlay.put_object("session", &session, 0).await.unwrap();

        assert_eq!(overlay.fetch_object::<Session>("session").await.unwrap(), session);
        assert_eq!(overlay.permanent_len().await, 1);
    }

    #[tokio::test]
    async fn test_object_is_more_compact_than_json() {
        let overlay = overlay().await;
        let user = User {
            id: 1,
            name: "a".to_string(),
            age: 2,
        };

        overlay.put_object("bin", &user, 0).await.unwrap();
        overlay.put_json("json", &user, 0).await.unwrap();

        let bin = overlay.fetch("bin").await.unwrap();
        let json = overlay.fetch("json").await.unwrap();
        assert!(bin.len() < json.len());
    }

    #[tokio::test]
    async fn test_object_fetch_of_foreign_bytes_fails() {
        let overlay = overlay().await;
        overlay.put_value("text", &"hi".to_string(), 0).await.unwrap();
        overlay.put_value("raw", &vec![1u8, 2, 3], 0).await.unwrap();

        assert!(matches!(
            overlay.fetch_object::<User>("text").await,
            Err(CacheError::ObjectDecode(_))
        ));
        assert!(matches!(
            overlay.fetch_object::<u8>("raw").await,
            Err(CacheError::InvalidType { actual_len: 3, .. })
        ));
        assert!(matches!(
            overlay.fetch_object::<User>("missing").await,
            Err(CacheError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_json_roundtrip() {
        let overlay = overlay().await;
        let user = User {
            id: 1,
            name: "李四".to_string(),
            age: 30,
        };

        overlay.put_json("user", &user, 0).await.unwrap();

        assert_eq!(overlay.fetch_json::<User>("user").await.unwrap(), user);
    }

    #[tokio::test]
    async fn test_json_fetch_of_non_json_fails() {
        let overlay = overlay().await;
        overlay.put_value("n", &7i32, 0).await.unwrap();

        assert!(matches!(
            overlay.fetch_json::<User>("n").await,
            Err(CacheError::Serialization(_))
        ));
    }
}
