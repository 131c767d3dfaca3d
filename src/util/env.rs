//! Environment configuration.
//!
//! Variables are read from the process environment (and a `.env` file, if present) and
//! deserialized straight into [`Env`]. The deserializer follows the approach of the [`envy`]
//! crate: keys are matched by name, values are parsed on demand for whichever primitive the target
//! field asks for.
//!
//! [`envy`]: https://github.com/softprops/envy

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::de::value::MapDeserializer;
use serde::de::{self, IntoDeserializer};
use thiserror::Error;

use crate::constants::{
    DEFAULT_MEMORY_PAGE_SIZE, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_MS, SERVER_PORT,
};
use crate::util::retry::Backoff;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Env {
    #[serde(default = "default_port")]
    pub server_api_port: u16,
    #[serde(default)]
    pub store_backend: StoreBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_cors")]
    pub cors_allow_origins: String,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default = "default_retry_attempts")]
    pub store_retry_attempts: u32,
    #[serde(default = "default_retry_base_ms")]
    pub store_retry_base_ms: u64,
    #[serde(default = "default_page_size")]
    pub memory_page_size: usize,
}

#[inline]
const fn default_port() -> u16 {
    SERVER_PORT
}

#[inline]
const fn default_retry_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

#[inline]
const fn default_retry_base_ms() -> u64 {
    DEFAULT_RETRY_BASE_MS
}

#[inline]
const fn default_page_size() -> usize {
    DEFAULT_MEMORY_PAGE_SIZE
}

fn default_redis_url() -> String {
    String::from("redis://127.0.0.1:6379")
}

/// A missing `.env` is fine; one that can't be read or parsed is not.
fn dotenv_path(loaded: Result<PathBuf, dotenvy::Error>) -> EnvResult<Option<PathBuf>> {
    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn default_cors() -> String {
    String::from("*")
}

fn default_log_filter() -> String {
    String::from("snake_board=debug,tower_http=debug,axum=debug,redis=info,info")
}

impl Env {
    /// Loads `.env` (if any) on top of the process environment. Runs before tracing is set up,
    /// so the path of the loaded file is handed back for the caller to log.
    pub fn load() -> EnvResult<(Self, Option<PathBuf>)> {
        let dotenv = dotenv_path(dotenvy::dotenv())?;
        Ok((from_iter(std::env::vars())?, dotenv))
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            self.store_retry_attempts,
            Duration::from_millis(self.store_retry_base_ms),
        )
    }
}

pub type EnvResult<T> = core::result::Result<T, EnvErr>;

#[derive(Debug, Error)]
pub enum EnvErr {
    #[error(transparent)]
    Dotenvy(#[from] dotenvy::Error),

    #[error(transparent)]
    DeserializationError(#[from] EnvDeserializeError),
}

#[derive(Debug, Error)]
pub enum EnvDeserializeError {
    #[error("env deserialization error: {0}")]
    Custom(String),

    #[error("missing environment variable '{0}'")]
    MissingValue(String),
}

impl de::Error for EnvDeserializeError {
    fn custom<T>(msg: T) -> Self
    where
        T: std::fmt::Display,
    {
        EnvDeserializeError::Custom(msg.to_string())
    }

    fn missing_field(field: &'static str) -> Self {
        EnvDeserializeError::MissingValue(field.into())
    }
}

pub fn from_iter<Iter, T>(iter: Iter) -> Result<T, EnvDeserializeError>
where
    T: de::DeserializeOwned,
    Iter: IntoIterator<Item = (String, String)>,
{
    let vars = iter.into_iter().map(|(k, v)| (k.clone(), Val(k, v)));
    T::deserialize(MapDeserializer::new(vars))
}

// ---
//  Value deserializer
// ---

/// `(variable name, raw value)`
struct Val(String, String);

impl<'de> IntoDeserializer<'de, EnvDeserializeError> for Val {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

macro_rules! forward_parsed_vals {
    ($($ty:ident => $method:ident,)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value, EnvDeserializeError>
            where
                V: de::Visitor<'de>
            {
                match self.1.trim().parse::<$ty>() {
                    Ok(val) => val.into_deserializer().$method(visitor),
                    Err(e) => Err(de::Error::custom(format_args!(
                        "{}: while parsing '{}' (provider: {})",
                        e, self.1, self.0
                    )))
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for Val {
    type Error = EnvDeserializeError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.1.into_deserializer().deserialize_any(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        if self.1.is_empty() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_newtype_struct<V>(
        self,
        _: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.1
            .trim()
            .to_lowercase()
            .into_deserializer()
            .deserialize_enum(name, variants, visitor)
    }

    forward_parsed_vals! {
        bool => deserialize_bool,
        u8 => deserialize_u8,
        u16 => deserialize_u16,
        u32 => deserialize_u32,
        u64 => deserialize_u64,
        i8 => deserialize_i8,
        i16 => deserialize_i16,
        i32 => deserialize_i32,
        i64 => deserialize_i64,
        f32 => deserialize_f32,
        f64 => deserialize_f64,
    }

    serde::forward_to_deserialize_any! {
        char str string unit seq bytes byte_buf map unit_struct tuple_struct identifier
        tuple ignored_any struct
    }
}
