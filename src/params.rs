//! Table-driven option builder
//!
//! Every create-params struct publishes a static table mapping option names
//! to field setters ([`ParamTable`]). [`apply_options`] runs a flat option map
//! against one or more such tables at once.
//!
//! Unknown keys are collected across the whole map before anything is
//! applied, and reported together:
//!
//! ```rust
//! use oracledb::params::{apply_options, options, ParamTarget};
//! use oracledb::config::PoolCreateParams;
//!
//! let mut pool = PoolCreateParams::default();
//! let opts = options([("max_sessions", 4.into()), ("bogus1", 2.into()), ("bogus2", 3.into())]);
//! let err = apply_options(&opts, &mut [&mut pool as &mut dyn ParamTarget]).unwrap_err();
//! assert_eq!(err.to_string(), "unknown keywords: bogus1, bogus2");
//! assert_eq!(pool.max_sessions, 1);
//! ```

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::subscription::SubscrCallback;

/// Value of one option
#[derive(Clone)]
pub enum ParamValue {
    /// Explicit nil
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Text (also enum and flag names)
    Str(String),
    /// List of text values (keys, flag names)
    List(Vec<String>),
    /// Notification callback
    Callback(SubscrCallback),
}

/// Flat option map, iterated in insertion order
pub type OptionMap = IndexMap<String, ParamValue>;

/// Build an [`OptionMap`] from pairs
pub fn options<K, I>(pairs: I) -> OptionMap
where
    K: Into<String>,
    I: IntoIterator<Item = (K, ParamValue)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

impl ParamValue {
    /// Truthiness: everything except `Null` and `Bool(false)` is true
    pub fn truthy(&self) -> bool {
        !matches!(self, ParamValue::Null | ParamValue::Bool(false))
    }

    fn kind(&self) -> &'static str {
        match self {
            ParamValue::Null => "nil",
            ParamValue::Bool(_) => "boolean",
            ParamValue::Int(_) => "integer",
            ParamValue::Str(_) => "string",
            ParamValue::List(_) => "list",
            ParamValue::Callback(_) => "callback",
        }
    }

    /// Integer value converted to `T`
    pub fn as_int<T: TryFrom<i64>>(&self, name: &str) -> Result<T> {
        match self {
            ParamValue::Int(i) => T::try_from(*i)
                .map_err(|_| Error::invalid_option(name, format!("{} is out of range", i))),
            other => Err(Error::invalid_option(
                name,
                format!("expected integer, got {}", other.kind()),
            )),
        }
    }

    /// Text value; `Null` yields `None`
    pub fn as_text(&self, name: &str) -> Result<Option<&str>> {
        match self {
            ParamValue::Null => Ok(None),
            ParamValue::Str(s) => Ok(Some(s)),
            other => Err(Error::invalid_option(
                name,
                format!("expected string, got {}", other.kind()),
            )),
        }
    }
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => f.write_str("Null"),
            ParamValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            ParamValue::Int(i) => f.debug_tuple("Int").field(i).finish(),
            ParamValue::Str(s) => f.debug_tuple("Str").field(s).finish(),
            ParamValue::List(l) => f.debug_tuple("List").field(l).finish(),
            ParamValue::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        ParamValue::List(v)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(v: Vec<&str>) -> Self {
        ParamValue::List(v.into_iter().map(String::from).collect())
    }
}

impl From<SubscrCallback> for ParamValue {
    fn from(v: SubscrCallback) -> Self {
        ParamValue::Callback(v)
    }
}

/// Parse an enum option given by name or numeric value
pub fn parse_enum<E>(name: &str, value: &ParamValue) -> Result<E>
where
    E: FromStr<Err = Error> + TryFrom<u32, Error = Error>,
{
    let parsed = match value {
        ParamValue::Str(s) => s.parse(),
        ParamValue::Int(_) => E::try_from(value.as_int::<u32>(name)?),
        other => {
            return Err(Error::invalid_option(
                name,
                format!("expected name, got {}", other.kind()),
            ))
        }
    };
    parsed.map_err(|e| Error::invalid_option(name, e.to_string()))
}

/// Parse a flag option given by name, list of names or raw bits
pub fn parse_flags<F>(name: &str, value: &ParamValue) -> Result<F>
where
    F: FromStr<Err = Error> + From<u32> + BitOr<Output = F> + Default,
{
    let parsed = match value {
        ParamValue::Str(s) => s.parse(),
        ParamValue::List(names) => names
            .iter()
            .try_fold(F::default(), |acc, n| n.parse::<F>().map(|f| acc | f)),
        ParamValue::Int(_) => Ok(F::from(value.as_int::<u32>(name)?)),
        other => {
            return Err(Error::invalid_option(
                name,
                format!("expected flag names, got {}", other.kind()),
            ))
        }
    };
    parsed.map_err(|e| Error::invalid_option(name, e.to_string()))
}

/// How one option is written into its struct
pub enum Setter<T> {
    /// Boolean field, set from truthiness
    Bool(fn(&mut T) -> &mut bool),
    /// Optional text field
    Str(fn(&mut T) -> &mut Option<String>),
    /// Signed 32-bit field
    I32(fn(&mut T) -> &mut i32),
    /// Unsigned 32-bit field
    U32(fn(&mut T) -> &mut u32),
    /// Unsigned 64-bit field
    U64(fn(&mut T) -> &mut u64),
    /// Custom logic (enums, flags, lists, callbacks)
    Special(fn(&mut T, &str, &ParamValue) -> Result<()>),
}

impl<T> Setter<T> {
    fn apply(&self, target: &mut T, name: &str, value: &ParamValue) -> Result<()> {
        match self {
            Setter::Bool(access) => *access(target) = value.truthy(),
            Setter::Str(access) => *access(target) = value.as_text(name)?.map(str::to_string),
            Setter::I32(access) => *access(target) = value.as_int(name)?,
            Setter::U32(access) => *access(target) = value.as_int(name)?,
            Setter::U64(access) => *access(target) = value.as_int(name)?,
            Setter::Special(set) => set(target, name, value)?,
        }
        Ok(())
    }
}

/// Build one [`ParamDef`] for a field of `$ty`.
///
/// Field kinds: `Bool`, `Str`, `I32`, `U32`, `U64`, `Enum` (named enum) and
/// `Flags` (flag set). `Special` takes a custom setter function.
macro_rules! param {
    ($ty:ty, $name:literal, Bool, $field:ident) => {
        $crate::params::param!(@access $ty, $name, Bool, bool, $field)
    };
    ($ty:ty, $name:literal, Str, $field:ident) => {
        $crate::params::param!(@access $ty, $name, Str, Option<String>, $field)
    };
    ($ty:ty, $name:literal, I32, $field:ident) => {
        $crate::params::param!(@access $ty, $name, I32, i32, $field)
    };
    ($ty:ty, $name:literal, U32, $field:ident) => {
        $crate::params::param!(@access $ty, $name, U32, u32, $field)
    };
    ($ty:ty, $name:literal, U64, $field:ident) => {
        $crate::params::param!(@access $ty, $name, U64, u64, $field)
    };
    ($ty:ty, $name:literal, Enum, $field:ident) => {
        $crate::params::param!(@parse $ty, $name, parse_enum, $field)
    };
    ($ty:ty, $name:literal, Flags, $field:ident) => {
        $crate::params::param!(@parse $ty, $name, parse_flags, $field)
    };
    ($ty:ty, $name:literal, Special, $set:path) => {
        $crate::params::ParamDef {
            name: $name,
            setter: $crate::params::Setter::Special($set),
        }
    };
    (@access $ty:ty, $name:literal, $kind:ident, $field_ty:ty, $field:ident) => {
        $crate::params::ParamDef {
            name: $name,
            setter: $crate::params::Setter::$kind({
                fn access(target: &mut $ty) -> &mut $field_ty {
                    &mut target.$field
                }
                access
            }),
        }
    };
    (@parse $ty:ty, $name:literal, $parse:ident, $field:ident) => {
        $crate::params::ParamDef {
            name: $name,
            setter: $crate::params::Setter::Special({
                fn set(
                    target: &mut $ty,
                    name: &str,
                    value: &$crate::params::ParamValue,
                ) -> $crate::error::Result<()> {
                    target.$field = $crate::params::$parse(name, value)?;
                    Ok(())
                }
                set
            }),
        }
    };
}

pub(crate) use param;

/// One table entry
pub struct ParamDef<T: 'static> {
    /// Option name
    pub name: &'static str,
    /// Field setter
    pub setter: Setter<T>,
}

/// Struct populated from options
pub trait ParamTable: Sized + 'static {
    /// Recognised options
    const TABLE: &'static [ParamDef<Self>];
}

/// Object-safe view of a [`ParamTable`]
pub trait ParamTarget {
    /// Whether `key` is in the table
    fn knows(&self, key: &str) -> bool;

    /// Apply `value` for `key`; returns false when the key is not in the table
    fn apply(&mut self, key: &str, value: &ParamValue) -> Result<bool>;
}

impl<T: ParamTable> ParamTarget for T {
    fn knows(&self, key: &str) -> bool {
        T::TABLE.iter().any(|def| def.name == key)
    }

    fn apply(&mut self, key: &str, value: &ParamValue) -> Result<bool> {
        match T::TABLE.iter().find(|def| def.name == key) {
            Some(def) => {
                def.setter.apply(self, key, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Keys of `options` that no target recognises, in map order
pub fn unmatched_keys(options: &OptionMap, targets: &[&dyn ParamTarget]) -> Vec<String> {
    options
        .keys()
        .filter(|key| !targets.iter().any(|t| t.knows(key)))
        .cloned()
        .collect()
}

/// Apply `options` to every target whose table has each key.
///
/// Fails with [`Error::UnknownOptions`] listing every unrecognised key, in
/// which case no target is modified.
pub fn apply_options(options: &OptionMap, targets: &mut [&mut dyn ParamTarget]) -> Result<()> {
    let unknown: Vec<String> = options
        .keys()
        .filter(|key| !targets.iter().any(|t| t.knows(key)))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(Error::UnknownOptions(unknown));
    }
    for (key, value) in options {
        for target in targets.iter_mut() {
            if target.apply(key, value)? {
                tracing::trace!(key = key.as_str(), value = ?value, "option applied");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{AuthMode, Purity};

    #[derive(Debug, Default)]
    struct Sample {
        flag: bool,
        label: Option<String>,
        count: u32,
        offset: i32,
        big: u64,
        purity: Purity,
        auth: AuthMode,
    }

    impl ParamTable for Sample {
        const TABLE: &'static [ParamDef<Self>] = &[
            param!(Sample, "flag", Bool, flag),
            param!(Sample, "label", Str, label),
            param!(Sample, "count", U32, count),
            param!(Sample, "offset", I32, offset),
            param!(Sample, "big", U64, big),
            param!(Sample, "purity", Enum, purity),
            param!(Sample, "auth", Flags, auth),
        ];
    }

    #[test]
    fn test_apply_all_field_kinds() {
        let mut s = Sample::default();
        let opts = options([
            ("flag", ParamValue::Int(0)),
            ("label", "x".into()),
            ("count", 7.into()),
            ("offset", (-3).into()),
            ("big", ParamValue::Int(1 << 40)),
            ("purity", "self".into()),
            ("auth", vec!["sysdba", "prelim"].into()),
        ]);
        apply_options(&opts, &mut [&mut s as &mut dyn ParamTarget]).unwrap();
        assert!(s.flag);
        assert_eq!(s.label.as_deref(), Some("x"));
        assert_eq!(s.count, 7);
        assert_eq!(s.offset, -3);
        assert_eq!(s.big, 1 << 40);
        assert_eq!(s.purity, Purity::SelfPurity);
        assert_eq!(s.auth, AuthMode::SYSDBA | AuthMode::PRELIM);
    }

    #[test]
    fn test_wrong_value_shape() {
        let mut s = Sample::default();
        let err = apply_options(&options([("count", "seven".into())]), &mut [&mut s as &mut dyn ParamTarget])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { ref name, .. } if name == "count"));

        let err = apply_options(&options([("count", (-1).into())]), &mut [&mut s as &mut dyn ParamTarget])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { .. }));

        let err = apply_options(&options([("purity", "dirty".into())]), &mut [&mut s as &mut dyn ParamTarget])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { .. }));
    }

    #[test]
    fn test_unknown_keys_all_reported() {
        let mut s = Sample::default();
        let opts = options([
            ("bogus1", 2.into()),
            ("count", 1.into()),
            ("bogus2", 3.into()),
        ]);
        assert_eq!(unmatched_keys(&opts, &[&s as &dyn ParamTarget]), vec!["bogus1", "bogus2"]);
        match apply_options(&opts, &mut [&mut s as &mut dyn ParamTarget]) {
            Err(Error::UnknownOptions(keys)) => assert_eq!(keys, vec!["bogus1", "bogus2"]),
            other => panic!("expected unknown options, got {:?}", other),
        }
        assert_eq!(s.count, 0);
    }

    #[test]
    fn test_null_clears_text() {
        let mut s = Sample {
            label: Some("old".into()),
            ..Default::default()
        };
        apply_options(&options([("label", ParamValue::Null)]), &mut [&mut s as &mut dyn ParamTarget]).unwrap();
        assert_eq!(s.label, None);
    }
}
