//! Merge trait for configuration layering.
//!
//! Convention: `other` takes precedence over `self`.

use std::path::PathBuf;
use typebridge_schema::{NullableStyle, SchemaDraft};

pub trait Merge {
    fn merge(self, other: Self) -> Self;
}

macro_rules! replace_on_merge {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Merge for $ty {
                fn merge(self, other: Self) -> Self {
                    other
                }
            }
        )*
    };
}

replace_on_merge!(bool, u64, String, PathBuf, NullableStyle, SchemaDraft);

impl<T> Merge for Vec<T> {
    /// Lists are replaced, not appended.
    fn merge(self, other: Self) -> Self {
        other
    }
}

impl<T: Merge> Merge for Option<T> {
    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Some(a), Some(b)) => Some(a.merge(b)),
            (None, b) => b,
            (a, None) => a,
        }
    }
}
