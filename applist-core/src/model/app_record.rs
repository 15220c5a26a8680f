//! `src/model/app_record.rs`
//! ============================================================
//! Immutable metadata for one installed application.
//!
//! Ordering
//! --------
//! • The canonical list is ordered by display name, comparing UTF-16 code
//!   units (case-sensitive, locale-independent). This differs from `str`
//!   ordering only when a name mixes supplementary-plane characters (emoji)
//!   with U+E000..U+FFFF (private use, fullwidth forms): surrogates sort
//!   below those.
//! • Search folds case; ordering does not. Keep it that way.

use std::cmp::Ordering;
use std::fmt;

use compact_str::CompactString;

use crate::error::RegistryError;
use crate::inventory::InventoryEntry;

// ------------------------------------------------------------
// IconHandle: opaque resource reference owned by the inventory.
// ------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IconHandle(CompactString);

impl IconHandle {
    #[must_use]
    pub fn new<S: Into<CompactString>>(resource: S) -> Self {
        Self(resource.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for IconHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ------------------------------------------------------------
// AppRecord
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRecord {
    display_name: String,
    package_id: CompactString,
    icon: IconHandle,
    version_name: CompactString,
    version_code: i64,
    main_entry: CompactString,
}

impl AppRecord {
    #[must_use]
    pub fn new<N, P, V, M>(
        display_name: N,
        package_id: P,
        icon: IconHandle,
        version_name: V,
        version_code: i64,
        main_entry: M,
    ) -> Self
    where
        N: Into<String>,
        P: Into<CompactString>,
        V: Into<CompactString>,
        M: Into<CompactString>,
    {
        Self {
            display_name: display_name.into(),
            package_id: package_id.into(),
            icon,
            version_name: version_name.into(),
            version_code,
            main_entry: main_entry.into(),
        }
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Unique key within the registry.
    #[must_use]
    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    #[must_use]
    pub const fn icon(&self) -> &IconHandle {
        &self.icon
    }

    #[must_use]
    pub fn version_name(&self) -> &str {
        &self.version_name
    }

    #[must_use]
    pub const fn version_code(&self) -> i64 {
        self.version_code
    }

    #[must_use]
    pub fn main_entry(&self) -> &str {
        &self.main_entry
    }

    /// Canonical list order: UTF-16 code-unit comparison of display names.
    #[must_use]
    pub fn cmp_by_name(&self, other: &Self) -> Ordering {
        if self.display_name.is_ascii() && other.display_name.is_ascii() {
            return self.display_name.cmp(&other.display_name);
        }
        self.display_name
            .encode_utf16()
            .cmp(other.display_name.encode_utf16())
    }

    /// Case-insensitive substring match. `folded_query` must already be
    /// lowercased with [`fold_case`].
    #[must_use]
    pub fn name_contains_folded(&self, folded_query: &str) -> bool {
        fold_case(&self.display_name).contains(folded_query)
    }
}

/// Case folding used by search, identical for both operands.
#[must_use]
pub fn fold_case(s: &str) -> String {
    s.to_lowercase()
}

impl TryFrom<InventoryEntry> for AppRecord {
    type Error = RegistryError;

    fn try_from(entry: InventoryEntry) -> Result<Self, Self::Error> {
        if entry.package_id.is_empty() {
            return Err(RegistryError::resolve_failed("", "empty package id"));
        }

        let Some(main_entry) = entry.main_entry else {
            return Err(RegistryError::resolve_failed(
                entry.package_id,
                "package has no main entry",
            ));
        };

        Ok(Self {
            display_name: entry.display_name,
            package_id: entry.package_id.into(),
            icon: entry.icon,
            version_name: entry.version_name.unwrap_or_default().into(),
            version_code: entry.version_code,
            main_entry: main_entry.into(),
        })
    }
}
