//! Host access policy
//!
//! Decides which host members foreign code may see, which host collection
//! shapes are exposed to it, which host types foreign objects may implement
//! and whether lossy string coercions are allowed.
//!
//! | Flag                              | Effect                                              |
//! |-----------------------------------|-----------------------------------------------------|
//! | `public_only`                     | only public members are visible                     |
//! | `explicit_members_only`           | only exported members are visible                   |
//! | `allow_array_access`              | host arrays answer the array protocol               |
//! | `allow_list_access`               | host lists answer the array protocol                |
//! | `allow_map_access`                | host maps answer the hash protocol                  |
//! | `allow_iterable_access`           | host iterables answer `has_iterator`                |
//! | `allow_iterator_access`           | host iterators answer the iterator protocol         |
//! | `allow_implementations`           | named interfaces/classes foreign objects may extend |
//! | `allow_all_implementations`       | any interface may be implemented                    |
//! | `allow_all_class_implementations` | any non-final class may be extended                 |
//! | `allow_string_coercion`           | strings <-> numbers/booleans convert at `Coerce`    |
//!
//! ## TOML Configuration
//!
//! ```toml
//! [host_access]
//! public_only = true
//! allow_list_access = true
//! allow_implementations = ["Runnable", "Comparator"]
//! allow_string_coercion = true
//! ```
//!
//! Missing keys take the values of [`AccessPolicy::explicit`].

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::host::{HostClass, Visibility};

/// Errors loading a policy file
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Failed to read the policy file
    #[error("Failed to read policy file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse policy: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid policy: {0}")]
    ValidationError(String),
}

#[derive(Debug, Default, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    host_access: AccessPolicy,
}

/// Host access policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessPolicy {
    /// Expose only public classes and members
    pub public_only: bool,
    /// Expose only members marked as exported
    pub explicit_members_only: bool,
    /// Foreign access to host arrays
    pub allow_array_access: bool,
    /// Foreign access to host lists
    pub allow_list_access: bool,
    /// Foreign access to host maps as hashes
    pub allow_map_access: bool,
    /// Foreign access to host iterables
    pub allow_iterable_access: bool,
    /// Foreign access to host iterators
    pub allow_iterator_access: bool,
    /// Interfaces and classes foreign values may implement, by name
    pub allow_implementations: BTreeSet<String>,
    /// Let foreign values implement any interface
    pub allow_all_implementations: bool,
    /// Let foreign values extend any extensible class
    pub allow_all_class_implementations: bool,
    /// Allow number, boolean and string conversions through text
    pub allow_string_coercion: bool,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::explicit()
    }
}

impl AccessPolicy {
    /// Everything allowed: all non-private members, every collection shape,
    /// every implementation and string coercion
    pub fn all() -> Self {
        Self {
            public_only: false,
            explicit_members_only: false,
            allow_array_access: true,
            allow_list_access: true,
            allow_map_access: true,
            allow_iterable_access: true,
            allow_iterator_access: true,
            allow_implementations: BTreeSet::new(),
            allow_all_implementations: true,
            allow_all_class_implementations: true,
            allow_string_coercion: true,
        }
    }

    /// Only exported public members; nothing else
    pub fn explicit() -> Self {
        Self {
            public_only: true,
            explicit_members_only: true,
            allow_array_access: false,
            allow_list_access: false,
            allow_map_access: false,
            allow_iterable_access: false,
            allow_iterator_access: false,
            allow_implementations: BTreeSet::new(),
            allow_all_implementations: false,
            allow_all_class_implementations: false,
            allow_string_coercion: false,
        }
    }

    /// Set `public_only`
    pub fn with_public_only(mut self, value: bool) -> Self {
        self.public_only = value;
        self
    }

    /// Set `explicit_members_only`
    pub fn with_explicit_members_only(mut self, value: bool) -> Self {
        self.explicit_members_only = value;
        self
    }

    /// Set `allow_array_access`
    pub fn with_array_access(mut self, value: bool) -> Self {
        self.allow_array_access = value;
        self
    }

    /// Set `allow_list_access`
    pub fn with_list_access(mut self, value: bool) -> Self {
        self.allow_list_access = value;
        self
    }

    /// Set `allow_map_access`
    pub fn with_map_access(mut self, value: bool) -> Self {
        self.allow_map_access = value;
        self
    }

    /// Set `allow_iterable_access`
    pub fn with_iterable_access(mut self, value: bool) -> Self {
        self.allow_iterable_access = value;
        self
    }

    /// Set `allow_iterator_access`
    pub fn with_iterator_access(mut self, value: bool) -> Self {
        self.allow_iterator_access = value;
        self
    }

    /// Allow foreign objects to implement or extend the named host type
    pub fn with_implementation(mut self, type_name: &str) -> Self {
        self.allow_implementations.insert(type_name.to_string());
        self
    }

    /// Set `allow_all_implementations`
    pub fn with_all_implementations(mut self, value: bool) -> Self {
        self.allow_all_implementations = value;
        self
    }

    /// Set `allow_all_class_implementations`
    pub fn with_all_class_implementations(mut self, value: bool) -> Self {
        self.allow_all_class_implementations = value;
        self
    }

    /// Set `allow_string_coercion`
    pub fn with_string_coercion(mut self, value: bool) -> Self {
        self.allow_string_coercion = value;
        self
    }

    /// Whether a member with this visibility and export flag is visible
    pub fn allows_member(&self, visibility: Visibility, exported: bool) -> bool {
        if visibility == Visibility::Private {
            return false;
        }
        if self.public_only && visibility != Visibility::Public {
            return false;
        }
        !self.explicit_members_only || exported
    }

    /// Foreign objects may implement this interface
    pub fn allows_interface_implementation(&self, interface: &HostClass) -> bool {
        self.allow_all_implementations || self.allow_implementations.contains(interface.name())
    }

    /// Foreign objects may extend this class
    pub fn allows_class_implementation(&self, class: &HostClass) -> bool {
        self.allow_all_class_implementations || self.allow_implementations.contains(class.name())
    }

    /// Foreign executables may stand in for this functional interface
    pub fn allows_function_proxy(&self, interface: &HostClass) -> bool {
        interface.is_functional_marked() || self.allows_interface_implementation(interface)
    }

    /// Parse the `[host_access]` table of a TOML document
    pub fn from_toml(content: &str) -> Result<Self, PolicyError> {
        let file: PolicyFile = toml::from_str(content)?;
        file.host_access.validate()?;
        Ok(file.host_access)
    }

    /// Load a TOML policy file
    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    fn validate(&self) -> Result<(), PolicyError> {
        if let Some(bad) = self
            .allow_implementations
            .iter()
            .find(|name| name.trim().is_empty() || name.trim() != name.as_str())
        {
            return Err(PolicyError::ValidationError(format!(
                "implementation type name {:?} must be non-empty without surrounding whitespace",
                bad
            )));
        }
        Ok(())
    }
}
