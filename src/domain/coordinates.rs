// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document coordinates and profile chains.
//!
//! A configuration document is addressed by an application name, a profile
//! and an optional label (branch or version). Clients ask for an ordered
//! chain of profiles; earlier profiles take precedence.

use crate::domain::errors::{ConfigError, Result};
use std::fmt;

/// The profile every chain ends with.
pub const DEFAULT_PROFILE: &str = "default";

/// Identifies a single configuration document.
///
/// # Examples
///
/// ```
/// use cfgserver::domain::Coordinates;
///
/// let coords = Coordinates::new("billing", "prod", None);
/// assert_eq!(coords.application(), "billing");
/// assert_eq!(coords.to_string(), "billing/prod/<default>");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Coordinates {
    application: String,
    profile: String,
    label: Option<String>,
}

impl Coordinates {
    /// Creates coordinates from their parts.
    pub fn new(application: impl Into<String>, profile: impl Into<String>, label: Option<&str>) -> Self {
        Self {
            application: application.into(),
            profile: profile.into(),
            label: label.map(str::to_string),
        }
    }

    /// The application name.
    pub fn application(&self) -> &str {
        &self.application
    }

    /// The profile name.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// The requested label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.application,
            self.profile,
            self.label.as_deref().unwrap_or("<default>")
        )
    }
}

/// An ordered list of profiles, highest precedence first.
///
/// The `default` profile is always present, last unless the client placed it
/// explicitly.
///
/// # Examples
///
/// ```
/// use cfgserver::domain::ProfileChain;
///
/// let chain = ProfileChain::parse("prod, eu ,prod").unwrap();
/// assert_eq!(chain.profiles(), &["prod", "eu", "default"]);
/// assert_eq!(chain.requested(), "prod, eu ,prod");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileChain {
    requested: String,
    profiles: Vec<String>,
}

impl ProfileChain {
    /// Parses a comma-separated profile list.
    ///
    /// Blank entries are dropped and repeated profiles keep their first
    /// position. Fails if a profile is not a valid path segment.
    pub fn parse(requested: &str) -> Result<Self> {
        let mut profiles: Vec<String> = Vec::new();
        for profile in requested.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            validate_segment("profile", profile)?;
            if !profiles.iter().any(|p| p == profile) {
                profiles.push(profile.to_string());
            }
        }
        if !profiles.iter().any(|p| p == DEFAULT_PROFILE) {
            profiles.push(DEFAULT_PROFILE.to_string());
        }
        Ok(Self {
            requested: requested.to_string(),
            profiles,
        })
    }

    /// The effective profiles in precedence order.
    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    /// The profile list as the client sent it.
    pub fn requested(&self) -> &str {
        &self.requested
    }
}

/// Checks that a name can be used as a single store path segment.
pub(crate) fn validate_segment(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ConfigError::invalid_request(format!("{} must not be empty", what)));
    }
    if value.contains(['/', '\\']) || value == "." || value.contains("..") {
        return Err(ConfigError::invalid_request(format!(
            "{} '{}' contains path separators or '..'",
            what, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_coordinates_accessors() {
        let coords = Coordinates::new("billing", "prod", Some("v2"));
        assert_eq!(coords.application(), "billing");
        assert_eq!(coords.profile(), "prod");
        assert_eq!(coords.label(), Some("v2"));
    }

    #[test]
    fn test_coordinates_display() {
        let coords = Coordinates::new("billing", "prod", Some("v2"));
        assert_eq!(coords.to_string(), "billing/prod/v2");
    }

    #[test]
    fn test_coordinates_hash() {
        let mut map = HashMap::new();
        map.insert(Coordinates::new("a", "p", None), 1);
        assert_eq!(map.get(&Coordinates::new("a", "p", None)), Some(&1));
        assert_eq!(map.get(&Coordinates::new("a", "p", Some("main"))), None);
    }

    #[test]
    fn test_profile_chain_appends_default() {
        let chain = ProfileChain::parse("production").unwrap();
        assert_eq!(chain.profiles(), &["production", "default"]);
    }

    #[test]
    fn test_profile_chain_keeps_explicit_default_position() {
        let chain = ProfileChain::parse("default,local").unwrap();
        assert_eq!(chain.profiles(), &["default", "local"]);
    }

    #[test]
    fn test_profile_chain_empty() {
        let chain = ProfileChain::parse(" , ").unwrap();
        assert_eq!(chain.profiles(), &["default"]);
    }

    #[test]
    fn test_profile_chain_rejects_traversal() {
        assert!(ProfileChain::parse("prod,../etc").is_err());
        assert!(ProfileChain::parse("a/b").is_err());
    }

    #[test]
    fn test_validate_segment() {
        assert!(validate_segment("application", "billing-api").is_ok());
        assert!(validate_segment("application", "").is_err());
        assert!(validate_segment("application", ".").is_err());
        assert!(validate_segment("application", "a\\b").is_err());
    }
}
