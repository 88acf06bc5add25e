//! Common types and utilities shared across Lookout crates.
//!
//! This crate defines the operator role model and the observability helpers
//! used throughout the Lookout workspace. It is intentionally lightweight
//! and dependency‑minimal so that all crates can depend on it without
//! introducing heavy transitive costs.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`Role`]: Operator roles used by the HTTP session layer
use serde::{Deserialize, Serialize};

pub mod observability;

/// Operator roles recognised by the server.
///
/// An `Admin` can edit credential and proxied-domain files in addition to
/// everything an `Employee` can do (search, browse the catalog, preview
/// pages).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Employee,
}

impl Role {
    /// Whether this role may mutate server-side data files.
    pub fn can_edit_files(self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Employee => write!(f, "employee"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_can_edit_files() {
        assert!(Role::Admin.can_edit_files());
        assert!(!Role::Employee.can_edit_files());
    }

    #[test]
    fn role_round_trips_through_serde() {
        let json = serde_json::to_string(&Role::Employee).unwrap();
        assert_eq!(json, "\"employee\"");
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Role::Employee);
    }
}
