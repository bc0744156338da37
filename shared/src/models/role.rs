//! Caller identity and roles
//!
//! Identity arrives pre-resolved from the upstream auth layer; the engine
//! only distinguishes between a customer (who owns orders) and an admin
//! (who operates the store).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Caller roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Resolved caller identity
///
/// Every engine operation receives one of these; authorization decisions
/// are made against it rather than against raw credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Caller {
    /// A customer identified by their account id
    Customer { id: String },
    /// A store administrator
    Admin,
}

impl Caller {
    pub fn customer(id: impl Into<String>) -> Self {
        Self::Customer { id: id.into() }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// The customer id, if the caller is a customer
    pub fn customer_id(&self) -> Option<&str> {
        match self {
            Self::Customer { id } => Some(id),
            Self::Admin => None,
        }
    }

    /// Whether the caller is the customer who owns the resource
    pub fn owns(&self, owner_id: &str) -> bool {
        matches!(self, Self::Customer { id } if id == owner_id)
    }

    /// Whether the caller may view a resource owned by `owner_id`
    /// (the owner themselves, or any admin)
    pub fn can_view(&self, owner_id: &str) -> bool {
        self.is_admin() || self.owns(owner_id)
    }

    pub fn role(&self) -> Role {
        match self {
            Self::Customer { .. } => Role::Customer,
            Self::Admin => Role::Admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!("customer".parse::<Role>(), Ok(Role::Customer));
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("manager".parse::<Role>().is_err());
    }

    #[test]
    fn test_caller_ownership() {
        let alice = Caller::customer("alice");
        assert!(alice.owns("alice"));
        assert!(!alice.owns("bob"));
        assert!(alice.can_view("alice"));
        assert!(!alice.can_view("bob"));
        assert!(!alice.is_admin());
        assert_eq!(alice.customer_id(), Some("alice"));
    }

    #[test]
    fn test_admin_can_view_but_does_not_own() {
        let admin = Caller::Admin;
        assert!(admin.is_admin());
        assert!(!admin.owns("alice"));
        assert!(admin.can_view("alice"));
        assert_eq!(admin.customer_id(), None);
    }

    #[test]
    fn test_caller_serde() {
        let json = serde_json::to_string(&Caller::customer("alice")).unwrap();
        assert!(json.contains("\"role\":\"customer\""));
        assert!(json.contains("\"id\":\"alice\""));

        let caller: Caller = serde_json::from_str("{\"role\":\"admin\"}").unwrap();
        assert_eq!(caller, Caller::Admin);
    }
}
