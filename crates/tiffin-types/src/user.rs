//! Identifiers, roles and the acting user

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ParseEnumError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse an ID from a string
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id!(
    /// Unique user identifier (customers, vendors, riders and admins share one space)
    UserId
);
uuid_id!(
    /// Unique subscription identifier
    SubscriptionId
);
uuid_id!(
    /// Unique order identifier
    OrderId
);
uuid_id!(
    /// Unique credit ledger entry identifier
    CreditId
);
uuid_id!(
    /// Unique plan identifier
    PlanId
);
uuid_id!(
    /// Unique trial type identifier
    TrialTypeId
);
uuid_id!(
    /// Delivery address identifier
    AddressId
);

/// Marketplace role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Subscribes to meal plans
    Customer,
    /// Home chef selling plans
    Vendor,
    /// Delivers orders
    Rider,
    /// Platform operator
    Admin,
}

impl Role {
    /// Wire/database representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Vendor => "vendor",
            Self::Rider => "rider",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "vendor" => Ok(Self::Vendor),
            "rider" => Ok(Self::Rider),
            "admin" => Ok(Self::Admin),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

/// The authenticated user on whose behalf an operation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// User performing the action
    pub user_id: UserId,
    /// Their marketplace role
    pub role: Role,
}

impl Actor {
    /// Create a new actor
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Shorthand for a customer actor
    pub fn customer(user_id: UserId) -> Self {
        Self::new(user_id, Role::Customer)
    }

    /// Shorthand for an admin actor
    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, Role::Admin)
    }

    /// Check if the actor is an admin
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
