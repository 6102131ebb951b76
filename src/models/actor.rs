//! Identidad del actor
//!
//! El motor nunca autentica: el proveedor de identidad entrega el id y el rol
//! de quien ejecuta cada transición y aquí solo se autoriza contra ese rol.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

/// Roles del sistema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "actor_role", rename_all = "snake_case")]
pub enum Role {
    Admin,
    Sales,
    Mechanic,
    Registration,
    Transport,
    Secretary,
    Staff,
    Cashier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Sales => "sales",
            Role::Mechanic => "mechanic",
            Role::Registration => "registration",
            Role::Transport => "transport",
            Role::Secretary => "secretary",
            Role::Staff => "staff",
            Role::Cashier => "cashier",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "sales" => Ok(Role::Sales),
            "mechanic" => Ok(Role::Mechanic),
            "registration" => Ok(Role::Registration),
            "transport" => Ok(Role::Transport),
            "secretary" => Ok(Role::Secretary),
            "staff" => Ok(Role::Staff),
            "cashier" => Ok(Role::Cashier),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quien ejecuta una transición
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("Cashier".parse::<Role>(), Ok(Role::Cashier));
        assert_eq!(" transport ".parse::<Role>(), Ok(Role::Transport));
        assert!("livreur".parse::<Role>().is_err());
        assert_eq!(Role::Registration.to_string(), "registration");
    }
}
