//! Equipment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Availability status of a piece of equipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum EquipmentStatus {
    #[serde(rename = "Fonctionnel")]
    Functional,
    #[serde(rename = "Réservé")]
    Reserved,
    #[serde(rename = "En panne")]
    Broken,
    #[serde(rename = "En maintenance")]
    UnderMaintenance,
}

impl EquipmentStatus {
    pub const ALL: [EquipmentStatus; 4] = [
        EquipmentStatus::Functional,
        EquipmentStatus::Reserved,
        EquipmentStatus::Broken,
        EquipmentStatus::UnderMaintenance,
    ];

    /// Storage slug
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentStatus::Functional => "functional",
            EquipmentStatus::Reserved => "reserved",
            EquipmentStatus::Broken => "broken",
            EquipmentStatus::UnderMaintenance => "maintenance",
        }
    }

    /// Label shown to users
    pub fn label(&self) -> &'static str {
        match self {
            EquipmentStatus::Functional => "Fonctionnel",
            EquipmentStatus::Reserved => "Réservé",
            EquipmentStatus::Broken => "En panne",
            EquipmentStatus::UnderMaintenance => "En maintenance",
        }
    }

    /// Only functional equipment can be checked out
    pub fn is_available(&self) -> bool {
        *self == EquipmentStatus::Functional
    }
}

impl std::fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for EquipmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EquipmentStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s || st.label() == s)
            .ok_or_else(|| format!("Invalid equipment status: {}", s))
    }
}

text_enum_sqlx!(EquipmentStatus);

/// Equipment record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Equipment {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub serial_number: Option<String>,
    pub status: EquipmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Equipment summary embedded in checkout responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EquipmentShort {
    pub id: i32,
    pub name: String,
    pub status: EquipmentStatus,
}

/// Create equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEquipment {
    #[validate(length(min = 1, max = 255, message = "The name field is required."))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub serial_number: Option<String>,
    /// Initial status; defaults to functional. Reserved is not accepted.
    pub status: Option<EquipmentStatus>,
}

/// Update equipment request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipment {
    #[validate(length(min = 1, max = 255, message = "The name field cannot be empty."))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub serial_number: Option<String>,
    /// Reserved is not accepted, and a reserved item's status cannot be changed here
    pub status: Option<EquipmentStatus>,
}

/// Equipment list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct EquipmentQuery {
    pub status: Option<EquipmentStatus>,
    /// Matches name or serial number
    pub search: Option<String>,
}
