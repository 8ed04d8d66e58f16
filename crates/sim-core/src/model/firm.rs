use crate::id::EntityId;
use crate::repository::FieldValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which entity kind a firm id resolves against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FirmType {
    Factory,
    Shop,
    LocalSupplier,
}

impl FirmType {
    pub fn as_str(self) -> &'static str {
        match self {
            FirmType::Factory => "factory",
            FirmType::Shop => "shop",
            FirmType::LocalSupplier => "localSupplier",
        }
    }
}

impl fmt::Display for FirmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<FirmType> for FieldValue {
    fn from(v: FirmType) -> Self {
        FieldValue::Str(v.as_str().to_string())
    }
}

/// A firm together with the company that owns it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmRef {
    pub company_id: EntityId,
    pub firm_type: FirmType,
    pub firm_id: EntityId,
}

impl FirmRef {
    pub fn new(company_id: EntityId, firm_type: FirmType, firm_id: EntityId) -> Self {
        Self {
            company_id,
            firm_type,
            firm_id,
        }
    }
}
