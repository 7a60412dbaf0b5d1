//! Data models for the inventory server

use serde::Serialize;
use utoipa::ToSchema;

/// Stores a closed enum as its text slug. The type must provide
/// `as_str()` and `FromStr<Err = String>`.
macro_rules! text_enum_sqlx {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&'r str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

pub mod checkout;
pub mod equipment;
pub mod user;

// Re-export commonly used types
pub use checkout::{Checkout, CheckoutDetails, CheckoutStatus};
pub use equipment::{Equipment, EquipmentShort, EquipmentStatus};
pub use user::{Role, UserShort};

/// One page of results, shaped like the list responses the web clients consume
#[derive(Debug, Clone, Serialize, ToSchema)]
#[aliases(CheckoutPage = Page<CheckoutDetails>)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: i64,
    pub per_page: i64,
    pub total: i64,
    pub last_page: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, current_page: i64, per_page: i64) -> Self {
        let last_page = if per_page > 0 {
            ((total + per_page - 1) / per_page).max(1)
        } else {
            1
        };
        Self {
            data,
            current_page,
            per_page,
            total,
            last_page,
        }
    }
}
