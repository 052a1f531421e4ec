use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a 128-bit opaque id type wrapping a [`Uuid`], matching the
/// "all identifiers are opaque 128-bit tokens" rule of the data model.
macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
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
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

opaque_id!(TenantId);
opaque_id!(BrandId);
opaque_id!(EntityId);
opaque_id!(ConnectionId);
opaque_id!(RawRecordId);
opaque_id!(TransactionId);
opaque_id!(SettlementId);
opaque_id!(MatchId);
opaque_id!(ExceptionId);
opaque_id!(LedgerEntryId);
opaque_id!(CustomerId);

impl CustomerId {
    /// Derives a stable `CustomerId` from a PSP's own customer reference
    /// (e.g. Stripe's `cus_...` string), so the same external customer
    /// always maps to the same internal id without a lookup table. Uses a
    /// fixed namespace so two connections parsing the same raw string agree.
    pub fn from_external_id(raw: &str) -> Self {
        const NAMESPACE: Uuid = Uuid::from_bytes([
            0x3b, 0x1e, 0x4a, 0x2c, 0x9f, 0x6d, 0x4b, 0x8e, 0xa1, 0x7c, 0x5d, 0x0f, 0x2a, 0x9b, 0x6e, 0x31,
        ]);
        Self(Uuid::new_v5(&NAMESPACE, raw.as_bytes()))
    }
}

/// Every row that can be read or written through [`crate::ReconError`]-returning
/// ports carries one of these; used to build the `WHERE tenant_id = ...` scope
/// enforced by `CanonicalStore` implementations rather than left to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantScope {
    pub tenant_id: TenantId,
}

impl TenantScope {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }
}
