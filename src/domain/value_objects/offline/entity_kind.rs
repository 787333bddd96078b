use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Remote resource families the sync engine knows how to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Order,
    Client,
    Product,
    Category,
    Provider,
    Store,
    User,
    Commission,
    Budget,
}

/// A payload field holding the id of another entity family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityReference {
    pub field: &'static str,
    pub target: EntityKind,
}

const fn reference(field: &'static str, target: EntityKind) -> EntityReference {
    EntityReference { field, target }
}

impl EntityKind {
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Order,
        EntityKind::Client,
        EntityKind::Product,
        EntityKind::Category,
        EntityKind::Provider,
        EntityKind::Store,
        EntityKind::User,
        EntityKind::Commission,
        EntityKind::Budget,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Order => "order",
            EntityKind::Client => "client",
            EntityKind::Product => "product",
            EntityKind::Category => "category",
            EntityKind::Provider => "provider",
            EntityKind::Store => "store",
            EntityKind::User => "user",
            EntityKind::Commission => "commission",
            EntityKind::Budget => "budget",
        }
    }

    /// Local store collection and remote path segment.
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Order => "orders",
            EntityKind::Client => "clients",
            EntityKind::Product => "products",
            EntityKind::Category => "categories",
            EntityKind::Provider => "providers",
            EntityKind::Store => "stores",
            EntityKind::User => "users",
            EntityKind::Commission => "commissions",
            EntityKind::Budget => "budgets",
        }
    }

    pub fn references(&self) -> &'static [EntityReference] {
        const ORDER: &[EntityReference] = &[
            reference("clientId", EntityKind::Client),
            reference("storeId", EntityKind::Store),
            reference("userId", EntityKind::User),
            reference("budgetId", EntityKind::Budget),
        ];
        const PRODUCT: &[EntityReference] = &[
            reference("categoryId", EntityKind::Category),
            reference("providerId", EntityKind::Provider),
        ];
        const USER: &[EntityReference] = &[reference("storeId", EntityKind::Store)];
        const COMMISSION: &[EntityReference] = &[
            reference("userId", EntityKind::User),
            reference("orderId", EntityKind::Order),
        ];
        const BUDGET: &[EntityReference] = &[
            reference("clientId", EntityKind::Client),
            reference("storeId", EntityKind::Store),
        ];

        match self {
            EntityKind::Order => ORDER,
            EntityKind::Product => PRODUCT,
            EntityKind::User => USER,
            EntityKind::Commission => COMMISSION,
            EntityKind::Budget => BUDGET,
            EntityKind::Client | EntityKind::Category | EntityKind::Provider | EntityKind::Store => {
                &[]
            }
        }
    }

    /// Families whose payloads may point at `self`, with the pointing field.
    pub fn dependents(&self) -> Vec<(EntityKind, &'static str)> {
        EntityKind::ALL
            .iter()
            .flat_map(|kind| {
                kind.references()
                    .iter()
                    .filter(|r| r.target == *self)
                    .map(move |r| (*kind, r.field))
            })
            .collect()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .iter()
            .find(|kind| kind.as_str() == s || kind.collection() == s)
            .copied()
            .ok_or_else(|| format!("Unknown entity kind: {s}"))
    }
}
