use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fulfillment lifecycle of an order.
///
/// Valid edges: `pending -> processing -> readyForDispatch`, plus
/// `pending | processing -> cancelled`. `readyForDispatch` and `cancelled`
/// are terminal.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(24))")]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "readyForDispatch")]
    ReadyForDispatch,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// The single forward step an admin advance applies.
    pub fn next(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Processing),
            OrderStatus::Processing => Some(OrderStatus::ReadyForDispatch),
            OrderStatus::ReadyForDispatch | OrderStatus::Cancelled => None,
        }
    }

    pub fn is_cancellable(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::ReadyForDispatch | OrderStatus::Cancelled)
    }

    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        match target {
            OrderStatus::Cancelled => self.is_cancellable(),
            _ => self.next() == Some(target),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::ReadyForDispatch => "readyForDispatch",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "readyForDispatch" => Ok(OrderStatus::ReadyForDispatch),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status `{other}`")),
        }
    }
}

/// `total_amount` is in minor currency units. Only `status`, `payment_ref`
/// and `updated_at` change after creation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub shipping_address: String,
    pub total_amount: i64,
    pub status: OrderStatus,
    pub payment_ref: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::OrderStatus::{self, *};

    #[test]
    fn forward_steps_follow_the_fulfillment_chain() {
        assert_eq!(Pending.next(), Some(Processing));
        assert_eq!(Processing.next(), Some(ReadyForDispatch));
        assert_eq!(ReadyForDispatch.next(), None);
        assert_eq!(Cancelled.next(), None);
    }

    #[test]
    fn only_open_orders_can_be_cancelled() {
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(!ReadyForDispatch.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn skipping_or_reversing_a_stage_is_rejected() {
        assert!(!Pending.can_transition_to(ReadyForDispatch));
        assert!(!Processing.can_transition_to(Pending));
        assert!(!ReadyForDispatch.can_transition_to(Processing));
        assert!(!Cancelled.can_transition_to(Pending));
    }

    #[test]
    fn status_names_round_trip_through_from_str() {
        for status in [Pending, Processing, ReadyForDispatch, Cancelled] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }
}
