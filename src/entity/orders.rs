use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub vendor_id: Uuid,
    pub payment_method_id: String,
    pub shipping_address: String,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::order_transactions::Entity")]
    OrderTransactions,
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::order_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
