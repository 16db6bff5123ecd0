pub mod audit_logs;
pub mod cart_items;
pub mod carts;
pub mod order_items;
pub mod order_transactions;
pub mod orders;
pub mod payment_methods;
pub mod product_prices;
pub mod product_transactions;
pub mod products;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use order_items::Entity as OrderItems;
pub use order_transactions::Entity as OrderTransactions;
pub use orders::Entity as Orders;
pub use payment_methods::Entity as PaymentMethods;
pub use product_prices::Entity as ProductPrices;
pub use product_transactions::Entity as ProductTransactions;
pub use products::Entity as Products;
pub use users::Entity as Users;
