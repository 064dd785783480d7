//! sea-orm entity models for the storefront schema.

pub mod cart;
pub mod order_method;
pub mod payment_method;
pub mod product;
pub mod product_size;
pub mod product_variant;
pub mod transaction;
pub mod transaction_item;
pub mod user;

pub use cart::Entity as Cart;
pub use order_method::Entity as OrderMethod;
pub use payment_method::Entity as PaymentMethod;
pub use product::Entity as Product;
pub use product_size::Entity as ProductSize;
pub use product_variant::Entity as ProductVariant;
pub use transaction::Entity as Transaction;
pub use transaction_item::Entity as TransactionItem;
pub use user::Entity as User;
