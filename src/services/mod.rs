pub mod checkout;
pub mod profile;
pub mod transactions;

pub use checkout::CheckoutService;
pub use profile::ProfileService;
pub use transactions::TransactionService;
