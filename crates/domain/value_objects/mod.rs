pub mod checkout;
pub mod enums;
pub mod invoices;
pub mod payments;
pub mod user_info;
