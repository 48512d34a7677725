pub mod login_codes;
pub mod payments;
