pub mod check_digit;
pub mod reconcile;
