//! Human confirmation gate for live orders.

use crate::domain::order::OrderRequest;

/// Asked once per live order, before anything is sent. Returning `false` cancels the
/// order. The engine never prompts by itself; the surrounding application supplies
/// the implementation (an interactive prompt, or a fixed answer in tests).
pub trait ConfirmPort {
    fn confirm(&self, order: &OrderRequest) -> bool;
}

/// Declines every order. Used wherever no operator is present.
pub struct DenyAll;

impl ConfirmPort for DenyAll {
    fn confirm(&self, _order: &OrderRequest) -> bool {
        false
    }
}
