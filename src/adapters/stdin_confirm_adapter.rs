//! Interactive confirmation for live orders.

use std::cell::RefCell;
use std::io::{self, BufRead, Write};

use crate::domain::order::OrderRequest;
use crate::ports::confirm_port::ConfirmPort;

/// Prompts on a writer and reads the answer from a reader. Only the exact word `YES`
/// (surrounding whitespace ignored) approves the order; anything else, including EOF
/// or a read error, declines it.
pub struct PromptConfirm<R, W> {
    input: RefCell<R>,
    output: RefCell<W>,
}

/// Prompts on stderr and reads stdin. The stdin lock is held only while asking.
pub struct StdinConfirm;

impl ConfirmPort for StdinConfirm {
    fn confirm(&self, order: &OrderRequest) -> bool {
        PromptConfirm::new(io::stdin().lock(), io::stderr()).confirm(order)
    }
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: RefCell::new(input),
            output: RefCell::new(output),
        }
    }

    pub fn into_output(self) -> W {
        self.output.into_inner()
    }
}

impl<R: BufRead, W: Write> ConfirmPort for PromptConfirm<R, W> {
    fn confirm(&self, order: &OrderRequest) -> bool {
        let price = order
            .price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "market".into());
        {
            let mut out = self.output.borrow_mut();
            let shown = writeln!(
                out,
                "LIVE ORDER: {} {} {} @ {}",
                order.side, order.amount, order.symbol, price
            )
            .and_then(|_| write!(out, "Type YES to send this order with real funds: "))
            .and_then(|_| out.flush());
            if shown.is_err() {
                return false;
            }
        }

        let mut line = String::new();
        match self.input.borrow_mut().read_line(&mut line) {
            Ok(n) if n > 0 => line.trim() == "YES",
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderSide;

    fn ask(answer: &str) -> (bool, String) {
        let prompt = PromptConfirm::new(answer.as_bytes(), Vec::new());
        let order = OrderRequest::market("BTC/USDT", OrderSide::Buy, 0.01).with_price(60_000.0);
        let approved = prompt.confirm(&order);
        (approved, String::from_utf8(prompt.into_output()).unwrap())
    }

    #[test]
    fn exact_yes_approves() {
        let (approved, shown) = ask("YES\n");
        assert!(approved);
        assert!(shown.contains("LIVE ORDER: buy 0.01 BTC/USDT @ 60000"));
    }

    #[test]
    fn anything_else_declines() {
        assert!(!ask("yes\n").0);
        assert!(!ask("y\n").0);
        assert!(!ask("\n").0);
        assert!(!ask("").0);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert!(ask("  YES  \r\n").0);
    }
}
