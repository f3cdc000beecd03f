pub mod line_items;

pub use line_items::{
    ensure_unique, validate_lines, AdjustmentLine, Counterpart, EditTransfer, IssueLoan, LoanLine,
    NewAdjustment, ReceiveBatch, ReceivedLine, ReleaseLine, ReturnLoanItem, SaleLine,
    SubmitTransfer, TransactionRef, TransferLine,
};
