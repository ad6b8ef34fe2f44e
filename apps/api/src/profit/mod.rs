// Profit split: client → company → candidate markup derivation.
// Pure arithmetic lives in `calculator`; handlers only apply role filtering.

pub mod calculator;
pub mod handlers;
