//! Quotes domain module.
//!
//! Business rules for priced proposals: creation in `draft`, editing while
//! still a draft, and the `draft → sent → accepted | rejected` lifecycle,
//! implemented purely as deterministic domain logic (no IO, no storage).

pub mod quote;

pub use quote::{
    AcceptQuote, CreateQuote, LineRepriced, Quote, QuoteAccepted, QuoteCommand, QuoteCreated,
    QuoteDetails, QuoteEvent, QuoteRejected, QuoteRevised, QuoteSent, QuoteStatus, QuoteUpdated,
    QUOTE_TRANSITIONS, RejectQuote, RepriceQuoteLine, ReviseQuote, SendQuote, UpdateQuote,
};
