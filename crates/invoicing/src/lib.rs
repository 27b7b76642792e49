//! Invoicing domain module.
//!
//! Business rules for invoices: the draft/sent/paid/overdue lifecycle and the
//! invariant that payment details exist exactly when an invoice is paid.
//! Pure, deterministic domain logic (no IO, no storage).

pub mod invoice;

pub use invoice::{
    CreateInvoice, INVOICE_TRANSITIONS, Invoice, InvoiceCommand, InvoiceCreated, InvoiceEvent,
    InvoiceMarkedOverdue, InvoicePaid, InvoiceSent, InvoiceStatus, InvoiceUpdated,
    MarkInvoiceOverdue, MarkInvoicePaid, Payment, PaymentMethod, SendInvoice, UpdateInvoice,
};
