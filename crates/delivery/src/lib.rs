//! Delivery note domain module.

pub mod delivery_note;

pub use delivery_note::{
    CreateDeliveryNote, DELIVERY_NOTE_TRANSITIONS, DeliveryItem, DeliveryNote,
    DeliveryNoteCommand, DeliveryNoteCreated, DeliveryNoteDelivered, DeliveryNoteEvent,
    DeliveryNoteStatus, DeliveryNoteUpdated, MarkDelivered, UpdateDeliveryNote,
};
