//! Best-effort name, email and phone from CV text.
//!
//! Every matcher is a pure function of the text: the same input always
//! yields the same `ContactInfo`, and a miss is `None`, never an error.

pub mod email;
pub mod name;
pub mod phone;

use crate::models::application::ContactInfo;

pub use phone::DEFAULT_REGION;

/// Resolves all three contact fields from extracted document text.
pub fn resolve(text: &str) -> ContactInfo {
    ContactInfo {
        name: name::find_name(text),
        email: email::find_email(text),
        phone: phone::find_phone(text, DEFAULT_REGION),
    }
}
