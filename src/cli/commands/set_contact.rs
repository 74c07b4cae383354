//! cli::commands::set_contact
//!
//! Set a user's embedded contact details.
//!
//! # Behavior
//!
//! Creates the user with `count = 0` when absent, then replaces the embedded
//! contact wholesale - the previous pair is never merged with the new one.
//! `parse` requires exactly two arguments: email and phone.

use std::io::Write;

use crate::core::records::{Contact, UserRecord};
use crate::store::{Entity, Key, Transaction};

use super::{ActionError, ArgumentError, Request};

/// Exactly two arguments: email and phone.
pub(super) fn parse(args: &[String]) -> Result<Request, ArgumentError> {
    match args {
        [email, phone] => Ok(Request::SetContact {
            contact: Contact {
                email: email.clone(),
                phone: phone.clone(),
            },
        }),
        [] | [_] => Err(ArgumentError::MissingContactFields),
        _ => Err(ArgumentError::TooManyArguments),
    }
}

/// Replace `user_key`'s contact inside the caller's transaction.
pub fn set_contact(
    tx: &mut dyn Transaction,
    user_key: &Key,
    contact: &Contact,
    out: &mut dyn Write,
) -> Result<(), ActionError> {
    let name = user_key.name().unwrap_or_default();
    let mut user = match tx.get(user_key)? {
        Some(entity) => UserRecord::from_entity(&entity)?,
        None => {
            writeln!(out, "Adding a new user.")?;
            let user = UserRecord::with_count(0);
            tx.insert(Entity::new(user_key.clone(), user.to_properties()?))?;
            user
        }
    };

    user.contact = Some(contact.clone());
    tx.update(Entity::new(user_key.clone(), user.to_properties()?))?;
    writeln!(out, "Setting contact for user '{name}'.")?;
    Ok(())
}
