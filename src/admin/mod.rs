//! Admin side of the CMS: an API client, the post editor form and the actions
//! that tie them to confirmation dialogs.

mod client;
mod console;
mod editor;

pub use client::{AdminClient, ClientError};
pub use console::AdminConsole;
pub use editor::{PostEditor, ValidationError};
