//! Server-side markup rendered into the SPA shell.

pub mod head;
