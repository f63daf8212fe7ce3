//! Host-runtime boundary: the UI message protocol and the asset scheme
//! handler.

mod dispatch;
mod scheme;

pub use dispatch::{dispatch_request, UiReply, UiRequest, UiValue, RETURN_MESSAGE_NAME};
pub use scheme::{mime_from_extension, resolve_scheme_url, SCHEME_HOST};
