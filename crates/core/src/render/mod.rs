//! Screen-state export backends.

mod html;

pub use html::HtmlRenderer;
