//! Article rendering: drives the ANSI parser over raw article bytes and
//! produces structured HTML with inline links, embeds, metadata extraction
//! and push-line recognition.
//!
//! ```no_run
//! use bbsweb_article::Render;
//!
//! let rendered = Render::new(b"\x1b[31mhello\x1b[m").render();
//! assert!(rendered.html.contains("hello"));
//! ```

mod index_mapper;
mod render;
mod segment;
mod terminal;
mod util;

pub use render::Render;
pub use render::RenderedArticle;
pub use terminal::DEFAULT_BG;
pub use terminal::DEFAULT_FG;
pub use terminal::TerminalState;
