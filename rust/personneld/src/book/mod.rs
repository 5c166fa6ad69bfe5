//! PDF "book" production: a rendered cover page followed by a person's
//! uploaded PDFs in section order.

mod assemble;
mod cover;
mod font;

pub use assemble::{assemble, merge_documents, AssembledBook, BookError};
pub use cover::{render_cover, render_cover_with_font};
pub use font::CoverFont;

/// Download name for a person's combined book.
pub fn book_file_name(identifier: &str, label: &str) -> String {
    format!("{}_{}.pdf", identifier, label)
}
