pub mod db;
pub mod google_books;
mod http;
pub mod open_library;

pub use db::DbAdapter;
pub use google_books::GoogleBooksAdapter;
pub use open_library::OpenLibraryAdapter;
