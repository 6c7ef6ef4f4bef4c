pub mod feed_ws;
pub mod ingest_task;
pub mod protocol;
pub mod rest;
pub mod scan_session;
pub mod scan_ws;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the handlers to make them easily accessible
// to the binary that builds the web server router.
pub use feed_ws::feed_ws_handler;
pub use rest::{
    create_box_handler, get_book_handler, list_books_handler, list_box_books_handler,
    list_boxes_handler,
};
pub use scan_ws::scan_ws_handler;
