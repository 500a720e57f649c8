pub mod codec;
pub mod reply_writer;
pub mod request_reader;
