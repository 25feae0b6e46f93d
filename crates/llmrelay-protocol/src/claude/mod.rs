pub mod create_message;
