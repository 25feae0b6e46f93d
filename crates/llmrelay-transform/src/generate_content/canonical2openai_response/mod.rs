pub mod response;
pub mod stream;

pub use stream::OpenAIResponseAdapter;
