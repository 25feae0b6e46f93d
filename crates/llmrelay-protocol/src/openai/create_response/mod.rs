pub mod request;
pub mod response;
pub mod stream;
pub mod types;

pub use request::CreateResponseRequestBody;
pub use response::ResponseObject;
pub use stream::*;
pub use types::*;
