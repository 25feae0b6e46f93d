pub mod canonical2claude;
pub mod canonical2openai_chat_completions;
pub mod canonical2openai_response;
pub mod claude2canonical;
pub mod openai_chat_completions2canonical;
pub mod openai_response2canonical;

mod helpers;

#[cfg(test)]
mod tests;
