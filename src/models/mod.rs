pub mod contract;
pub mod llm;

pub use contract::{Contract, ContractInput};
pub use llm::{AskDocRequest, AskDocResponse, LlmAnswer, LlmQuery};
