pub mod claude;
pub mod deepseek;
pub mod mock;
pub mod openai;

pub use claude::*;
pub use deepseek::*;
pub use mock::*;
pub use openai::*;
