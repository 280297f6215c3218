pub mod agent;
pub mod call;
pub mod customer;
pub mod pink;
pub mod transcript;

pub use agent::*;
pub use call::*;
pub use customer::*;
pub use pink::*;
pub use transcript::*;
