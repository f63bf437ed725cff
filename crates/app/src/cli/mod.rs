pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Decrypt, Encrypt, Grant, Init, Pubkey, Revoke, Sign, Token, Version};
