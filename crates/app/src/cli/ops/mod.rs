pub mod decrypt;
pub mod encrypt;
pub mod grant;
pub mod init;
pub mod pubkey;
pub mod revoke;
pub mod sign;
pub mod token;
pub mod version;

mod envelope_file;

pub use decrypt::Decrypt;
pub use encrypt::Encrypt;
pub use grant::Grant;
pub use init::Init;
pub use pubkey::Pubkey;
pub use revoke::Revoke;
pub use sign::Sign;
pub use token::Token;
pub use version::Version;
