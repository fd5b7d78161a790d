//! Primitives shared across the naming/record registry workspace:
//! the binary codec, cryptographic helpers, canonical-JSON content
//! addressing, coin arithmetic, the chain error taxonomy, deterministic
//! time and execution context, governance parameters, and WRN parsing.

pub mod canonical_json;
pub mod coin;
pub mod context;
pub mod crypto;
pub mod error;
pub mod params;
pub mod serializer;
pub mod time;
pub mod wrn;

pub use canonical_json::{canonical_json, content_id, ContentIdError};
pub use coin::{parse_coin, Coin, CoinError, Coins};
pub use context::ExecutionContext;
pub use error::{ChainError, StorageError};
pub use params::ModuleParams;
pub use serializer::{Reader, ReaderError, Serializer, Writer};
pub use time::BlockTime;
pub use wrn::{parse_authority_name, parse_wrn, split_parent, ParsedWrn, WrnError};
