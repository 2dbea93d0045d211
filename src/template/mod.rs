//! Json templates whose string leaves may reference another json document.
//!
//! A leaf such as `"@langs,0,name"` is replaced by the value found at `langs` → `0` → `name` of the context.
//! Literal text may follow the reference (`"@name!"`). Two sentinel tokens are understood:
//! - `$len` as the last token resolves to the length of the array located by the preceding tokens.
//! - `$range` expands the template into one document per element of the array located by the preceding tokens.
//!
//! ```
//! use grpc_chain::template::decode;
//!
//! let decoded = decode(r#"{"val":"@vals,$range"}"#, br#"{"vals":[1,2,3]}"#);
//! assert_eq!(decoded, vec![r#"{"val":1}"#, r#"{"val":2}"#, r#"{"val":3}"#]);
//! ```
pub mod decode;
pub mod path;

pub use decode::{decode, decode_each, Decoded};
pub use path::{Path, Reference, Token};
