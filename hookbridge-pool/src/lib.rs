//! Bounded object pools
//!
//! Reusable resource pools with no protocol logic of their own. The pool
//! holds on to idle objects up to a fixed capacity: `get` never blocks
//! (it creates a fresh object when the pool is empty) and `put` never
//! blocks (it drops the object when the pool is full).
//!
//! ```rust
//! use hookbridge_pool::EncoderPool;
//!
//! let pool = EncoderPool::new(8);
//! let bytes = pool.encode(&serde_json::json!({"event": "device.online"})).unwrap();
//! assert_eq!(&bytes[..], br#"{"event":"device.online"}"#);
//! ```

mod encoder;
mod pool;

pub use encoder::EncoderPool;
pub use pool::{DEFAULT_POOL_SIZE, ObjectPool, Pooled};
