//! Pooled JSON encoding

use crate::ObjectPool;
use bytes::Bytes;
use serde::Serialize;

/// Initial capacity of each pooled buffer.
const INITIAL_BUFFER_SIZE: usize = 1024;

/// Buffers larger than this are not returned to the pool.
const MAX_RETAINED_BUFFER: usize = 64 * 1024;

/// Pool of scratch buffers for serialising values to JSON bytes.
#[derive(Debug, Clone)]
pub struct EncoderPool {
    buffers: ObjectPool<Vec<u8>>,
}

impl EncoderPool {
    pub fn new(size: usize) -> Self {
        Self {
            buffers: ObjectPool::new(size, || Vec::with_capacity(INITIAL_BUFFER_SIZE)),
        }
    }

    /// Serialise `value` using a pooled scratch buffer.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> serde_json::Result<Bytes> {
        let mut buf = self.buffers.get();
        buf.clear();

        let result = serde_json::to_writer(&mut buf, value).map(|()| Bytes::copy_from_slice(&buf));

        if buf.capacity() <= MAX_RETAINED_BUFFER {
            self.buffers.put(buf);
        }

        result
    }

    /// Idle buffers currently held.
    pub fn available(&self) -> usize {
        self.buffers.available()
    }
}

impl Default for EncoderPool {
    fn default() -> Self {
        Self::new(crate::DEFAULT_POOL_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct DeviceEvent<'a> {
        device_id: &'a str,
        online: bool,
    }

    #[test]
    fn test_encode_struct() {
        let pool = EncoderPool::new(2);
        let bytes = pool
            .encode(&DeviceEvent {
                device_id: "mac:112233445566",
                online: true,
            })
            .unwrap();

        assert_eq!(
            &bytes[..],
            br#"{"device_id":"mac:112233445566","online":true}"#
        );
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_buffers_are_cleared_between_uses() {
        let pool = EncoderPool::new(1);
        let first = pool.encode(&"a fairly long string value").unwrap();
        let second = pool.encode(&1).unwrap();

        assert_eq!(&first[..], br#""a fairly long string value""#);
        assert_eq!(&second[..], b"1");
    }

    #[test]
    fn test_oversized_buffer_not_retained() {
        let pool = EncoderPool::new(1);
        let big = "x".repeat(MAX_RETAINED_BUFFER * 2);
        pool.encode(&big).unwrap();
        assert_eq!(pool.available(), 0);
    }
}
