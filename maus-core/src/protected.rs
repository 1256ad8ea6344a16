//! A basic, auditable wrapper for secret data.
//!
//! Any data stored in this type is zeroized on drop. The wrapped value can only be exposed via
//! [`Protected::expose`], which makes accidental leaking of keys/passwords into logs or error
//! messages harder. It implements `Debug` with a redacted placeholder for the same reason.
//!
//! Lifted from the teacher's own `Protected<T>` wrapper (it was inspired by the `secrecy` crate).

use std::fmt::Debug;
use zeroize::Zeroize;

pub struct Protected<T>
where
    T: Zeroize,
{
    data: T,
}

impl<T> Protected<T>
where
    T: Zeroize,
{
    pub fn new(value: T) -> Self {
        Protected { data: value }
    }

    pub fn expose(&self) -> &T {
        &self.data
    }
}

impl<T> Drop for Protected<T>
where
    T: Zeroize,
{
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

impl<T> Debug for Protected<T>
where
    T: Zeroize,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}
