use std::{
    borrow::Cow,
    ffi::{CStr, CString},
    num::{
        NonZeroI16, NonZeroI32, NonZeroI64, NonZeroI8, NonZeroIsize, NonZeroU16, NonZeroU32,
        NonZeroU64, NonZeroU8, NonZeroUsize,
    },
    rc::Rc,
    sync::Arc,
};

/// Any type implementing `AsBytes` can be decomposed into bytes.
///
/// The primary purpose of this trait is to allow different types to be used
/// as keys on the [`crate::TreeMap`] type. Keys are compared and stored by
/// their byte representation; the tree never interprets the bytes beyond
/// that.
pub trait AsBytes {
    /// View the current value as a byte array.
    fn as_bytes(&self) -> &[u8];
}

/// This trait is used to mark types which have a byte representation which is
/// guaranteed to not be a prefix of any other value of the same type.
///
/// Keys of such a type can never trigger the prefix-collision error on
/// insert, so [`crate::TreeMap::insert`] is infallible for them.
///
/// # Safety
///  - This trait can only be implemented if the above condition holds.
pub unsafe trait NoPrefixesBytes: AsBytes {}

macro_rules! as_bytes_for_integer_like_types {
    ($($type:ty),*) => {
        $(
            impl AsBytes for $type {
                fn as_bytes(&self) -> &[u8] {
                    bytemuck::bytes_of(self)
                }
            }

            // SAFETY: This trait is safe to implement because all the byte
            // representations for this type have the same length, ensuring
            // there can't be any prefixes
            unsafe impl NoPrefixesBytes for $type {}

            impl AsBytes for [$type] {
                fn as_bytes(&self) -> &[u8] {
                    bytemuck::cast_slice(self)
                }
            }

            impl AsBytes for Vec<$type> {
                fn as_bytes(&self) -> &[u8] {
                    bytemuck::cast_slice(self)
                }
            }
        )*
    };
}

as_bytes_for_integer_like_types!(
    u8,
    i8,
    u16,
    i16,
    u32,
    i32,
    u64,
    i64,
    u128,
    i128,
    usize,
    isize,
    NonZeroU8,
    NonZeroI8,
    NonZeroU16,
    NonZeroI16,
    NonZeroU32,
    NonZeroI32,
    NonZeroU64,
    NonZeroI64,
    NonZeroUsize,
    NonZeroIsize
);

macro_rules! as_bytes_for_integer_arrays {
    ($($type:ty),*) => {
        $(
            impl<const N: usize> AsBytes for [$type; N] {
                fn as_bytes(&self) -> &[u8] {
                    bytemuck::bytes_of(self)
                }
            }

            // SAFETY: This trait is safe to implement because all the byte
            // representations for this type have the same length, ensuring
            // there can't be any prefixes
            unsafe impl<const N: usize> NoPrefixesBytes for [$type; N] {}
        )*
    };
}

as_bytes_for_integer_arrays!(u8, i8, u16, i16, u32, i32, u64, i64, u128, i128);

impl AsBytes for str {
    fn as_bytes(&self) -> &[u8] {
        str::as_bytes(self)
    }
}

impl AsBytes for String {
    fn as_bytes(&self) -> &[u8] {
        str::as_bytes(self)
    }
}

impl AsBytes for CStr {
    fn as_bytes(&self) -> &[u8] {
        self.to_bytes_with_nul()
    }
}

// SAFETY: The `as_bytes` implementation for `CStr` is guaranteed to always
// have a '\0' byte at the end, that is not present anywhere else in the
// string. This ensures there will never be a prefix value
unsafe impl NoPrefixesBytes for CStr {}

impl AsBytes for CString {
    fn as_bytes(&self) -> &[u8] {
        self.to_bytes_with_nul()
    }
}

// SAFETY: Same reasoning as the `NoPrefixesBytes for CStr`
unsafe impl NoPrefixesBytes for CString {}

impl<'a, B> AsBytes for Cow<'a, B>
where
    B: ToOwned + AsBytes + ?Sized,
{
    fn as_bytes(&self) -> &[u8] {
        <B as AsBytes>::as_bytes(self.as_ref())
    }
}

// SAFETY: This trait is safe to implement because the underlying
// owned/borrowed type already implements `NoPrefixesBytes`, and the wrapper
// type does not change the byte representation
unsafe impl<'a, B> NoPrefixesBytes for Cow<'a, B>
where
    B: NoPrefixesBytes + ToOwned + ?Sized,
    Cow<'a, B>: AsBytes,
{
}

macro_rules! as_bytes_for_wrapper_types {
    ($($type:ident),*) => {
        $(
            impl<T> AsBytes for $type<T>
            where
                T: AsBytes + ?Sized,
            {
                fn as_bytes(&self) -> &[u8] {
                    <T as AsBytes>::as_bytes(self)
                }
            }

            // SAFETY: This trait is safe to implement because the underlying
            // type already implements `NoPrefixesBytes`, and the wrapper type
            // does not change the byte representation
            unsafe impl<T> NoPrefixesBytes for $type<T> where T: NoPrefixesBytes + ?Sized {}
        )*
    };
}

as_bytes_for_wrapper_types!(Box, Rc, Arc);

impl<T> AsBytes for &T
where
    T: AsBytes + ?Sized,
{
    fn as_bytes(&self) -> &[u8] {
        <T as AsBytes>::as_bytes(self)
    }
}

// SAFETY: This trait is safe to implement because the underlying type already
// implements `NoPrefixesBytes`, and the reference does not change the byte
// representation
unsafe impl<T> NoPrefixesBytes for &T where T: NoPrefixesBytes + ?Sized {}
