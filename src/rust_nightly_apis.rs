//! Stable copies of a small set of unstable standard library functions.

use std::mem::MaybeUninit;

/// Assuming all the elements are initialized, get a slice to them.
///
/// # Safety
///
/// It is up to the caller to guarantee that the `MaybeUninit<T>` elements
/// really are in an initialized state. Calling this when the content is not
/// yet fully initialized causes undefined behavior.
///
/// **This is an unstable API copied from the Rust standard library, tracking
/// issue is [#63569][issue-63569]**
///
/// [issue-63569]: https://github.com/rust-lang/rust/issues/63569
pub(crate) const unsafe fn maybe_uninit_slice_assume_init_ref<T>(
    slice: &[MaybeUninit<T>],
) -> &[T] {
    // SAFETY: casting `slice` to a `*const [T]` is safe since the caller
    // guarantees that `slice` is initialized, and `MaybeUninit` is guaranteed
    // to have the same layout as `T`. The pointer obtained is valid since it
    // refers to memory owned by `slice` which is a reference and thus
    // guaranteed to be valid for reads.
    unsafe { &*(slice as *const [MaybeUninit<T>] as *const [T]) }
}

/// Assuming all the elements are initialized, get a mutable slice to them.
///
/// # Safety
///
/// It is up to the caller to guarantee that the `MaybeUninit<T>` elements
/// really are in an initialized state. Calling this when the content is not
/// yet fully initialized causes undefined behavior.
///
/// **This is an unstable API copied from the Rust standard library, tracking
/// issue is [#63569][issue-63569]**
///
/// [issue-63569]: https://github.com/rust-lang/rust/issues/63569
pub(crate) unsafe fn maybe_uninit_slice_assume_init_mut<T>(
    slice: &mut [MaybeUninit<T>],
) -> &mut [T] {
    // SAFETY: similar to safety notes for `maybe_uninit_slice_assume_init_ref`,
    // but we have a mutable reference which is also guaranteed to be valid for
    // writes.
    unsafe { &mut *(slice as *mut [MaybeUninit<T>] as *mut [T]) }
}
