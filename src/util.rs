use subtle::ConstantTimeEq;

/// XORs `src` into `dst`. Both slices must have equal length.
#[inline]
pub(crate) fn xor_in_place(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d ^= s;
    }
}

/// Constant-time equality of two byte slices.
///
/// Slices of different lengths compare unequal; the comparison over the
/// contents itself leaks nothing about the position of a mismatch.
#[inline]
pub(crate) fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
