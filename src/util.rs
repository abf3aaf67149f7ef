/// Helper function to get a fixed-size array at the start of an immutable slice
pub(crate) fn ref_array_start<const N: usize>(buf: &[u8]) -> Option<&[u8; N]> {
    let len = buf.len();
    (&buf[..N.min(len)]).try_into().ok()
}
