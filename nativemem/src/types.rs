/// Memory protection modes accepted by [`crate::protect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    /// Memory cannot be read, written, or executed.
    NoAccess,

    /// Memory can be read but not written or executed.
    ReadOnly,

    /// Memory can be read and written but not executed.
    ReadWrite,
}
