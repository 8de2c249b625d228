// Exit codes shared by the standalone test binaries and the runner.
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FATAL: u8 = 1;
pub const EXIT_MISMATCH: u8 = 2;

/// Pick the more severe of two exit codes. A fatal failure outranks a
/// mismatch, which outranks success.
pub fn worst(a: u8, b: u8) -> u8 {
    fn rank(code: u8) -> u8 {
        match code {
            EXIT_SUCCESS => 0,
            EXIT_MISMATCH => 1,
            _ => 2,
        }
    }
    if rank(b) > rank(a) { b } else { a }
}
