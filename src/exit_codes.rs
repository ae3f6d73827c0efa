//! Exit code constants for the squad CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config, unreadable request)
//! - 2: Role resolution failure
//! - 3: Command template failure (render error or empty command)
//! - 4: Conversation handle failure (create-handle step failed)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration, or malformed request.
pub const USER_ERROR: i32 = 1;

/// A requested role does not exist in the role directory.
pub const ROLE_FAILURE: i32 = 2;

/// A command template failed to render or rendered to nothing.
pub const TEMPLATE_FAILURE: i32 = 3;

/// The create-handle step failed or produced no handle.
pub const HANDLE_FAILURE: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            USER_ERROR,
            ROLE_FAILURE,
            TEMPLATE_FAILURE,
            HANDLE_FAILURE,
        ];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }
}
